//! The global view stack and its compositing algorithm.
//!
//! All views share a single z-order, kept front-to-back. Drawing recurses
//! over rectangle cuts: the clip region is decomposed around the frontmost
//! intersecting view and the remainders recurse into the views behind it,
//! producing correct occlusion in one pass without a depth buffer. The same
//! decomposition drives label placement.

use slate_core::{Area, DamageTracker, Point, Rect};

use crate::canvas::{Canvas, Color};
use crate::domain::{ContentMode, Origin};
use crate::focus::Focus;
use crate::session::{Session, SessionManager};
use crate::view::{View, ViewArena, ViewId};

/// Frame border thickness inside a labeled view's outline
pub const FRAME_W: i32 = 1;
/// Assumed glyph advance for label sizing
pub const LABEL_CHAR_W: i32 = 8;
/// Label band height
pub const LABEL_H: i32 = 16;
/// Horizontal label padding
pub const LABEL_PAD: i32 = 4;

const FRAME_UNFOCUSED: Color = Color::rgb(60, 60, 60);

/// Immutable context threaded through drawing
pub struct DrawCtx<'a> {
    pub arena: &'a ViewArena,
    pub sessions: &'a SessionManager,
    pub focus: &'a Focus,
    pub pointer: Point,
    pub background: Color,
}

/// Session label plus view title, as shown in the label band
fn label_text(session: &Session, view: &View) -> String {
    if view.title.is_empty() {
        session.label.clone()
    } else {
        format!("{} {}", session.label, view.title)
    }
}

fn label_area(text: &str) -> Area {
    Area::new(
        text.chars().count() as i32 * LABEL_CHAR_W + 2 * LABEL_PAD,
        LABEL_H,
    )
}

/// The single global z-order plus damage accumulation
pub struct ViewStack {
    /// View ids front (index 0) to back
    order: Vec<ViewId>,
    screen: Area,
    damage: DamageTracker,
}

impl ViewStack {
    pub fn new(screen: Area) -> Self {
        Self {
            order: Vec::new(),
            screen,
            damage: DamageTracker::new(),
        }
    }

    /// Physical screen extent
    #[inline]
    pub fn screen(&self) -> Area {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Area) {
        self.screen = screen;
        self.damage.mark_all();
    }

    /// Current z-order, front to back
    pub fn order(&self) -> &[ViewId] {
        &self.order
    }

    /// Length of the leading run of stay-top views
    fn stay_top_len(&self, arena: &ViewArena) -> usize {
        self.order
            .iter()
            .take_while(|&&id| arena.get(id).map(|v| v.kind.stay_top()).unwrap_or(false))
            .count()
    }

    /// Add a newly created view at the front of its layer
    pub fn insert(&mut self, arena: &ViewArena, sessions: &SessionManager, id: ViewId) {
        self.stack(arena, sessions, id, None, true);
    }

    fn layer_of(&self, arena: &ViewArena, sessions: &SessionManager, id: ViewId) -> u32 {
        arena
            .get(id)
            .and_then(|v| sessions.domain(v.owner))
            .map(|d| d.layer)
            .unwrap_or(0)
    }

    /// Reposition a view in the global order.
    ///
    /// Stay-top views remain pinned above everything. All other placement
    /// is confined to the stretch of views sharing the target's layer, so
    /// restacking can never cross a layer boundary. Within the layer:
    /// `behind` with no neighbor goes to the front, `behind` a neighbor goes
    /// immediately after it, in front of a neighbor goes immediately before
    /// it, and in front of nothing goes just before the first background
    /// view or all the way back. When the neighbor does not match the view
    /// lands at the front of its layer.
    pub fn stack(
        &mut self,
        arena: &ViewArena,
        sessions: &SessionManager,
        view: ViewId,
        neighbor: Option<ViewId>,
        behind: bool,
    ) {
        if !arena.contains(view) {
            return;
        }
        self.order.retain(|&v| v != view);

        if arena.get(view).map(|v| v.kind.stay_top()).unwrap_or(false) {
            self.order.insert(0, view);
            return;
        }

        // Layers run descending front to back
        let layer = self.layer_of(arena, sessions, view);
        let start = self.stay_top_len(arena);
        let band_start = self.order[start..]
            .iter()
            .position(|&v| self.layer_of(arena, sessions, v) <= layer)
            .map(|p| p + start)
            .unwrap_or(self.order.len());
        let band_end = self.order[band_start..]
            .iter()
            .position(|&v| self.layer_of(arena, sessions, v) < layer)
            .map(|p| p + band_start)
            .unwrap_or(self.order.len());

        let band = &self.order[band_start..band_end];
        let position_of =
            |target: ViewId| band.iter().position(|&v| v == target).map(|p| p + band_start);
        let index = match (behind, neighbor) {
            (true, None) => Some(band_start),
            (true, Some(n)) => position_of(n).map(|p| p + 1),
            (false, Some(n)) => position_of(n),
            (false, None) => Some(
                band.iter()
                    .position(|&v| arena.get(v).map(|w| w.kind.is_background()).unwrap_or(false))
                    .map(|p| p + band_start)
                    .unwrap_or(band_end),
            ),
        };
        self.order.insert(index.unwrap_or(band_start), view);
    }

    /// Unlink a view from the order, damaging and relabeling the vacated
    /// region. Callers run the focus forget hook before destroying the view.
    pub fn remove_view(
        &mut self,
        arena: &mut ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
    ) {
        let outline = self.visible_outline(arena, sessions, pointer, id);
        self.order.retain(|&v| v != id);
        if let Some(outline) = outline {
            self.damage.add(outline);
            self.place_labels(arena, sessions, pointer, outline);
        }
    }

    /// Re-sort after a configuration reload: primarily by the owner
    /// domain's layer (higher layers draw in front), preserving relative
    /// order within a layer and keeping stay-top views pinned.
    pub fn sort_by_layer(&mut self, arena: &ViewArena, sessions: &SessionManager) {
        let start = self.stay_top_len(arena);
        self.order[start..].sort_by_key(|&id| {
            let layer = arena
                .get(id)
                .and_then(|v| sessions.domain(v.owner))
                .map(|d| d.layer)
                .unwrap_or(0);
            std::cmp::Reverse(layer)
        });
        self.damage.mark_all();
    }

    /// Absolute screen outline of a view, or `None` when it cannot appear:
    /// defunct, owner hidden or policy-less, degenerate geometry, or outside
    /// the screen region its domain permits.
    pub fn visible_outline(
        &self,
        arena: &ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
    ) -> Option<Rect> {
        let view = arena.get(id)?;
        if view.defunct {
            return None;
        }
        let session = sessions.get(view.owner)?;
        if session.defunct || !session.visible {
            return None;
        }
        let domain = session.domain.as_ref()?;

        let mut pos = domain.phys_pos(arena.abs_position(id), self.screen);
        if domain.origin == Origin::Pointer {
            pos += pointer;
        }
        let outline = Rect::at(pos, view.rect.area());

        let outline = if domain.origin == Origin::Pointer {
            outline
        } else {
            let permitted = Rect::at(
                domain.phys_pos(Point::ZERO, self.screen),
                domain.screen_area(self.screen),
            );
            outline.intersect(permitted)
        };
        outline.is_valid().then_some(outline)
    }

    /// Bounding box of a view's visible outline and all descendants'
    pub(crate) fn compound_outline(
        &self,
        arena: &ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
    ) -> Rect {
        let mut outline = self
            .visible_outline(arena, sessions, pointer, id)
            .unwrap_or(Rect::EMPTY);
        if let Some(view) = arena.get(id) {
            for &child in &view.children {
                outline = outline.union(self.compound_outline(arena, sessions, pointer, child));
            }
        }
        outline
    }

    /// Topmost view under a point, honoring per-pixel input masks.
    ///
    /// Stay-top views (the cursor) never take input. A zero input-mask byte
    /// passes the point through to the views behind.
    pub fn view_at(
        &self,
        arena: &ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        p: Point,
    ) -> Option<ViewId> {
        for &id in &self.order {
            let Some(view) = arena.get(id) else {
                continue;
            };
            if view.kind.stay_top() {
                continue;
            }
            let Some(outline) = self.visible_outline(arena, sessions, pointer, id) else {
                continue;
            };
            if !outline.contains(p) {
                continue;
            }
            if let Some(texture) = sessions.get(view.owner).and_then(|s| s.texture.as_ref()) {
                let local = p - outline.pos() + view.buffer_off;
                if texture.input_mask_at(local) == 0 {
                    continue;
                }
            }
            return Some(id);
        }
        None
    }

    /// Update a view's geometry. The compound outline before and after the
    /// change becomes the redraw region; labels are re-placed over it.
    pub fn geometry(
        &mut self,
        arena: &mut ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
        rect: Rect,
    ) {
        if !arena.contains(id) {
            return;
        }
        let old = self.compound_outline(arena, sessions, pointer, id);
        if let Some(view) = arena.get_mut(id) {
            view.rect = rect;
        }
        let new = self.compound_outline(arena, sessions, pointer, id);

        self.place_labels(arena, sessions, pointer, old.union(new));
        self.damage.add(old);
        self.damage.add(new);
    }

    /// Change the texture offset shown at the view's top-left corner
    pub fn set_buffer_offset(
        &mut self,
        arena: &mut ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
        offset: Point,
    ) {
        if let Some(view) = arena.get_mut(id) {
            view.buffer_off = offset;
        }
        if let Some(outline) = self.visible_outline(arena, sessions, pointer, id) {
            self.damage.add(outline);
        }
    }

    /// Update a view's title and re-place labels over its outline
    pub fn set_title(
        &mut self,
        arena: &mut ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        id: ViewId,
        title: &str,
    ) {
        if let Some(view) = arena.get_mut(id) {
            view.title = title.to_string();
        }
        if let Some(outline) = self.visible_outline(arena, sessions, pointer, id) {
            self.place_labels(arena, sessions, pointer, outline);
            self.damage.add(outline);
        }
    }

    // ------------------------------------------------------------------
    // Damage
    // ------------------------------------------------------------------

    pub fn add_damage(&mut self, rect: Rect) {
        self.damage.add(rect.intersect(Rect::from_area(self.screen)));
    }

    pub fn mark_all_damaged(&mut self) {
        self.damage.mark_all();
    }

    pub fn is_dirty(&self) -> bool {
        self.damage.is_dirty()
    }

    /// Damaged regions accumulated so far, without draining them
    pub fn damage_bounds(&self) -> Rect {
        if self.damage.is_full() {
            Rect::from_area(self.screen)
        } else {
            self.damage.bounding_box()
        }
    }

    /// Drain accumulated damage; `None` means redraw the whole screen
    pub fn take_damage(&mut self) -> Option<Vec<Rect>> {
        self.damage.take()
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Composite every view intersecting `clip` into the canvas
    pub fn draw(&self, canvas: &mut dyn Canvas, ctx: &DrawCtx, clip: Rect) {
        let clip = clip.intersect(Rect::from_area(self.screen));
        if clip.is_valid() {
            self.draw_rec(canvas, ctx, 0, clip);
        }
    }

    /// Recursive clip-cut compositing.
    ///
    /// Finds the frontmost view at or after `from` intersecting `clip`,
    /// recurses behind it for the top and left remainders, draws it clipped,
    /// then recurses for the right and bottom remainders. Alpha-transparent
    /// views recurse behind themselves first to reveal what they blend over.
    /// Terminates because every call advances the list position or shrinks
    /// the clip.
    fn draw_rec(&self, canvas: &mut dyn Canvas, ctx: &DrawCtx, from: usize, clip: Rect) {
        if !clip.is_valid() {
            return;
        }

        let mut i = from;
        let found = loop {
            if i >= self.order.len() {
                break None;
            }
            let id = self.order[i];
            if let Some(outline) = self.visible_outline(ctx.arena, ctx.sessions, ctx.pointer, id) {
                if outline.overlaps(clip) {
                    break Some((i, id, outline));
                }
            }
            i += 1;
        };

        let Some((i, id, outline)) = found else {
            // Bottom of the stack: paint the configured background
            canvas.set_clip(clip);
            canvas.draw_box(clip, ctx.background);
            return;
        };

        let clipped = outline.intersect(clip);
        let [top, left, right, bottom] = clip.cut(clipped);

        self.draw_rec(canvas, ctx, i + 1, top);
        self.draw_rec(canvas, ctx, i + 1, left);

        if ctx.arena.get(id).map(|v| v.transparent).unwrap_or(false) {
            self.draw_rec(canvas, ctx, i + 1, clipped);
        }
        canvas.set_clip(clipped);
        self.draw_view(canvas, ctx, id, outline);

        self.draw_rec(canvas, ctx, i + 1, right);
        self.draw_rec(canvas, ctx, i + 1, bottom);
    }

    /// Draw one view's content, frame, and label inside the current clip
    fn draw_view(&self, canvas: &mut dyn Canvas, ctx: &DrawCtx, id: ViewId, outline: Rect) {
        let Some(view) = ctx.arena.get(id) else {
            return;
        };
        let Some(session) = ctx.sessions.get(view.owner) else {
            return;
        };
        let Some(domain) = session.domain.as_ref() else {
            return;
        };

        match (&session.texture, domain.content) {
            (Some(texture), ContentMode::Client) => {
                canvas.draw_texture(outline.pos() - view.buffer_off, texture, None, view.transparent);
            }
            (Some(texture), ContentMode::Tinted) => {
                canvas.draw_texture(
                    outline.pos() - view.buffer_off,
                    texture,
                    Some(domain.color),
                    view.transparent,
                );
            }
            (None, _) => canvas.draw_box(outline, domain.color),
        }

        if domain.label_visible {
            let frame = if ctx.focus.is_focused(view.owner) {
                Color::WHITE
            } else {
                FRAME_UNFOCUSED
            };
            canvas.draw_box(Rect::new(outline.x, outline.y, outline.w, FRAME_W), frame);
            canvas.draw_box(
                Rect::new(outline.x, outline.bottom() - FRAME_W, outline.w, FRAME_W),
                frame,
            );
            canvas.draw_box(Rect::new(outline.x, outline.y, FRAME_W, outline.h), frame);
            canvas.draw_box(
                Rect::new(outline.right() - FRAME_W, outline.y, FRAME_W, outline.h),
                frame,
            );

            let band = view.label_rect.intersect(outline);
            if band.is_valid() {
                canvas.draw_box(band, frame);
                canvas.draw_text(
                    view.label_rect.pos() + Point::new(LABEL_PAD, 0),
                    Color::BLACK,
                    &label_text(session, view),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Label placement
    // ------------------------------------------------------------------

    /// Re-place labels for every top-level labeled view intersecting
    /// `region`
    pub fn place_labels(
        &mut self,
        arena: &mut ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        region: Rect,
    ) {
        if !region.is_valid() {
            return;
        }
        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(view) = arena.get(id) else {
                continue;
            };
            if view.parent.is_some() || view.kind.stay_top() {
                continue;
            }
            let Some(session) = sessions.get(view.owner) else {
                continue;
            };
            let Some(domain) = session.domain.as_ref() else {
                continue;
            };
            if !domain.label_visible {
                continue;
            }
            let Some(outline) = self.visible_outline(arena, sessions, pointer, id) else {
                continue;
            };
            if !outline.overlaps(region) {
                continue;
            }

            let spot = self.widest_spot(arena, sessions, pointer, 0, i, outline);
            let size = label_area(&label_text(session, view));
            let new_rect = if spot.is_valid() {
                if size.w <= spot.w && size.h <= spot.h {
                    // Centered within the widest visible sub-rectangle
                    Rect::at(
                        Point::new(
                            spot.x + (spot.w - size.w) / 2,
                            spot.y + (spot.h - size.h) / 2,
                        ),
                        size,
                    )
                } else {
                    // Anchored against the visible edge
                    Rect::at(spot.pos(), size).intersect(spot)
                }
            } else {
                Rect::EMPTY
            };

            let old = arena.get(id).map(|v| v.label_rect).unwrap_or(Rect::EMPTY);
            if old != new_rect {
                if let Some(view) = arena.get_mut(id) {
                    view.label_rect = new_rect;
                }
                self.damage.add(old);
                self.damage.add(new_rect);
            }
        }
    }

    /// Widest sub-rectangle of `clip` not obstructed by the views at list
    /// positions `from..end` (those in front of the label's view). Shares
    /// the cut decomposition with `draw_rec`. The cursor never pins labels.
    fn widest_spot(
        &self,
        arena: &ViewArena,
        sessions: &SessionManager,
        pointer: Point,
        from: usize,
        end: usize,
        clip: Rect,
    ) -> Rect {
        if !clip.is_valid() {
            return Rect::EMPTY;
        }

        let mut i = from;
        let found = loop {
            if i >= end {
                break None;
            }
            let id = self.order[i];
            let stay_top = arena.get(id).map(|v| v.kind.stay_top()).unwrap_or(true);
            if !stay_top {
                if let Some(outline) = self.visible_outline(arena, sessions, pointer, id) {
                    if outline.overlaps(clip) {
                        break Some((i, outline));
                    }
                }
            }
            i += 1;
        };

        let Some((i, outline)) = found else {
            return clip;
        };

        let covered = clip.intersect(outline);
        let mut best = Rect::EMPTY;
        for part in clip.cut(covered) {
            let candidate = self.widest_spot(arena, sessions, pointer, i + 1, end, part);
            if candidate.w > best.w || (candidate.w == best.w && candidate.h > best.h) {
                best = candidate;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, Mode, PixelFormat};
    use crate::canvas::PixelCanvas;
    use crate::domain::{DomainEntry, FocusMode, HoverMode};
    use crate::view::ViewKind;

    const SCREEN: Area = Area::new(200, 200);

    fn plain_domain(name: &str, layer: u32, color: Color) -> DomainEntry {
        DomainEntry {
            name: name.to_string(),
            color,
            layer,
            label_visible: false,
            content: ContentMode::Client,
            hover: HoverMode::Focused,
            focus: FocusMode::Click,
            origin: Origin::TopLeft,
            offset: Point::ZERO,
            area: Point::ZERO,
        }
    }

    struct Fixture {
        arena: ViewArena,
        sessions: SessionManager,
        stack: ViewStack,
        focus: Focus,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: ViewArena::new(),
                sessions: SessionManager::new(),
                stack: ViewStack::new(SCREEN),
                focus: Focus::new(),
            }
        }

        fn session(&mut self, label: &str, layer: u32, color: Color) -> u64 {
            let id = self.sessions.create(label, 1 << 24);
            self.sessions.get_mut(id).unwrap().domain = Some(plain_domain(label, layer, color));
            id
        }

        fn view(&mut self, owner: u64, rect: Rect) -> ViewId {
            let mut view = View::new(owner, None);
            view.rect = rect;
            let id = self.arena.insert(view);
            self.sessions.get_mut(owner).unwrap().views.push(id);
            self.stack.insert(&self.arena, &self.sessions, id);
            id
        }

        fn ctx(&self) -> DrawCtx<'_> {
            DrawCtx {
                arena: &self.arena,
                sessions: &self.sessions,
                focus: &self.focus,
                pointer: Point::ZERO,
                background: Color::BLACK,
            }
        }

        /// Reference renderer: every view back to front with plain clipping
        fn draw_naive(&self, canvas: &mut PixelCanvas) {
            canvas.set_clip(Rect::from_area(SCREEN));
            canvas.draw_box(Rect::from_area(SCREEN), Color::BLACK);
            let ctx = self.ctx();
            for &id in self.stack.order().iter().rev() {
                if let Some(outline) =
                    self.stack
                        .visible_outline(&self.arena, &self.sessions, Point::ZERO, id)
                {
                    canvas.set_clip(outline);
                    self.stack.draw_view(canvas, &ctx, id, outline);
                }
            }
        }
    }

    #[test]
    fn test_stack_front_and_back() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let v1 = f.view(s, Rect::new(0, 0, 10, 10));
        let v2 = f.view(s, Rect::new(0, 0, 10, 10));
        let v3 = f.view(s, Rect::new(0, 0, 10, 10));

        // Newest insertion lands in front
        assert_eq!(f.stack.order(), &[v3, v2, v1]);

        // Behind a neighbor
        f.stack.stack(&f.arena, &f.sessions, v3, Some(v2), true);
        assert_eq!(f.stack.order(), &[v2, v3, v1]);

        // In front of a neighbor
        f.stack.stack(&f.arena, &f.sessions, v1, Some(v2), false);
        assert_eq!(f.stack.order(), &[v1, v2, v3]);

        // Unknown neighbor falls back to the front
        f.stack.stack(&f.arena, &f.sessions, v3, Some(9999), true);
        assert_eq!(f.stack.order(), &[v3, v1, v2]);
    }

    #[test]
    fn test_stack_to_back_lands_before_background() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let bg = f.view(s, Rect::new(0, 0, 200, 200));
        f.arena.get_mut(bg).unwrap().kind = ViewKind::Background;
        f.stack.stack(&f.arena, &f.sessions, bg, None, false);
        let v1 = f.view(s, Rect::new(0, 0, 10, 10));
        let v2 = f.view(s, Rect::new(0, 0, 10, 10));

        // To back without a neighbor: directly in front of the background
        f.stack.stack(&f.arena, &f.sessions, v2, None, false);
        assert_eq!(f.stack.order(), &[v1, v2, bg]);
    }

    #[test]
    fn test_stay_top_stays_pinned() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let cursor = f.view(s, Rect::new(0, 0, 8, 8));
        f.arena.get_mut(cursor).unwrap().kind = ViewKind::PointerOrigin;
        f.stack.stack(&f.arena, &f.sessions, cursor, None, true);
        let v = f.view(s, Rect::new(0, 0, 10, 10));

        // Front request cannot displace the stay-top run
        assert_eq!(f.stack.order(), &[cursor, v]);

        f.stack.stack(&f.arena, &f.sessions, v, None, true);
        assert_eq!(f.stack.order(), &[cursor, v]);
    }

    #[test]
    fn test_sort_by_layer_stable() {
        let mut f = Fixture::new();
        let back = f.session("back", 0, Color::GRAY);
        let front = f.session("front", 5, Color::GRAY);
        let b1 = f.view(back, Rect::new(0, 0, 10, 10));
        let f1 = f.view(front, Rect::new(0, 0, 10, 10));
        let b2 = f.view(back, Rect::new(0, 0, 10, 10));
        let f2 = f.view(front, Rect::new(0, 0, 10, 10));

        f.stack.sort_by_layer(&f.arena, &f.sessions);

        // Higher layer in front, creation-relative order preserved per layer
        assert_eq!(f.stack.order(), &[f2, f1, b2, b1]);
    }

    #[test]
    fn test_view_at_respects_input_mask() {
        let mut f = Fixture::new();
        let behind = f.session("behind", 0, Color::GRAY);
        let front = f.session("front", 1, Color::GRAY);
        let vb = f.view(behind, Rect::new(0, 0, 100, 100));
        let vf = f.view(front, Rect::new(0, 0, 100, 100));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        // Front view with an input mask: left half passes through
        let mut texture = Buffer::allocate(
            Mode::new(Area::new(100, 100), PixelFormat::Rgb888),
            true,
        );
        for y in 0..100 {
            for x in 50..100 {
                texture.set_input_mask(Point::new(x, y), 1);
            }
        }
        f.sessions.get_mut(front).unwrap().texture = Some(texture);

        let hit_left = f
            .stack
            .view_at(&f.arena, &f.sessions, Point::ZERO, Point::new(10, 10));
        assert_eq!(hit_left, Some(vb));

        let hit_right = f
            .stack
            .view_at(&f.arena, &f.sessions, Point::ZERO, Point::new(60, 10));
        assert_eq!(hit_right, Some(vf));
    }

    #[test]
    fn test_view_at_skips_cursor_and_hidden() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let v = f.view(s, Rect::new(0, 0, 100, 100));
        let cursor = f.view(s, Rect::new(0, 0, 100, 100));
        f.arena.get_mut(cursor).unwrap().kind = ViewKind::PointerOrigin;
        f.stack.stack(&f.arena, &f.sessions, cursor, None, true);

        assert_eq!(
            f.stack
                .view_at(&f.arena, &f.sessions, Point::ZERO, Point::new(5, 5)),
            Some(v)
        );

        f.sessions.get_mut(s).unwrap().visible = false;
        assert_eq!(
            f.stack
                .view_at(&f.arena, &f.sessions, Point::ZERO, Point::new(5, 5)),
            None
        );
    }

    #[test]
    fn test_draw_matches_naive_back_to_front() {
        let mut f = Fixture::new();
        let a = f.session("a", 0, Color::rgb(200, 0, 0));
        let b = f.session("b", 1, Color::rgb(0, 200, 0));
        let c = f.session("c", 2, Color::rgb(0, 0, 200));
        f.view(a, Rect::new(10, 10, 120, 120));
        f.view(b, Rect::new(60, 40, 100, 100));
        f.view(c, Rect::new(30, 90, 150, 60));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        let mut recursive = PixelCanvas::new(SCREEN);
        f.stack
            .draw(&mut recursive, &f.ctx(), Rect::from_area(SCREEN));

        let mut naive = PixelCanvas::new(SCREEN);
        f.draw_naive(&mut naive);

        assert_eq!(recursive.pixels(), naive.pixels());
    }

    #[test]
    fn test_draw_reveals_back_view_in_remainder() {
        let mut f = Fixture::new();
        let back = f.session("back", 0, Color::rgb(0, 200, 0));
        let front = f.session("front", 1, Color::rgb(200, 0, 0));
        f.view(back, Rect::new(0, 0, 100, 100));
        f.view(front, Rect::new(25, 25, 50, 50));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        let mut canvas = PixelCanvas::new(SCREEN);
        f.stack.draw(&mut canvas, &f.ctx(), Rect::from_area(SCREEN));

        // Overlap shows the front view
        assert_eq!(canvas.pixel(Point::new(50, 50)), Color::rgb(200, 0, 0));
        // Remainder shows the back view
        assert_eq!(canvas.pixel(Point::new(10, 10)), Color::rgb(0, 200, 0));
        assert_eq!(canvas.pixel(Point::new(90, 90)), Color::rgb(0, 200, 0));
        // Past both views: background
        assert_eq!(canvas.pixel(Point::new(150, 150)), Color::BLACK);
    }

    #[test]
    fn test_transparent_view_reveals_what_it_blends_over() {
        let mut f = Fixture::new();
        let back = f.session("back", 0, Color::rgb(0, 200, 0));
        let front = f.session("front", 1, Color::rgb(200, 0, 0));
        f.view(back, Rect::new(0, 0, 100, 100));
        let vf = f.view(front, Rect::new(0, 0, 100, 100));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        // Fully transparent texture on the front view
        let texture = Buffer::allocate(
            Mode::new(Area::new(100, 100), PixelFormat::Rgb888),
            true,
        );
        f.sessions.get_mut(front).unwrap().texture = Some(texture);
        f.arena.get_mut(vf).unwrap().transparent = true;

        let mut canvas = PixelCanvas::new(SCREEN);
        f.stack.draw(&mut canvas, &f.ctx(), Rect::from_area(SCREEN));

        // Alpha 0 everywhere: the back view shows through
        assert_eq!(canvas.pixel(Point::new(50, 50)), Color::rgb(0, 200, 0));
    }

    #[test]
    fn test_geometry_damage_is_union_of_old_and_new() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let v = f.view(s, Rect::new(0, 0, 100, 100));
        let _ = f.stack.take_damage();

        f.stack
            .geometry(&mut f.arena, &f.sessions, Point::ZERO, v, Rect::new(50, 50, 100, 100));

        let regions = f.stack.take_damage().unwrap();
        assert_eq!(regions, vec![Rect::new(0, 0, 150, 150)]);
    }

    #[test]
    fn test_geometry_damage_includes_children() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let parent = f.view(s, Rect::new(0, 0, 50, 50));
        let mut child = View::new(s, Some(parent));
        child.rect = Rect::new(40, 40, 30, 30);
        let child = f.arena.insert(child);
        f.stack.insert(&f.arena, &f.sessions, child);
        let _ = f.stack.take_damage();

        f.stack
            .geometry(&mut f.arena, &f.sessions, Point::ZERO, parent, Rect::new(10, 10, 50, 50));

        // Damage covers the child sticking out, old and new
        let bounds = f.stack.take_damage().unwrap()[0];
        assert_eq!(bounds, Rect::new(0, 0, 80, 80));
    }

    #[test]
    fn test_label_centered_when_unobstructed() {
        let mut f = Fixture::new();
        let s = f.session("app", 1, Color::GRAY);
        f.sessions
            .get_mut(s)
            .unwrap()
            .domain
            .as_mut()
            .unwrap()
            .label_visible = true;
        let v = f.view(s, Rect::new(20, 20, 160, 100));

        f.stack
            .place_labels(&mut f.arena, &f.sessions, Point::ZERO, Rect::from_area(SCREEN));

        let label = f.arena.get(v).unwrap().label_rect;
        assert!(label.is_valid());
        let outline = Rect::new(20, 20, 160, 100);
        assert_eq!(label.center().x, outline.center().x);
        assert!(outline.contains(label.pos()));
    }

    #[test]
    fn test_label_moves_into_visible_remainder() {
        let mut f = Fixture::new();
        let target = f.session("app", 0, Color::GRAY);
        f.sessions
            .get_mut(target)
            .unwrap()
            .domain
            .as_mut()
            .unwrap()
            .label_visible = true;
        let occluder = f.session("cover", 1, Color::GRAY);

        let v = f.view(target, Rect::new(0, 0, 200, 100));
        // Occluder hides the left three quarters
        f.view(occluder, Rect::new(0, 0, 150, 200));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        f.stack
            .place_labels(&mut f.arena, &f.sessions, Point::ZERO, Rect::from_area(SCREEN));

        let label = f.arena.get(v).unwrap().label_rect;
        assert!(label.is_valid());
        // Label sits inside the visible right strip
        assert!(label.x >= 150);
        assert!(label.right() <= 200);
    }

    #[test]
    fn test_label_dropped_when_fully_obscured() {
        let mut f = Fixture::new();
        let target = f.session("app", 0, Color::GRAY);
        f.sessions
            .get_mut(target)
            .unwrap()
            .domain
            .as_mut()
            .unwrap()
            .label_visible = true;
        let occluder = f.session("cover", 1, Color::GRAY);

        let v = f.view(target, Rect::new(10, 10, 50, 50));
        f.view(occluder, Rect::new(0, 0, 200, 200));
        f.stack.sort_by_layer(&f.arena, &f.sessions);

        f.stack
            .place_labels(&mut f.arena, &f.sessions, Point::ZERO, Rect::from_area(SCREEN));

        assert!(!f.arena.get(v).unwrap().label_rect.is_valid());
    }

    #[test]
    fn test_remove_view_damages_vacated_region() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::GRAY);
        let v = f.view(s, Rect::new(30, 30, 40, 40));
        let _ = f.stack.take_damage();

        f.stack
            .remove_view(&mut f.arena, &f.sessions, Point::ZERO, v);

        assert!(!f.stack.order().contains(&v));
        assert_eq!(f.stack.take_damage().unwrap(), vec![Rect::new(30, 30, 40, 40)]);
    }

    #[test]
    fn test_degenerate_geometry_not_drawn() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::rgb(200, 0, 0));
        f.view(s, Rect::new(10, 10, 0, 50));

        let mut canvas = PixelCanvas::new(SCREEN);
        f.stack.draw(&mut canvas, &f.ctx(), Rect::from_area(SCREEN));
        assert_eq!(canvas.pixel(Point::new(10, 10)), Color::BLACK);
    }

    #[test]
    fn test_domain_region_clips_drawing() {
        let mut f = Fixture::new();
        let s = f.session("a", 1, Color::rgb(200, 0, 0));
        // Domain permits only the top 50 rows
        f.sessions.get_mut(s).unwrap().domain.as_mut().unwrap().area = Point::new(0, 50);
        f.view(s, Rect::new(0, 0, 100, 100));

        let mut canvas = PixelCanvas::new(SCREEN);
        f.stack.draw(&mut canvas, &f.ctx(), Rect::from_area(SCREEN));

        assert_eq!(canvas.pixel(Point::new(10, 40)), Color::rgb(200, 0, 0));
        assert_eq!(canvas.pixel(Point::new(10, 60)), Color::BLACK);
    }
}
