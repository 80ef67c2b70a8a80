//! The server: one struct owning every piece of compositor state.
//!
//! Sessions talk to the server through capability-shaped entry points;
//! input routing and command execution live in their own modules as further
//! `impl Server` blocks. Destruction requested while an input batch is being
//! dispatched is deferred: the target is tombstoned and swept when the batch
//! unwinds, so no dispatch path ever dereferences freed state.

use std::collections::BTreeSet;

use slate_core::{Area, Point, Rect};

use crate::buffer::{Buffer, Mode};
use crate::canvas::Canvas;
use crate::config::Config;
use crate::domain::DomainRegistry;
use crate::error::SessionError;
use crate::focus::Focus;
use crate::input::{Event, Keycode};
use crate::report::{NullReporter, Report, Reporter};
use crate::session::{
    SessionCapability, SessionId, SessionManager, SessionOp, ViewCapability, ViewHandle,
};
use crate::stack::{DrawCtx, ViewStack};
use crate::view::{View, ViewArena, ViewId};

pub struct Server {
    pub(crate) arena: ViewArena,
    pub(crate) sessions: SessionManager,
    pub(crate) stack: ViewStack,
    pub(crate) focus: Focus,
    pub(crate) registry: DomainRegistry,
    pub(crate) config: Config,
    pub(crate) pointer: Point,
    /// Session currently under the pointer
    pub(crate) pointed: Option<SessionId>,
    /// Session receiving the current press/release sequence
    pub(crate) receiver: Option<SessionId>,
    pub(crate) pressed: BTreeSet<Keycode>,
    /// Nonzero while an input batch is being dispatched
    pub(crate) dispatch_depth: u32,
    defunct_views: Vec<ViewId>,
    defunct_sessions: Vec<SessionId>,
    reporter: Box<dyn Reporter>,
}

impl Server {
    pub fn new(screen: Area) -> Self {
        Self::with_reporter(screen, Box::new(NullReporter))
    }

    pub fn with_reporter(screen: Area, reporter: Box<dyn Reporter>) -> Self {
        Self {
            arena: ViewArena::new(),
            sessions: SessionManager::new(),
            stack: ViewStack::new(screen),
            focus: Focus::new(),
            registry: DomainRegistry::new(),
            config: Config::default(),
            pointer: Point::ZERO,
            pointed: None,
            receiver: None,
            pressed: BTreeSet::new(),
            dispatch_depth: 0,
            defunct_views: Vec::new(),
            defunct_sessions: Vec::new(),
            reporter,
        }
    }

    /// Physical screen extent
    pub fn screen(&self) -> Area {
        self.stack.screen()
    }

    /// Display mode as sessions see it
    pub fn mode(&self) -> Mode {
        Mode::new(self.stack.screen(), crate::buffer::PixelFormat::Rgb888)
    }

    /// Change the screen extent; every session's policy region follows
    pub fn set_screen(&mut self, screen: Area) {
        self.stack.set_screen(screen);
        self.stack.place_labels(
            &mut self.arena,
            &self.sessions,
            self.pointer,
            Rect::from_area(screen),
        );
    }

    /// Current focus holder
    pub fn focused(&self) -> Option<SessionCapability> {
        self.focus.focused.map(SessionCapability)
    }

    /// Replace the whole configuration.
    ///
    /// The domain registry is rebuilt, every session re-resolves its policy
    /// by name, and the stack re-sorts by layer.
    pub fn apply_config(&mut self, config: Config) {
        self.registry = DomainRegistry::build(&config.domains);
        self.config = config;
        log::info!("configuration applied, {} domains", self.registry.len());

        for id in self.sessions.ids() {
            let entry = self
                .sessions
                .get(id)
                .and_then(|s| self.registry.lookup(s.domain_name()))
                .cloned();
            if let Some(session) = self.sessions.get_mut(id) {
                session.domain = entry;
            }
        }

        self.stack.sort_by_layer(&self.arena, &self.sessions);
        self.stack.place_labels(
            &mut self.arena,
            &self.sessions,
            self.pointer,
            Rect::from_area(self.stack.screen()),
        );
        self.update_pointed();
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Create a session. The first token of the label picks its domain.
    pub fn create_session(&mut self, label: &str, quota_limit: u64) -> SessionCapability {
        let id = self.sessions.create(label, quota_limit);
        let entry = self
            .sessions
            .get(id)
            .and_then(|s| self.registry.lookup(s.domain_name()))
            .cloned();
        if entry.is_none() {
            log::warn!("session '{label}' matches no domain, it stays invisible");
        }
        if let Some(session) = self.sessions.get_mut(id) {
            session.domain = entry;
        }
        log::info!("session '{label}' created as {id}");
        SessionCapability(id)
    }

    /// Destroy a session with everything it owns.
    ///
    /// Safe to call from an event consumer: mid-dispatch the session is only
    /// tombstoned and the sweep at the end of the batch reclaims it.
    pub fn destroy_session(&mut self, session: SessionCapability) {
        let id = session.0;
        let Some(s) = self.sessions.get_mut(id) else {
            return;
        };
        if s.defunct {
            return;
        }

        if self.dispatch_depth > 0 {
            s.defunct = true;
            let views = s.views.clone();
            for view in views {
                self.tombstone_view(view);
            }
            self.detach_session(id);
            self.defunct_sessions.push(id);
            return;
        }

        self.drop_session(id);
    }

    /// Hide, show, or raise every live session whose label ends with
    /// `selector`
    pub fn session_control(&mut self, selector: &str, op: SessionOp) {
        for id in self.sessions.ids() {
            let matched = self
                .sessions
                .get(id)
                .map(|s| !s.defunct && s.label.ends_with(selector))
                .unwrap_or(false);
            if !matched {
                continue;
            }
            match op {
                SessionOp::Hide => {
                    self.damage_session_views(id);
                    if let Some(s) = self.sessions.get_mut(id) {
                        s.visible = false;
                    }
                }
                SessionOp::Show => {
                    if let Some(s) = self.sessions.get_mut(id) {
                        s.visible = true;
                    }
                    self.damage_session_views(id);
                }
                SessionOp::ToFront => {
                    self.raise_session(id);
                }
            }
        }
        self.stack.place_labels(
            &mut self.arena,
            &self.sessions,
            self.pointer,
            Rect::from_area(self.stack.screen()),
        );
        self.update_pointed();
    }

    /// Bring all of a session's views to the front, preserving their
    /// relative order
    fn raise_session(&mut self, id: SessionId) {
        let stacked: Vec<ViewId> = self
            .stack
            .order()
            .iter()
            .copied()
            .filter(|&v| self.arena.get(v).map(|w| w.owner == id).unwrap_or(false))
            .collect();
        for &view in stacked.iter().rev() {
            self.stack.stack(&self.arena, &self.sessions, view, None, true);
        }
        self.damage_session_views(id);
    }

    /// Delegate this session's focus to another session.
    ///
    /// Subsequent focus grants and routed sequences land at the end of the
    /// delegation chain. A delegation that would close a cycle is rejected.
    pub fn delegate_focus(
        &mut self,
        session: SessionCapability,
        target: Option<SessionCapability>,
    ) -> Result<(), SessionError> {
        let id = session.0;
        self.sessions.get(id).ok_or(SessionError::UnknownSession)?;
        let target_id = match target {
            Some(cap) => {
                self.sessions
                    .get(cap.0)
                    .ok_or(SessionError::UnknownSession)?;
                Some(cap.0)
            }
            None => None,
        };

        if let Some(mut cursor) = target_id {
            let mut steps = self.sessions.len();
            loop {
                if cursor == id {
                    return Err(SessionError::ForwardCycle);
                }
                match self.sessions.get(cursor).and_then(|s| s.forward_focus) {
                    Some(next) if steps > 0 => {
                        steps -= 1;
                        cursor = next;
                    }
                    _ => break,
                }
            }
        }

        if let Some(s) = self.sessions.get_mut(id) {
            s.forward_focus = target_id;
        }
        Ok(())
    }

    /// Drain a session's event inbox
    pub fn poll_events(&mut self, session: SessionCapability) -> Vec<Event> {
        self.sessions
            .get_mut(session.0)
            .map(|s| std::mem::take(&mut s.inbox))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Create a view owned by `session`, optionally below a parent view from
    /// the session's own handle space
    pub fn create_view(
        &mut self,
        session: SessionCapability,
        parent: Option<ViewHandle>,
    ) -> Result<ViewHandle, SessionError> {
        let id = session.0;
        let s = self.sessions.get(id).ok_or(SessionError::UnknownSession)?;
        let transparent = s.has_alpha();
        // Views of pointer-anchored domains ride above everything and
        // never take input
        let kind = match s.domain.as_ref().map(|d| d.origin) {
            Some(crate::domain::Origin::Pointer) => crate::view::ViewKind::PointerOrigin,
            _ => crate::view::ViewKind::Ordinary,
        };
        let parent = match parent {
            Some(handle) => {
                let target = self
                    .resolve(id, handle)
                    .ok_or(SessionError::UnknownView)?;
                Some(target)
            }
            None => None,
        };

        let mut view = View::new(id, parent);
        view.transparent = transparent;
        view.kind = kind;
        let view_id = self.arena.insert(view);

        let handle = match self.sessions.get_mut(id) {
            Some(s) => match s.alloc_handle(view_id) {
                Ok(handle) => {
                    s.views.push(view_id);
                    handle
                }
                Err(e) => {
                    self.arena.remove(view_id);
                    return Err(e);
                }
            },
            None => return Err(SessionError::UnknownSession),
        };

        self.stack.insert(&self.arena, &self.sessions, view_id);
        Ok(handle)
    }

    /// Destroy a view. Mid-dispatch the view is tombstoned and swept later.
    pub fn destroy_view(&mut self, session: SessionCapability, handle: ViewHandle) {
        let Some(id) = self.resolve(session.0, handle) else {
            return;
        };
        if let Some(s) = self.sessions.get_mut(session.0) {
            s.release_handle(handle);
            s.views.retain(|&v| v != id);
            if s.background_view == Some(id) {
                s.background_view = None;
            }
        }

        if self.dispatch_depth > 0 {
            self.tombstone_view(id);
            self.defunct_views.push(id);
        } else {
            self.drop_view(id);
        }
    }

    /// Export a view as a capability another session can parent under
    pub fn view_capability(
        &self,
        session: SessionCapability,
        handle: ViewHandle,
    ) -> Result<ViewCapability, SessionError> {
        self.resolve(session.0, handle)
            .map(ViewCapability)
            .ok_or(SessionError::UnknownView)
    }

    /// Import a foreign view capability into this session's handle space,
    /// optionally rebinding an already-allocated handle slot
    pub fn import_view(
        &mut self,
        session: SessionCapability,
        capability: ViewCapability,
        reuse: Option<ViewHandle>,
    ) -> Result<ViewHandle, SessionError> {
        let alive = self
            .arena
            .get(capability.0)
            .map(|v| !v.defunct)
            .unwrap_or(false);
        if !alive {
            return Err(SessionError::UnknownView);
        }
        let s = self
            .sessions
            .get_mut(session.0)
            .ok_or(SessionError::UnknownSession)?;
        match reuse {
            Some(handle) => {
                if !s.handles.contains_key(&handle) {
                    return Err(SessionError::UnknownView);
                }
                s.handles.insert(handle, capability.0);
                Ok(handle)
            }
            None => s.alloc_handle(capability.0),
        }
    }

    /// Release a handle slot without touching the view it referred to
    pub fn release_view_handle(&mut self, session: SessionCapability, handle: ViewHandle) {
        if let Some(s) = self.sessions.get_mut(session.0) {
            s.release_handle(handle);
        }
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Allocate or resize the session's texture.
    ///
    /// The quota check admits any mode that fits once the old buffer is
    /// released. On failure nothing changes and the old buffer stays valid.
    /// Old content survives only when both buffers fit the quota at the
    /// same time.
    pub fn realloc_buffer(
        &mut self,
        session: SessionCapability,
        mode: Mode,
        use_alpha: bool,
    ) -> Result<(), SessionError> {
        let id = session.0;
        let s = self
            .sessions
            .get_mut(id)
            .ok_or(SessionError::UnknownSession)?;

        let needed = mode.byte_count(use_alpha);
        let old_bytes = s.texture.as_ref().map(|t| t.byte_count()).unwrap_or(0);
        let available = s.quota.limit() - (s.quota.used() - old_bytes);
        if needed > available {
            return Err(SessionError::quota_exceeded(needed, available));
        }

        let mut buffer = Buffer::allocate(mode, use_alpha);
        if s.quota.used() + needed <= s.quota.limit() {
            if let Some(old) = s.texture.as_ref() {
                buffer.copy_content_from(old);
            }
        }
        s.quota.release(old_bytes);
        s.quota.charge(needed)?;
        s.texture = Some(buffer);

        let views = s.views.clone();
        for view in views {
            if let Some(v) = self.arena.get_mut(view) {
                v.transparent = use_alpha;
            }
        }
        self.damage_session_views(id);
        Ok(())
    }

    /// Drop the session's texture, returning its bytes to the quota
    pub fn release_buffer(&mut self, session: SessionCapability) {
        let id = session.0;
        if let Some(s) = self.sessions.get_mut(id) {
            if let Some(old) = s.texture.take() {
                s.quota.release(old.byte_count());
            }
        }
        self.damage_session_views(id);
    }

    /// Mutable access to the session's texture for content updates
    pub fn buffer_mut(&mut self, session: SessionCapability) -> Option<&mut Buffer> {
        self.sessions.get_mut(session.0)?.texture.as_mut()
    }

    /// The client updated a region of its texture: damage every place on
    /// screen that shows it
    pub fn submit_damage(&mut self, session: SessionCapability, rect: Rect) {
        let views = self
            .sessions
            .get(session.0)
            .map(|s| s.views.clone())
            .unwrap_or_default();
        for view in views {
            let Some(outline) =
                self.stack
                    .visible_outline(&self.arena, &self.sessions, self.pointer, view)
            else {
                continue;
            };
            let Some(v) = self.arena.get(view) else {
                continue;
            };
            let on_screen = rect
                .moved(outline.pos() - v.buffer_off)
                .intersect(outline);
            self.stack.add_damage(on_screen);
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Redraw the accumulated damage into the canvas
    pub fn render(&mut self, canvas: &mut dyn Canvas) {
        if !self.stack.is_dirty() {
            return;
        }
        let damage = self.stack.take_damage();
        let ctx = DrawCtx {
            arena: &self.arena,
            sessions: &self.sessions,
            focus: &self.focus,
            pointer: self.pointer,
            background: self.config.background,
        };
        match damage {
            None => {
                self.stack
                    .draw(canvas, &ctx, Rect::from_area(self.stack.screen()));
            }
            Some(regions) => {
                for region in regions {
                    self.stack.draw(canvas, &ctx, region);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Destruction plumbing
    // ------------------------------------------------------------------

    fn tombstone_view(&mut self, id: ViewId) {
        if let Some(outline) =
            self.stack
                .visible_outline(&self.arena, &self.sessions, self.pointer, id)
        {
            self.stack.add_damage(outline);
        }
        if let Some(view) = self.arena.get_mut(id) {
            view.defunct = true;
        }
    }

    fn drop_view(&mut self, id: ViewId) {
        // Children reanchor from parent-relative to absolute coordinates
        // when they are orphaned; repaint them at both positions
        let children = self
            .arena
            .get(id)
            .map(|v| v.children.clone())
            .unwrap_or_default();
        let mut moved = Rect::EMPTY;
        for &child in &children {
            moved = moved.union(self.stack.compound_outline(
                &self.arena,
                &self.sessions,
                self.pointer,
                child,
            ));
        }
        self.stack
            .remove_view(&mut self.arena, &self.sessions, self.pointer, id);
        self.arena.remove(id);
        for &child in &children {
            moved = moved.union(self.stack.compound_outline(
                &self.arena,
                &self.sessions,
                self.pointer,
                child,
            ));
        }
        if moved.is_valid() {
            self.stack.add_damage(moved);
            self.stack
                .place_labels(&mut self.arena, &self.sessions, self.pointer, moved);
        }
    }

    /// Clear every routing reference into a dying session
    fn detach_session(&mut self, id: SessionId) {
        self.focus.forget_session(id);
        if self.pointed == Some(id) {
            self.pointed = None;
        }
        if self.receiver == Some(id) {
            self.receiver = None;
        }
        for other in self.sessions.ids() {
            if let Some(s) = self.sessions.get_mut(other) {
                if s.forward_focus == Some(id) {
                    s.forward_focus = None;
                }
            }
        }
    }

    fn drop_session(&mut self, id: SessionId) {
        let views = self
            .sessions
            .get(id)
            .map(|s| s.views.clone())
            .unwrap_or_default();
        for view in views {
            self.drop_view(view);
        }
        self.detach_session(id);
        if let Some(s) = self.sessions.remove(id) {
            log::info!("session '{}' destroyed", s.label);
        }
        self.stack.place_labels(
            &mut self.arena,
            &self.sessions,
            self.pointer,
            Rect::from_area(self.stack.screen()),
        );
        self.update_pointed();
        self.report_focus();
    }

    /// Reclaim everything tombstoned during the last dispatch
    pub(crate) fn sweep(&mut self) {
        for view in std::mem::take(&mut self.defunct_views) {
            self.drop_view(view);
        }
        for session in std::mem::take(&mut self.defunct_sessions) {
            self.drop_session(session);
        }
    }

    // ------------------------------------------------------------------
    // Damage helpers and reports
    // ------------------------------------------------------------------

    pub(crate) fn damage_session_views(&mut self, id: SessionId) {
        let views = self
            .sessions
            .get(id)
            .map(|s| s.views.clone())
            .unwrap_or_default();
        for view in views {
            if let Some(outline) =
                self.stack
                    .visible_outline(&self.arena, &self.sessions, self.pointer, view)
            {
                self.stack.add_damage(outline);
            }
        }
    }

    /// Damage the outlines of pointer-anchored views at a given pointer
    /// position
    pub(crate) fn damage_pointer_views(&mut self, at: Point) {
        let anchored: Vec<ViewId> = self
            .stack
            .order()
            .iter()
            .copied()
            .filter(|&v| {
                self.arena
                    .get(v)
                    .and_then(|view| self.sessions.domain(view.owner))
                    .map(|d| d.origin == crate::domain::Origin::Pointer)
                    .unwrap_or(false)
            })
            .collect();
        for view in anchored {
            if let Some(outline) =
                self.stack
                    .visible_outline(&self.arena, &self.sessions, at, view)
            {
                self.stack.add_damage(outline);
            }
        }
    }

    pub(crate) fn report(&mut self, report: Report) {
        self.reporter.submit(report);
    }

    pub(crate) fn report_focus(&mut self) {
        if !self.config.reports.focus {
            return;
        }
        let label = self
            .focus
            .focused
            .and_then(|id| self.sessions.get(id))
            .map(|s| s.label.clone());
        self.report(Report::Focus { label });
    }

    pub(crate) fn report_hover(&mut self) {
        if !self.config.reports.hover {
            return;
        }
        let label = self
            .pointed
            .and_then(|id| self.sessions.get(id))
            .map(|s| s.label.clone());
        self.report(Report::Hover { label });
    }

    pub(crate) fn report_keys(&mut self) {
        if !self.config.reports.keys {
            return;
        }
        let pressed = self.pressed.iter().copied().collect();
        self.report(Report::Keys { pressed });
    }
}
