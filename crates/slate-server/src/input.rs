//! Input events and routing.
//!
//! Raw events enter in batches. Motion runs are coalesced to one position
//! before dispatch. A press while no key is held opens a routing sequence
//! and picks the receiver once; every event until the matching last release
//! goes to that receiver, so a drag never leaks into another session.
//! Focus changes triggered by clicks commit when the sequence ends.

use serde::{Deserialize, Serialize};
use slate_core::Point;

use crate::domain::{FocusMode, HoverMode};
use crate::report::Report;
use crate::server::Server;
use crate::session::SessionId;

/// Raw key or button code, evdev numbering
pub type Keycode = u32;

pub const BTN_LEFT: Keycode = 0x110;
pub const BTN_RIGHT: Keycode = 0x111;
pub const BTN_MIDDLE: Keycode = 0x112;

/// Whether a keycode is a pointer button
#[inline]
pub fn is_pointer_button(key: Keycode) -> bool {
    (0x110..=0x117).contains(&key)
}

/// One input event, raw from a device or synthesized toward a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Press { key: Keycode },
    Release { key: Keycode },
    /// Absolute pointer position
    AbsMotion { x: i32, y: i32 },
    /// Pointer movement relative to the current position
    RelMotion { x: i32, y: i32 },
    Wheel { x: i32, y: i32 },
    Touch { x: i32, y: i32 },
    /// Synthesized: the pointer left the session's views
    Leave,
    /// Synthesized: keyboard focus changed
    Focus { gained: bool },
}

impl Server {
    /// Route one batch of raw input events.
    ///
    /// Session destruction requested from within dispatch is deferred and
    /// swept once the batch completes.
    pub fn handle_input(&mut self, events: &[Event]) {
        self.dispatch_depth += 1;

        let mut i = 0;
        while i < events.len() {
            match events[i] {
                Event::AbsMotion { .. } | Event::RelMotion { .. } | Event::Touch { .. } => {
                    // Coalesce the whole run of motion into one position
                    let mut pos = self.pointer;
                    while i < events.len() {
                        match events[i] {
                            Event::AbsMotion { x, y } | Event::Touch { x, y } => {
                                pos = Point::new(x, y);
                            }
                            Event::RelMotion { x, y } => {
                                pos += Point::new(x, y);
                            }
                            _ => break,
                        }
                        i += 1;
                    }
                    self.handle_motion(pos);
                }
                Event::Press { key } => {
                    self.handle_press(key);
                    i += 1;
                }
                Event::Release { key } => {
                    self.handle_release(key);
                    i += 1;
                }
                Event::Wheel { x, y } => {
                    self.handle_wheel(x, y);
                    i += 1;
                }
                // Synthesized variants are not valid raw input
                Event::Leave | Event::Focus { .. } => {
                    i += 1;
                }
            }
        }

        self.dispatch_depth -= 1;
        if self.dispatch_depth == 0 {
            self.sweep();
        }
    }

    fn handle_motion(&mut self, pos: Point) {
        let screen = self.stack.screen();
        let pos = pos.clamped(Point::ZERO, Point::new(screen.w - 1, screen.h - 1));
        if pos != self.pointer {
            // Pointer-anchored views (the cursor) move with the pointer
            let old = self.pointer;
            self.damage_pointer_views(old);
            self.pointer = pos;
            self.damage_pointer_views(pos);
            if self.config.reports.pointer {
                self.report(Report::Pointer { x: pos.x, y: pos.y });
            }
        }

        if self.focus.keys_held() {
            // Mid-sequence motion stays with the receiver
            if let Some(receiver) = self.receiver {
                self.sessions
                    .deliver(receiver, Event::AbsMotion { x: pos.x, y: pos.y });
            }
            return;
        }

        self.update_pointed();
        if let Some(pointed) = self.pointed {
            if self.hover_eligible(pointed) {
                self.sessions
                    .deliver(pointed, Event::AbsMotion { x: pos.x, y: pos.y });
            }
        }
    }

    fn handle_wheel(&mut self, x: i32, y: i32) {
        let target = if self.focus.keys_held() {
            self.receiver
        } else {
            self.pointed.filter(|&p| self.hover_eligible(p))
        };
        if let Some(target) = target {
            self.sessions.deliver(target, Event::Wheel { x, y });
        }
    }

    fn handle_press(&mut self, key: Keycode) {
        if !self.pressed.insert(key) {
            return;
        }
        if self.focus.key_count == 0 {
            self.begin_sequence(key);
        }
        self.focus.key_count += 1;

        if let Some(receiver) = self.receiver {
            self.sessions.deliver(receiver, Event::Press { key });
        }
        self.report_keys();
    }

    fn handle_release(&mut self, key: Keycode) {
        if !self.pressed.remove(&key) {
            return;
        }
        if let Some(receiver) = self.receiver {
            self.sessions.deliver(receiver, Event::Release { key });
        }
        self.focus.key_count = self.focus.key_count.saturating_sub(1);
        self.report_keys();

        if self.focus.key_count == 0 {
            self.end_sequence();
        }
    }

    /// Pick the receiver for a new press/release sequence
    fn begin_sequence(&mut self, key: Keycode) {
        self.focus.global_sequence = false;

        if is_pointer_button(key) {
            self.begin_click();
        } else {
            self.receiver = self.focus.focused.map(|f| self.sessions.resolve_forward(f));
        }

        // A focus-independent binding overrides only who receives the
        // sequence; any focus handoff above still happened
        let binding = self
            .config
            .global_keys
            .iter()
            .find(|b| b.key == key)
            .map(|b| b.session.clone());
        if let Some(label) = binding {
            if let Some(target) = self.sessions.lookup_label(&label) {
                self.focus.global_sequence = true;
                self.receiver = Some(self.sessions.resolve_forward(target));
            } else {
                log::warn!("global key {key:#x} bound to unknown session '{label}'");
            }
        }
    }

    /// A pointer button opened the sequence: route to the pointed session
    /// and arrange the focus change its domain's policy calls for
    fn begin_click(&mut self) {
        self.update_pointed();
        let Some(pointed) = self.pointed else {
            self.receiver = None;
            return;
        };

        let focus_mode = self
            .sessions
            .domain(pointed)
            .map(|d| d.focus)
            .unwrap_or(FocusMode::None);

        // A click on an unfocusable session unrelated to the focused one is
        // swallowed rather than routed through the view underneath
        let related = self
            .focus
            .focused
            .map(|f| f == pointed || self.sessions.same_domain(f, pointed))
            .unwrap_or(false);
        if focus_mode == FocusMode::None && !related {
            self.receiver = None;
            return;
        }

        let resolved = self.sessions.resolve_forward(pointed);
        self.receiver = Some(resolved);

        if self.config.reports.clicked {
            if let Some(label) = self.sessions.get(pointed).map(|s| s.label.clone()) {
                self.report(Report::Clicked { label });
            }
        }

        // A click on a focusable session, or one related to the focused
        // session, shifts the focus there. A transient domain gets the
        // focus-event pair and the rest of the sequence, but the persistent
        // focus snaps back when the last key goes up.
        if self.focus.focused != Some(resolved) {
            if focus_mode == FocusMode::Transient {
                if let Some(old) = self.focus.focused {
                    self.sessions.deliver(old, Event::Focus { gained: false });
                }
                self.sessions.deliver(resolved, Event::Focus { gained: true });
                self.focus.transient = Some(resolved);
            } else {
                self.set_focus(Some(resolved));
            }
        }
    }

    /// Change the focus, deferring while a key is held so a half-finished
    /// sequence never changes receivers midway
    pub(crate) fn set_focus(&mut self, target: Option<SessionId>) {
        if self.focus.keys_held() && !self.focus.global_sequence {
            self.focus.next_focused = target;
        } else {
            self.commit_focus(target);
        }
    }

    /// The last key went up: commit any pending focus change and fall back
    /// to routing by focus
    fn end_sequence(&mut self) {
        if self.focus.global_sequence {
            self.focus.global_sequence = false;
            // A global sequence may have changed anything on screen
            self.stack.mark_all_damaged();
        }
        if let Some(transient) = self.focus.transient.take() {
            if self.focus.next_focused != Some(transient) {
                self.sessions
                    .deliver(transient, Event::Focus { gained: false });
                if self.focus.next_focused.is_none() {
                    if let Some(focused) = self.focus.focused {
                        self.sessions.deliver(focused, Event::Focus { gained: true });
                    }
                }
            }
        }
        if let Some(next) = self.focus.next_focused.take() {
            self.commit_focus(Some(next));
        }
        self.receiver = self.focus.focused.map(|f| self.sessions.resolve_forward(f));
        self.update_pointed();
    }

    pub(crate) fn commit_focus(&mut self, target: Option<SessionId>) {
        if target == self.focus.focused {
            return;
        }
        if let Some(old) = self.focus.focused {
            self.sessions.deliver(old, Event::Focus { gained: false });
            self.damage_session_views(old);
        }
        self.focus.focused = target;
        if let Some(new) = target {
            self.sessions.deliver(new, Event::Focus { gained: true });
            self.damage_session_views(new);
        }
        self.report_focus();
    }

    /// Recompute the pointed-at session, synthesizing a leave event toward
    /// the previous one
    pub(crate) fn update_pointed(&mut self) {
        let pointed = self
            .stack
            .view_at(&self.arena, &self.sessions, self.pointer, self.pointer)
            .and_then(|v| self.arena.get(v))
            .map(|v| v.owner);
        if pointed == self.pointed {
            return;
        }
        if let Some(old) = self.pointed {
            if self.hover_eligible(old) {
                self.sessions.deliver(old, Event::Leave);
            }
        }
        self.pointed = pointed;
        self.report_hover();
    }

    /// Whether a session observes pointer motion right now
    fn hover_eligible(&self, session: SessionId) -> bool {
        let Some(domain) = self.sessions.domain(session) else {
            return false;
        };
        match domain.hover {
            HoverMode::Always => true,
            HoverMode::Focused => {
                self.focus.is_focused(session)
                    || self
                        .focus
                        .focused
                        .map(|f| self.sessions.same_domain(f, session))
                        .unwrap_or(false)
            }
        }
    }
}
