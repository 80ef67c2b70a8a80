//! Focus state.
//!
//! Owned by the input router and passed by reference into drawing and label
//! placement, which need to know whether a view's owner holds the focus.

use crate::session::SessionId;

/// Current focus plus the drag/global-sequence mode flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Focus {
    /// Session designated to receive keyboard and non-hover pointer input
    pub focused: Option<SessionId>,
    /// Deferred focus target, committed when the last key is released
    pub next_focused: Option<SessionId>,
    /// Session routed to for the current sequence only, focus unchanged
    pub transient: Option<SessionId>,
    /// Number of currently pressed keys and buttons
    pub key_count: u32,
    /// A global-key binding captured the current press sequence
    pub global_sequence: bool,
}

impl Focus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `session` holds the focus
    #[inline]
    pub fn is_focused(&self, session: SessionId) -> bool {
        self.focused == Some(session)
    }

    /// Whether a press/release sequence is in progress
    #[inline]
    pub fn keys_held(&self) -> bool {
        self.key_count > 0
    }

    /// Drop every reference to a destroyed session
    pub fn forget_session(&mut self, session: SessionId) {
        if self.focused == Some(session) {
            self.focused = None;
        }
        if self.next_focused == Some(session) {
            self.next_focused = None;
        }
        if self.transient == Some(session) {
            self.transient = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forget_session() {
        let mut focus = Focus {
            focused: Some(3),
            next_focused: Some(3),
            transient: Some(3),
            key_count: 1,
            global_sequence: false,
        };
        focus.forget_session(3);
        assert_eq!(focus.focused, None);
        assert_eq!(focus.next_focused, None);
        assert_eq!(focus.transient, None);
        // Mode flags are untouched
        assert_eq!(focus.key_count, 1);
    }

    #[test]
    fn test_forget_other_session_is_noop() {
        let mut focus = Focus {
            focused: Some(3),
            ..Focus::new()
        };
        focus.forget_session(4);
        assert_eq!(focus.focused, Some(3));
    }
}
