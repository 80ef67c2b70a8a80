//! Sessions and the session manager.
//!
//! A session is one client's endpoint: it owns views, at most one texture,
//! a command queue, and an event inbox, all accounted against its quota.
//! Sessions resolve their domain policy by name and re-resolve on every
//! configuration reload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, QuotaAccount};
use crate::command::Command;
use crate::domain::DomainEntry;
use crate::error::SessionError;
use crate::input::Event;
use crate::view::ViewId;

/// Stable session identifier
pub type SessionId = u64;

/// Per-session view handle, local to the issuing session's handle space
pub type ViewHandle = u32;

/// Opaque token referring to a view across session boundaries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCapability(pub(crate) ViewId);

/// Opaque token referring to a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCapability(pub(crate) SessionId);

/// Operations addressable by label through `session_control`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOp {
    Hide,
    Show,
    ToFront,
}

/// Bytes charged per allocated view handle slot
pub const HANDLE_SLOT_BYTES: u64 = 16;

/// One client endpoint
#[derive(Clone, Debug)]
pub struct Session {
    pub label: String,
    /// Resolved policy; `None` leaves the session inert (no draw, no focus)
    pub domain: Option<DomainEntry>,
    pub texture: Option<Buffer>,
    pub visible: bool,
    pub background_view: Option<ViewId>,
    /// Views owned by this session, in creation order
    pub views: Vec<ViewId>,
    pub quota: QuotaAccount,
    /// Input delegation target set by the session's focus call
    pub forward_focus: Option<SessionId>,
    pub(crate) handles: HashMap<ViewHandle, ViewId>,
    next_handle: ViewHandle,
    pub(crate) commands: Vec<Command>,
    pub(crate) inbox: Vec<Event>,
    pub(crate) defunct: bool,
}

impl Session {
    fn new(label: &str, quota_limit: u64) -> Self {
        Self {
            label: label.to_string(),
            domain: None,
            texture: None,
            visible: true,
            background_view: None,
            views: Vec::new(),
            quota: QuotaAccount::new(quota_limit),
            forward_focus: None,
            handles: HashMap::new(),
            next_handle: 1,
            commands: Vec::new(),
            inbox: Vec::new(),
            defunct: false,
        }
    }

    /// Domain name this session resolves against: the first token of its
    /// label
    pub fn domain_name(&self) -> &str {
        self.label.split_whitespace().next().unwrap_or("")
    }

    /// Whether the session's texture carries an alpha plane
    pub fn has_alpha(&self) -> bool {
        self.texture.as_ref().is_some_and(|t| t.uses_alpha())
    }

    /// Allocate a handle slot for a view, charged against the quota
    pub fn alloc_handle(&mut self, view: ViewId) -> Result<ViewHandle, SessionError> {
        self.quota.charge(HANDLE_SLOT_BYTES)?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, view);
        Ok(handle)
    }

    /// Resolve a handle to a view id
    pub fn resolve_handle(&self, handle: ViewHandle) -> Option<ViewId> {
        self.handles.get(&handle).copied()
    }

    /// Release a handle slot, refunding its quota charge
    pub fn release_handle(&mut self, handle: ViewHandle) {
        if self.handles.remove(&handle).is_some() {
            self.quota.release(HANDLE_SLOT_BYTES);
        }
    }
}

/// Arena of all sessions
#[derive(Clone, Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    next_id: SessionId,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn create(&mut self, label: &str, quota_limit: u64) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, Session::new(label, quota_limit));
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &Session)> {
        self.sessions.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Find a live session by exact label
    pub fn lookup_label(&self, label: &str) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|(_, s)| !s.defunct && s.label == label)
            .map(|(id, _)| *id)
    }

    /// Resolved domain entry of a session, if any
    pub fn domain(&self, id: SessionId) -> Option<&DomainEntry> {
        self.sessions.get(&id).and_then(|s| s.domain.as_ref())
    }

    /// Whether two sessions share the same domain
    pub fn same_domain(&self, a: SessionId, b: SessionId) -> bool {
        match (self.domain(a), self.domain(b)) {
            (Some(da), Some(db)) => da.name == db.name,
            _ => false,
        }
    }

    /// Append an event to a session's inbox; defunct sessions receive
    /// nothing
    pub fn deliver(&mut self, id: SessionId, event: Event) {
        if let Some(session) = self.sessions.get_mut(&id) {
            if !session.defunct {
                session.inbox.push(event);
            }
        }
    }

    /// Follow a session's focus-forwarding chain to its end.
    ///
    /// The chain is raced with a fast and a slow cursor; if they meet, the
    /// configuration describes a cycle and forwarding is ignored.
    pub fn resolve_forward(&self, start: SessionId) -> SessionId {
        let step = |id: SessionId| self.sessions.get(&id).and_then(|s| s.forward_focus);

        let mut slow = start;
        let mut fast = start;
        loop {
            fast = match step(fast) {
                Some(next) => next,
                None => return fast,
            };
            fast = match step(fast) {
                Some(next) => next,
                None => return fast,
            };
            slow = step(slow).unwrap_or(slow);
            if slow == fast {
                log::error!(
                    "focus forwarding cycle involving session {slow}, forwarding ignored"
                );
                return start;
            }
        }
    }
}
