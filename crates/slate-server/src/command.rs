//! Batched view commands.
//!
//! Sessions queue view manipulations and flush them as a batch; the queue is
//! bounded and enqueueing past the bound is the one command error reported
//! back. Commands referring to stale handles are logged and absorbed so a
//! batch always runs to completion.

use serde::{Deserialize, Serialize};
use slate_core::{Point, Rect};

use crate::error::SessionError;
use crate::server::Server;
use crate::session::{SessionCapability, SessionId, ViewHandle};
use crate::view::{ViewId, ViewKind};

/// Commands a session may hold unflushed
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// One queued view manipulation, addressed by session-local handles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Set a view's geometry relative to its parent
    Geometry { view: ViewHandle, rect: Rect },
    /// Set the texture offset shown at the view's top-left corner
    Offset { view: ViewHandle, offset: Point },
    /// Raise a view, in front of `neighbor` or all the way up
    ToFront {
        view: ViewHandle,
        neighbor: Option<ViewHandle>,
    },
    /// Lower a view, behind `neighbor` or down to the background boundary
    ToBack {
        view: ViewHandle,
        neighbor: Option<ViewHandle>,
    },
    /// Turn a view into the session's background
    Background { view: ViewHandle },
    /// Set the title shown in the view's label
    Title { view: ViewHandle, title: String },
    Nop,
}

impl Server {
    /// Queue a command for later execution
    pub fn enqueue(
        &mut self,
        session: SessionCapability,
        command: Command,
    ) -> Result<(), SessionError> {
        let s = self
            .sessions
            .get_mut(session.0)
            .ok_or(SessionError::UnknownSession)?;
        if s.commands.len() >= COMMAND_QUEUE_CAPACITY {
            return Err(SessionError::CommandQueueFull);
        }
        s.commands.push(command);
        Ok(())
    }

    /// Execute every queued command of a session in order
    pub fn execute(&mut self, session: SessionCapability) -> Result<(), SessionError> {
        let id = session.0;
        let commands = {
            let s = self
                .sessions
                .get_mut(id)
                .ok_or(SessionError::UnknownSession)?;
            std::mem::take(&mut s.commands)
        };
        for command in commands {
            self.execute_command(id, command);
        }
        Ok(())
    }

    /// Resolve a handle against a session, `None` for stale references
    pub(crate) fn resolve(&self, session: SessionId, handle: ViewHandle) -> Option<ViewId> {
        let id = self.sessions.get(session)?.resolve_handle(handle)?;
        let view = self.arena.get(id)?;
        (!view.defunct).then_some(id)
    }

    fn execute_command(&mut self, session: SessionId, command: Command) {
        match command {
            Command::Nop => {}

            Command::Geometry { view, rect } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("geometry for stale handle {view}, dropped");
                    return;
                };
                self.stack
                    .geometry(&mut self.arena, &self.sessions, self.pointer, id, rect);
            }

            Command::Offset { view, offset } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("offset for stale handle {view}, dropped");
                    return;
                };
                self.stack
                    .set_buffer_offset(&mut self.arena, &self.sessions, self.pointer, id, offset);
            }

            Command::ToFront { view, neighbor } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("to_front for stale handle {view}, dropped");
                    return;
                };
                match neighbor.and_then(|n| self.resolve(session, n)) {
                    Some(n) => self.stack.stack(&self.arena, &self.sessions, id, Some(n), false),
                    None => self.stack.stack(&self.arena, &self.sessions, id, None, true),
                }
                self.damage_restacked(id);
            }

            Command::ToBack { view, neighbor } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("to_back for stale handle {view}, dropped");
                    return;
                };
                match neighbor.and_then(|n| self.resolve(session, n)) {
                    Some(n) => self.stack.stack(&self.arena, &self.sessions, id, Some(n), true),
                    None => self.stack.stack(&self.arena, &self.sessions, id, None, false),
                }
                self.damage_restacked(id);
            }

            Command::Background { view } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("background for stale handle {view}, dropped");
                    return;
                };
                if let Some(v) = self.arena.get_mut(id) {
                    v.kind = ViewKind::Background;
                }
                if let Some(s) = self.sessions.get_mut(session) {
                    s.background_view = Some(id);
                }
                self.stack.stack(&self.arena, &self.sessions, id, None, false);
                self.damage_restacked(id);
            }

            Command::Title { view, title } => {
                let Some(id) = self.resolve(session, view) else {
                    log::debug!("title for stale handle {view}, dropped");
                    return;
                };
                self.stack
                    .set_title(&mut self.arena, &self.sessions, self.pointer, id, &title);
            }
        }
    }

    fn damage_restacked(&mut self, id: ViewId) {
        if let Some(outline) =
            self.stack
                .visible_outline(&self.arena, &self.sessions, self.pointer, id)
        {
            self.stack.add_damage(outline);
            self.stack
                .place_labels(&mut self.arena, &self.sessions, self.pointer, outline);
        }
    }
}
