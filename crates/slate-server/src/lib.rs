//! Slate: a window-server core.
//!
//! Clients are sessions; each owns views in a shared, globally ordered
//! stack, at most one quota-accounted texture, and a queue of batched view
//! commands. A configuration document assigns every session a domain policy
//! governing layering, labeling, hover, and focus behavior. Input routing
//! keys on press/release sequences so drags and chords never split across
//! sessions, and output is composited with a recursive clip-cut pass driven
//! by accumulated damage.

pub mod buffer;
pub mod canvas;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod focus;
pub mod input;
pub mod report;
pub mod server;
pub mod session;
pub mod stack;
pub mod view;

pub use buffer::{Buffer, Mode, PixelFormat, QuotaAccount};
pub use canvas::{Canvas, Color, PixelCanvas};
pub use command::{Command, COMMAND_QUEUE_CAPACITY};
pub use config::{Config, DomainConfig, GlobalKeyConfig, ReportToggles};
pub use domain::{ContentMode, DomainEntry, DomainRegistry, FocusMode, HoverMode, Origin};
pub use error::SessionError;
pub use input::{Event, Keycode, BTN_LEFT, BTN_MIDDLE, BTN_RIGHT};
pub use report::{MemoryReporter, NullReporter, Report, Reporter};
pub use server::Server;
pub use session::{SessionCapability, SessionId, SessionOp, ViewCapability, ViewHandle};
pub use stack::{DrawCtx, ViewStack};
pub use view::{View, ViewArena, ViewId, ViewKind};
