//! Real-time layer for the tournament platform.
//!
//! Everything rides on a single shared WebSocket connection that opens
//! lazily on first use. On top of it sit three pieces of application state
//! that outlive any individual socket:
//!
//! * [`RoomRegistry`](rooms::RoomRegistry) tracks which broadcast rooms are
//!   joined and re-announces them after a reconnect
//! * [`ListenerRegistry`](listeners::ListenerRegistry) fans inbound messages
//!   out to named-event callbacks
//! * [`BindingSession`](binding::BindingSession) ties one room id to a set
//!   of handlers for the lifetime of a view
//!
//! [`Client`](client::Client) composes all of the above behind one cheap
//! cloneable handle.

pub mod binding;
pub mod catalog;
pub mod client;
pub mod listeners;
pub mod rooms;
pub mod types;

pub use binding::{BindingSession, RoomHandlers};
pub use client::Client;
pub use listeners::ListenerHandle;
pub use rooms::{Room, RoomScope};
pub use types::response::LiveMessage;

use crate::ws::ConnectionManager;
use crate::ws::traits::MessageParser;

/// Parses the `{"event": ..., "data": ...}` envelope, single or batched.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeParser;

impl MessageParser<LiveMessage> for EnvelopeParser {
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<LiveMessage>> {
        types::response::parse_messages(bytes)
    }
}

/// The one connection type the whole live layer runs over.
pub(crate) type LiveConnection = ConnectionManager<LiveMessage, EnvelopeParser>;
