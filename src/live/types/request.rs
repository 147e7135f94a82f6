use serde::Serialize;

use crate::live::rooms::RoomScope;

/// Outbound room membership announcement.
///
/// Serializes to the wire envelope `{"event": "join:event", "data": "<id>"}`
/// and its `leave`/`round` variants.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
pub struct RoomRequest {
    /// Wire event name (`join:event`, `leave:round`, ...)
    pub event: &'static str,
    /// Room identifier
    pub data: String,
}

impl RoomRequest {
    /// Create a join announcement for the given room.
    #[must_use]
    pub fn join(scope: RoomScope, id: &str) -> Self {
        Self {
            event: scope.join_wire(),
            data: id.to_owned(),
        }
    }

    /// Create a leave announcement for the given room.
    #[must_use]
    pub fn leave(scope: RoomScope, id: &str) -> Self {
        Self {
            event: scope.leave_wire(),
            data: id.to_owned(),
        }
    }
}
