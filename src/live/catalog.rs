//! Wire-event vocabulary.
//!
//! The string names here are part of the external contract with the backend
//! and must match it verbatim. The per-scope catalogs drive the binding
//! layer: a binding session subscribes to every name in its scope's catalog,
//! so adding an event to a catalog is the single change needed to surface it
//! to consumers.

// Outbound (client -> server)
pub const JOIN_EVENT: &str = "join:event";
pub const LEAVE_EVENT: &str = "leave:event";
pub const JOIN_ROUND: &str = "join:round";
pub const LEAVE_ROUND: &str = "leave:round";

// Inbound (server -> client)
pub const CHECKIN_COUNT: &str = "checkin:count";
pub const CHECKIN_UPDATE: &str = "checkin:update";
pub const ROUND_CREATED: &str = "round:created";
pub const ROUND_STATUS: &str = "round:status";
pub const ROUND_UPDATED: &str = "round:updated";
pub const ROUND_DELETED: &str = "round:deleted";
pub const ROUND_PAIRINGS_PUBLISHED: &str = "round:pairingsPublished";
pub const PAIRINGS_GENERATED: &str = "pairings:generated";
pub const ROOMS_ALLOCATED: &str = "rooms:allocated";
pub const DEBATE_CREATED: &str = "debate:created";
pub const DEBATE_UPDATED: &str = "debate:updated";
pub const DEBATE_DELETED: &str = "debate:deleted";
pub const DEBATE_RESULT: &str = "debate:result";
pub const LEADERBOARD_UPDATE: &str = "leaderboard:update";
pub const EVENT_ENROLLMENT: &str = "event:enrollment";
pub const EVENT_CREATED: &str = "event:created";
pub const EVENT_UPDATED: &str = "event:updated";
pub const EVENT_DELETED: &str = "event:deleted";
pub const USER_CREATED: &str = "user:created";
pub const USER_UPDATED: &str = "user:updated";
pub const USER_DELETED: &str = "user:deleted";

/// Events delivered to an `event`-scoped room binding.
pub const EVENT_ROOM_CATALOG: &[&str] = &[
    CHECKIN_COUNT,
    ROUND_CREATED,
    ROUND_STATUS,
    ROUND_UPDATED,
    ROUND_DELETED,
    ROUND_PAIRINGS_PUBLISHED,
    PAIRINGS_GENERATED,
    ROOMS_ALLOCATED,
    DEBATE_CREATED,
    DEBATE_UPDATED,
    DEBATE_DELETED,
    DEBATE_RESULT,
    LEADERBOARD_UPDATE,
    EVENT_ENROLLMENT,
    EVENT_CREATED,
    EVENT_UPDATED,
    EVENT_DELETED,
    USER_CREATED,
    USER_UPDATED,
    USER_DELETED,
];

/// Events delivered to a `round`-scoped room binding.
pub const ROUND_ROOM_CATALOG: &[&str] = &[
    CHECKIN_UPDATE,
    ROUND_STATUS,
    ROUND_UPDATED,
    ROUND_DELETED,
    ROUND_PAIRINGS_PUBLISHED,
    PAIRINGS_GENERATED,
    ROOMS_ALLOCATED,
    DEBATE_CREATED,
    DEBATE_UPDATED,
    DEBATE_DELETED,
    DEBATE_RESULT,
];
