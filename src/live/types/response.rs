use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::live::catalog;
use crate::ws::WsError;

/// Top-level inbound message envelope.
///
/// Every frame received from the live connection is deserialized into this
/// struct; the payload stays untyped until a consumer asks for a typed view.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Builder)]
pub struct LiveMessage {
    /// Wire event name (e.g. `debate:result`, `checkin:count`)
    pub event: String,
    /// Event-specific data object
    #[serde(default)]
    pub data: Value,
}

impl LiveMessage {
    /// Try to extract the payload as a debate result.
    #[must_use]
    pub fn as_debate_result(&self) -> Option<DebateResult> {
        if self.event == catalog::DEBATE_RESULT {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as an event-wide check-in count.
    #[must_use]
    pub fn as_checkin_count(&self) -> Option<CheckinCount> {
        if self.event == catalog::CHECKIN_COUNT {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as a per-debater check-in update.
    #[must_use]
    pub fn as_checkin_update(&self) -> Option<CheckinUpdate> {
        if self.event == catalog::CHECKIN_UPDATE {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as a round status change.
    #[must_use]
    pub fn as_round_status(&self) -> Option<RoundStatusChange> {
        if self.event == catalog::ROUND_STATUS {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as a pairings-generated notification.
    #[must_use]
    pub fn as_pairings_generated(&self) -> Option<PairingsGenerated> {
        if self.event == catalog::PAIRINGS_GENERATED {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as a room-allocation notification.
    #[must_use]
    pub fn as_rooms_allocated(&self) -> Option<RoomsAllocated> {
        if self.event == catalog::ROOMS_ALLOCATED {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as a leaderboard update.
    #[must_use]
    pub fn as_leaderboard_update(&self) -> Option<LeaderboardUpdate> {
        if self.event == catalog::LEADERBOARD_UPDATE {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    /// Try to extract the payload as an enrollment update.
    #[must_use]
    pub fn as_enrollment_update(&self) -> Option<EnrollmentUpdate> {
        if self.event == catalog::EVENT_ENROLLMENT {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }
}

/// Parse one text frame into envelope messages.
///
/// The server sends either a single envelope object or an array of them.
pub fn parse_messages(bytes: &[u8]) -> Result<Vec<LiveMessage>> {
    let value: Value = serde_json::from_slice(bytes).map_err(WsError::MessageParse)?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(WsError::MessageParse)
                    .map_err(Into::into)
            })
            .collect(),
        single => Ok(vec![
            serde_json::from_value(single).map_err(WsError::MessageParse)?,
        ]),
    }
}

/// Final state of a debate once a result has been recorded.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebateStatus {
    /// Pairing exists but the debate has not started
    Pending,
    /// Debate is underway
    InProgress,
    /// Result recorded
    Completed,
}

/// Lifecycle states of a round.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// Round created, check-in open
    Pending,
    /// Debates in progress
    Ongoing,
    /// All results recorded
    Completed,
}

/// `debate:result` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct DebateResult {
    /// Debate this result belongs to
    pub debate_id: String,
    /// Winning debater
    pub winner_id: String,
    /// Score of the first debater in the pairing
    pub debater1_score: f64,
    /// Score of the second debater in the pairing
    pub debater2_score: f64,
}

/// `checkin:count` payload (event scope).
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct CheckinCount {
    /// Event the count belongs to
    pub event_id: String,
    /// Number of debaters currently checked in
    pub checked_in: u32,
    /// Number of enrolled debaters
    pub total: u32,
}

/// `checkin:update` payload (round scope).
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct CheckinUpdate {
    /// Round the check-in belongs to
    pub round_id: String,
    /// Debater whose check-in state changed
    pub debater_id: String,
    /// New check-in state
    pub checked_in: bool,
}

/// `round:status` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatusChange {
    /// Round whose status changed
    pub round_id: String,
    /// New status
    pub status: RoundStatus,
    /// When the transition happened, if the server reports it
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `pairings:generated` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct PairingsGenerated {
    /// Round the pairings belong to
    pub round_id: String,
    /// Backend-defined pairing list, passed through untyped
    #[serde(default)]
    pub pairings: Value,
}

/// `rooms:allocated` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct RoomsAllocated {
    /// Round the allocations belong to
    pub round_id: String,
    /// Backend-defined debate-to-room assignments, passed through untyped
    #[serde(default)]
    pub allocations: Value,
}

/// `leaderboard:update` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUpdate {
    /// Event the standings belong to
    pub event_id: String,
    /// Backend-defined standings, passed through untyped
    #[serde(default)]
    pub standings: Value,
}

/// `event:enrollment` payload.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentUpdate {
    /// Event the enrollment change belongs to
    pub event_id: String,
    /// Debater whose enrollment changed
    pub user_id: String,
    /// Whether the debater is now enrolled
    pub enrolled: bool,
}
