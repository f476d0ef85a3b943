use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

entity_id!(GuardId, "G");
entity_id!(RequestId, "Q");
entity_id!(BindingId, "B");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardStatus {
    Free,
    Committed,
}

impl fmt::Display for GuardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardStatus::Free => f.write_str("free"),
            GuardStatus::Committed => f.write_str("committed"),
        }
    }
}

/// A schedulable unit of capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    pub id: GuardId,
    pub label: String,
    pub status: GuardStatus,
}

impl Guard {
    pub fn is_free(&self) -> bool {
        self.status == GuardStatus::Free
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Assigned,
    Completed,
}

impl RequestState {
    /// pending -> assigned -> completed; nothing leaves completed.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Pending, RequestState::Assigned)
                | (RequestState::Assigned, RequestState::Completed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Pending => f.write_str("pending"),
            RequestState::Assigned => f.write_str("assigned"),
            RequestState::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub client_id: String,
    pub service_time: DateTime<Utc>,
    pub duration_hours: u32,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
}

/// Client submission before the store allocates an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub client_id: String,
    pub service_time: DateTime<Utc>,
    pub duration_hours: u32,
}

/// Immutable audit record of one guard committed to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub request_id: RequestId,
    pub guard_id: GuardId,
    pub created_at: DateTime<Utc>,
}

/// A write unit the store must apply all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Commit `guard_id`, move `request_id` to assigned and record a binding.
    Assign {
        request_id: RequestId,
        guard_id: GuardId,
    },
    /// Move `request_id` to completed, optionally freeing the guard it was bound to.
    Complete {
        request_id: RequestId,
        release: Option<GuardId>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total: usize,
    pub free: usize,
    pub committed: usize,
}
