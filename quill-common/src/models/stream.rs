// File: quill-common/src/models/stream.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user as referenced by stream events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub screen_name: String,
}

/// Minimal stored shape of a status. Full ingestion lives in the
/// refresh pipeline, not in the streaming layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub user: User,
    /// Ordering key assigned at ingestion time.
    pub sort_id: i64,
    pub text: String,
    pub location: Option<String>,
}

/// Deletion notice for a status or direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionEvent {
    pub id: String,
    pub user_id: Option<String>,
}

/// Kinds of list mutations the stream reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Created,
    Deleted,
    Updated,
    MemberAdded,
    MemberRemoved,
    Subscribed,
    Unsubscribed,
}

/// Everything the streaming transport can deliver, collapsed into one
/// tagged union. Kinds the router does not act on fall through to a
/// log-only branch.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connected,
    Status(Box<Status>),
    StatusDeleted(DeletionEvent),
    DirectMessageDeleted(DeletionEvent),
    ScrubGeo {
        user_id: String,
        up_to_sort_id: i64,
    },
    Blocked {
        source: User,
        target: User,
    },
    Unblocked {
        source: User,
        target: User,
    },
    Followed {
        source: User,
        target: User,
    },
    Favorited {
        source: User,
        target: User,
        status: Box<Status>,
    },
    Unfavorited {
        source: User,
        target: User,
        status: Box<Status>,
    },
    ListChanged {
        owner: User,
        list_name: String,
        change: ListChange,
    },
    ProfileUpdated {
        user: User,
    },
    FriendList(Vec<String>),
    TrackLimitation {
        limited_statuses: u32,
    },
    StallWarning {
        message: String,
    },
}

/// Lifecycle of one streaming session. A session that does not exist
/// yet has no state; a `Stopped` session is never retried on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Disconnecting,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Disconnecting => write!(f, "disconnecting"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}
