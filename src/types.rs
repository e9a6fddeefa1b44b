//! Issue domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::User;

/// Issue status - fixed four-state lifecycle
///
/// `PENDING` and `IN_PROGRESS` are workable; `COMPLETED` and `CANCELLED` are
/// terminal and freeze the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    /// Created without an assignee, not started
    #[default]
    Pending,
    /// Assigned and being worked
    InProgress,
    /// Finished; immutable from here
    Completed,
    /// Abandoned; immutable from here
    Cancelled,
}

impl IssueStatus {
    /// Get the wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "PENDING",
            IssueStatus::InProgress => "IN_PROGRESS",
            IssueStatus::Completed => "COMPLETED",
            IssueStatus::Cancelled => "CANCELLED",
        }
    }

    /// Check if this status freezes the issue
    pub fn is_terminal(&self) -> bool {
        matches!(self, IssueStatus::Completed | IssueStatus::Cancelled)
    }

    /// Check if this status is valid for an issue with no assignee
    pub fn allowed_without_assignee(&self) -> bool {
        matches!(self, IssueStatus::Pending | IssueStatus::Cancelled)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(IssueStatus::Pending),
            "IN_PROGRESS" => Ok(IssueStatus::InProgress),
            "COMPLETED" => Ok(IssueStatus::Completed),
            "CANCELLED" => Ok(IssueStatus::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid status string
#[derive(Debug, Clone, Error)]
#[error("invalid status '{0}', expected one of: PENDING, IN_PROGRESS, COMPLETED, CANCELLED")]
pub struct ParseStatusError(pub String);

/// A trackable work item, the record stored and served by the issue store.
///
/// The assignee is a borrow into the fixed user directory, never a copy.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<&'static User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detail-view projection of an [`Issue`].
///
/// The detail endpoint deliberately omits the assignee; only the list and
/// mutation responses carry it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetail {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Issue> for IssueDetail {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id,
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Requested change to an issue's assignee.
///
/// The wire format distinguishes an absent `userId` (no change) from the
/// explicit `0` sentinel (remove the assignee); this keeps that tri-state
/// explicit instead of collapsing it into an optional scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssigneeChange {
    /// Field absent: carry the current assignee through
    #[default]
    Keep,
    /// Explicit zero: remove the assignee
    Clear,
    /// Assign the user with this id
    Assign(u64),
}

impl AssigneeChange {
    /// Decode the PATCH wire encoding (`None` absent, `Some(0)` sentinel).
    pub fn from_wire(user_id: Option<u64>) -> Self {
        match user_id {
            None => AssigneeChange::Keep,
            Some(0) => AssigneeChange::Clear,
            Some(id) => AssigneeChange::Assign(id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<u64>,
}

/// Delta applied by the update operation. The status stays a raw string here
/// so the terminal-state guard can run before any payload validation.
#[derive(Clone, Debug, Default)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee: AssigneeChange,
}
