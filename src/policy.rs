//! Transition policy: the pure decision procedure behind create and update.
//!
//! Given the current `(assignee, status)` pair and the requested changes, it
//! computes the resulting pair or rejects the request. Precedence is fixed:
//! an explicit clear of the assignee wins outright, then assignment (with its
//! PENDING -> IN_PROGRESS auto-advance), then an explicitly requested status.

use thiserror::Error;

use crate::directory::{self, User};
use crate::types::{AssigneeChange, IssueStatus, ParseStatusError};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown userId {0}")]
    UnknownUser(u64),
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),
    #[error("issues without an assignee can only be PENDING or CANCELLED, not {0}")]
    StatusNeedsAssignee(IssueStatus),
}

/// Resolved outcome of an update against one issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub assignee: Option<&'static User>,
    pub status: IssueStatus,
}

/// Initial status derivation for the create operation.
pub fn initial_status(assignee: Option<&User>) -> IssueStatus {
    if assignee.is_some() {
        IssueStatus::InProgress
    } else {
        IssueStatus::Pending
    }
}

/// Compute the `(assignee, status)` pair an update resolves to.
///
/// Clearing the assignee forces PENDING and consumes a simultaneously
/// requested status: it is neither applied nor validated. Assigning a user to
/// a PENDING issue auto-advances it to IN_PROGRESS only when no status was
/// requested in the same call.
pub fn resolve_update(
    current_assignee: Option<&'static User>,
    current_status: IssueStatus,
    change: AssigneeChange,
    requested_status: Option<&str>,
) -> Result<Resolution, PolicyError> {
    if change == AssigneeChange::Clear {
        return Ok(Resolution {
            assignee: None,
            status: IssueStatus::Pending,
        });
    }

    let assignee = match change {
        AssigneeChange::Assign(id) => {
            Some(directory::lookup(id).ok_or(PolicyError::UnknownUser(id))?)
        }
        _ => current_assignee,
    };

    let mut status = current_status;
    if matches!(change, AssigneeChange::Assign(_))
        && current_status == IssueStatus::Pending
        && requested_status.is_none()
    {
        status = IssueStatus::InProgress;
    }

    if let Some(raw) = requested_status {
        let requested: IssueStatus = raw.parse()?;
        if assignee.is_none() && !requested.allowed_without_assignee() {
            return Err(PolicyError::StatusNeedsAssignee(requested));
        }
        status = requested;
    }

    Ok(Resolution { assignee, status })
}
