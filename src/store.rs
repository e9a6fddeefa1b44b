//! In-memory issue store.
//!
//! Exclusive owner of the issue collection and the id sequence. One mutex
//! covers the whole collection; every operation, reads included, runs its
//! full read-modify-write inside it so no partially written record is ever
//! observable. No I/O happens under the lock.

use std::collections::BTreeMap;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::directory;
use crate::policy::{self, PolicyError};
use crate::types::{
    CreateIssueRequest, Issue, IssueDetail, IssueStatus, ParseStatusError, UpdateIssueRequest,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("required field title is missing")]
    EmptyTitle,
    #[error("unknown userId {0}")]
    UnknownUser(u64),
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),
    #[error("issue {0} not found")]
    NotFound(u64),
    #[error("completed or cancelled issues cannot be updated")]
    TerminalIssue(u64),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

pub struct IssueStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    // BTreeMap keeps listing in ascending-id (= insertion) order.
    issues: BTreeMap<u64, Issue>,
    next_id: u64,
}

impl IssueStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                issues: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Create a new issue. The id sequence only advances once every
    /// validation step has passed.
    pub async fn create(&self, request: CreateIssueRequest) -> Result<Issue, StoreError> {
        if request.title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let assignee = match request.assignee_id {
            Some(id) => Some(directory::lookup(id).ok_or(StoreError::UnknownUser(id))?),
            None => None,
        };

        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        let issue = Issue {
            id,
            title: request.title,
            description: request.description.unwrap_or_default(),
            status: policy::initial_status(assignee),
            assignee,
            created_at: now,
            updated_at: now,
        };
        inner.issues.insert(id, issue.clone());
        inner.next_id += 1;
        drop(inner);

        info!(issue_id = id, status = %issue.status, "issue created");
        Ok(issue)
    }

    /// List issues, optionally narrowed to one status. An empty filter means
    /// no filter; an unrecognized one is a validation error.
    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Issue>, StoreError> {
        let filter = match filter {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<IssueStatus>()?),
        };

        let inner = self.inner.lock().await;
        Ok(inner
            .issues
            .values()
            .filter(|issue| filter.is_none_or(|wanted| issue.status == wanted))
            .cloned()
            .collect())
    }

    /// Fetch the detail projection of one issue (assignee excluded).
    pub async fn get(&self, id: u64) -> Result<IssueDetail, StoreError> {
        let inner = self.inner.lock().await;
        let issue = inner.issues.get(&id).ok_or(StoreError::NotFound(id))?;
        Ok(IssueDetail::from(issue))
    }

    /// Apply an update under the transition policy.
    ///
    /// The terminal-state guard runs before anything else about the payload
    /// is looked at. All validation resolves into locals first; the stored
    /// record is only written once nothing can fail anymore.
    pub async fn update(&self, id: u64, request: UpdateIssueRequest) -> Result<Issue, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let issue = inner.issues.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if issue.status.is_terminal() {
            return Err(StoreError::TerminalIssue(id));
        }

        let resolution = policy::resolve_update(
            issue.assignee,
            issue.status,
            request.assignee,
            request.status.as_deref(),
        )?;

        issue.assignee = resolution.assignee;
        issue.status = resolution.status;
        if let Some(title) = request.title {
            issue.title = title;
        }
        if let Some(description) = request.description {
            issue.description = description;
        }
        issue.updated_at = now;
        let updated = issue.clone();
        drop(inner);

        info!(issue_id = id, status = %updated.status, "issue updated");
        Ok(updated)
    }
}

impl Default for IssueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssigneeChange;

    fn create_request(title: &str, assignee_id: Option<u64>) -> CreateIssueRequest {
        CreateIssueRequest {
            title: title.to_string(),
            description: None,
            assignee_id,
        }
    }

    #[tokio::test]
    async fn create_without_assignee_starts_pending() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();
        assert_eq!(issue.id, 1);
        assert_eq!(issue.status, IssueStatus::Pending);
        assert!(issue.assignee.is_none());
        assert_eq!(issue.description, "");
        assert_eq!(issue.created_at, issue.updated_at);
    }

    #[tokio::test]
    async fn create_with_assignee_starts_in_progress() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", Some(2))).await.unwrap();
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert_eq!(issue.assignee.map(|user| user.id), Some(2));
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let store = IssueStore::new();
        let error = store.create(create_request("", None)).await.unwrap_err();
        assert!(matches!(error, StoreError::EmptyTitle));
    }

    #[tokio::test]
    async fn failed_create_does_not_advance_id_sequence() {
        let store = IssueStore::new();
        let error = store
            .create(create_request("bug", Some(99)))
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::UnknownUser(99)));

        let issue = store.create(create_request("bug", None)).await.unwrap();
        assert_eq!(issue.id, 1);
    }

    #[tokio::test]
    async fn ids_are_strictly_increasing() {
        let store = IssueStore::new();
        let first = store.create(create_request("one", None)).await.unwrap();
        let second = store.create(create_request("two", None)).await.unwrap();
        let third = store.create(create_request("three", None)).await.unwrap();
        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
    }

    #[tokio::test]
    async fn update_rejects_terminal_issues() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();
        store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("CANCELLED".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let error = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::TerminalIssue(_)));
    }

    #[tokio::test]
    async fn terminal_guard_runs_before_payload_validation() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", Some(1))).await.unwrap();
        store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("COMPLETED".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A garbage status on a terminal issue is still forbidden, not 400.
        let error = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("BOGUS".to_string()),
                    assignee: AssigneeChange::Assign(99),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::TerminalIssue(_)));
    }

    #[tokio::test]
    async fn clear_assignee_forces_pending_and_ignores_requested_status() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", Some(1))).await.unwrap();

        let updated = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("COMPLETED".to_string()),
                    assignee: AssigneeChange::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.assignee.is_none());
        assert_eq!(updated.status, IssueStatus::Pending);
    }

    #[tokio::test]
    async fn assigning_pending_issue_auto_advances() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();

        let updated = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    assignee: AssigneeChange::Assign(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.assignee.map(|user| user.id), Some(1));
        assert_eq!(updated.status, IssueStatus::InProgress);
    }

    #[tokio::test]
    async fn unassigned_issue_cannot_move_to_in_progress() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();

        let error = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("IN_PROGRESS".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::Policy(PolicyError::StatusNeedsAssignee(_))
        ));
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();

        // Valid assignment paired with a garbage status must not half-apply.
        let error = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("BOGUS".to_string()),
                    assignee: AssigneeChange::Assign(1),
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::Policy(PolicyError::InvalidStatus(_))
        ));

        let detail = store.get(issue.id).await.unwrap();
        assert_eq!(detail.title, "bug");
        assert_eq!(detail.status, IssueStatus::Pending);
        assert_eq!(detail.updated_at, issue.updated_at);
        let listed = store.list(None).await.unwrap();
        assert!(listed[0].assignee.is_none());
    }

    #[tokio::test]
    async fn update_overwrites_title_and_description_verbatim() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", None)).await.unwrap();

        let updated = store
            .update(
                issue.id,
                UpdateIssueRequest {
                    title: Some(String::new()),
                    description: Some("details".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Title is only validated at creation; updates apply verbatim.
        assert_eq!(updated.title, "");
        assert_eq!(updated.description, "details");
        assert!(updated.updated_at >= issue.created_at);
    }

    #[tokio::test]
    async fn list_filters_and_preserves_insertion_order() {
        let store = IssueStore::new();
        store.create(create_request("one", None)).await.unwrap();
        store.create(create_request("two", Some(1))).await.unwrap();
        store.create(create_request("three", None)).await.unwrap();

        let all = store.list(None).await.unwrap();
        assert_eq!(
            all.iter().map(|issue| issue.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let pending = store.list(Some("PENDING")).await.unwrap();
        assert_eq!(
            pending.iter().map(|issue| issue.id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        // Empty filter means no filter.
        let unfiltered = store.list(Some("")).await.unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn list_rejects_unknown_filter() {
        let store = IssueStore::new();
        let error = store.list(Some("BOGUS")).await.unwrap_err();
        assert!(matches!(error, StoreError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn get_returns_not_found_for_missing_issue() {
        let store = IssueStore::new();
        let error = store.get(42).await.unwrap_err();
        assert!(matches!(error, StoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn unassigned_issues_stay_pending_or_cancelled() {
        let store = IssueStore::new();
        let issue = store.create(create_request("bug", Some(1))).await.unwrap();
        store
            .update(
                issue.id,
                UpdateIssueRequest {
                    assignee: AssigneeChange::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .update(
                issue.id,
                UpdateIssueRequest {
                    status: Some("CANCELLED".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for issue in store.list(None).await.unwrap() {
            if issue.assignee.is_none() {
                assert!(issue.status.allowed_without_assignee());
            }
        }
    }
}
