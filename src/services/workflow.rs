// src/services/workflow.rs
//
// Requisition state machine. Pure: the service loads and locks the row,
// asks this module what to do, then persists the result.

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        notification::{NewNotification, Recipient, APPROVER_ROLE, SOURCE_REQUISITION},
        requisition::{Requisition, RequisitionStatus},
    },
    services::access::{Caller, Capability},
};

use RequisitionStatus::*;

/// Who is allowed to fire a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Requester,
    Reviewer,
}

pub fn actor_for(from: RequisitionStatus, to: RequisitionStatus) -> Option<Actor> {
    match (from, to) {
        (Draft, Submitted) => Some(Actor::Requester),
        (Submitted, UnderReview) => Some(Actor::Reviewer),
        (Submitted, Cancelled) => Some(Actor::Requester),
        (UnderReview, Approved) => Some(Actor::Reviewer),
        (UnderReview, Rejected) => Some(Actor::Reviewer),
        (Approved, Completed) => Some(Actor::Reviewer),
        _ => None,
    }
}

pub fn is_terminal(status: RequisitionStatus) -> bool {
    matches!(status, Rejected | Cancelled | Completed)
}

/// Header fields and line items only change while in draft.
pub fn ensure_editable(status: RequisitionStatus) -> Result<(), AppError> {
    if status == Draft {
        Ok(())
    } else {
        Err(AppError::RequisitionLocked(status))
    }
}

/// Validates a transition request against the table, the actor and the preconditions.
pub fn authorize(
    caller: &Caller,
    requisition: &Requisition,
    to: RequisitionStatus,
    item_count: usize,
    comment: Option<&str>,
) -> Result<Actor, AppError> {
    let from = requisition.status;
    if is_terminal(from) {
        return Err(AppError::RequisitionLocked(from));
    }
    let actor = actor_for(from, to).ok_or(AppError::IllegalTransition { from, to })?;

    match actor {
        Actor::Requester => {
            caller.require(Capability::Request)?;
            if !caller.is_owner_or_global(requisition.requested_by) {
                return Err(AppError::Forbidden(format!(
                    "move a requisition you did not create to {to}"
                )));
            }
        }
        Actor::Reviewer => caller.require(Capability::Review)?,
    }

    if to == Submitted && item_count == 0 {
        return Err(AppError::InvalidInput(
            "a requisition needs at least one item before it is submitted".into(),
        ));
    }
    if to == Rejected && comment.map(str::trim).unwrap_or_default().is_empty() {
        return Err(AppError::InvalidInput("a rejection needs a reason".into()));
    }

    Ok(actor)
}

/// Returns the requisition as it looks after entering `to`.
pub fn apply(
    requisition: &Requisition,
    to: RequisitionStatus,
    caller: &Caller,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Requisition {
    let mut next = requisition.clone();
    let comment = comment.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);

    next.status = to;
    next.updated_at = now;

    match to {
        Submitted => next.submitted_at = Some(now),
        UnderReview => {
            next.reviewed_by = Some(caller.user_id);
            next.reviewed_at = Some(now);
        }
        Approved => {
            next.reviewed_by = Some(caller.user_id);
            next.approved_at = Some(now);
            if comment.is_some() {
                next.approval_notes = comment;
            }
        }
        Rejected => {
            next.reviewed_by = Some(caller.user_id);
            next.rejected_at = Some(now);
            next.rejection_reason = comment;
        }
        Cancelled => next.cancelled_at = Some(now),
        Completed => next.completed_at = Some(now),
        Draft => {}
    }
    next
}

/// The notification written alongside a status change, if any.
pub fn notification_for(requisition: &Requisition) -> Option<NewNotification> {
    let number = &requisition.requisition_number;
    let requester = Recipient::User(requisition.requested_by);

    let (recipient, title, message) = match requisition.status {
        Submitted => (
            Recipient::Role(APPROVER_ROLE),
            format!("Requisition {number} awaits review"),
            format!("\"{}\" was submitted for approval.", requisition.title),
        ),
        UnderReview => (
            requester,
            format!("Requisition {number} is under review"),
            format!("\"{}\" is being reviewed.", requisition.title),
        ),
        Approved => (
            requester,
            format!("Requisition {number} approved"),
            format!("\"{}\" was approved.", requisition.title),
        ),
        Rejected => (
            requester,
            format!("Requisition {number} rejected"),
            format!(
                "\"{}\" was rejected: {}",
                requisition.title,
                requisition.rejection_reason.as_deref().unwrap_or_default()
            ),
        ),
        Completed => (
            requester,
            format!("Requisition {number} completed"),
            format!("\"{}\" was completed.", requisition.title),
        ),
        Draft | Cancelled => return None,
    };

    Some(NewNotification {
        unit_id: requisition.unit_id,
        recipient,
        title,
        message,
        source_type: SOURCE_REQUISITION,
        source_id: requisition.id,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{auth::Role, requisition::Priority};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    pub(crate) fn draft(unit_id: Uuid, requested_by: Uuid) -> Requisition {
        let now = Utc::now();
        Requisition {
            id: Uuid::new_v4(),
            requisition_number: "REQ-2025-000001".into(),
            unit_id,
            requested_by,
            title: "Linen restock".into(),
            description: None,
            department: Some("Housekeeping".into()),
            priority: Priority::Medium,
            status: Draft,
            required_date: now.date_naive(),
            total_estimated_amount: Decimal::ZERO,
            currency: "USD".into(),
            approval_notes: None,
            reviewed_by: None,
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn every_pair_outside_the_table_is_illegal() {
        let legal = [
            (Draft, Submitted),
            (Submitted, UnderReview),
            (Submitted, Cancelled),
            (UnderReview, Approved),
            (UnderReview, Rejected),
            (Approved, Completed),
        ];
        for from in RequisitionStatus::ALL {
            for to in RequisitionStatus::ALL {
                assert_eq!(actor_for(from, to).is_some(), legal.contains(&(from, to)), "{from} -> {to}");
            }
        }
        for terminal in [Rejected, Cancelled, Completed] {
            assert!(is_terminal(terminal));
            assert!(RequisitionStatus::ALL.iter().all(|to| actor_for(terminal, *to).is_none()));
        }
    }

    #[test]
    fn draft_to_approved_is_a_conflict() {
        let unit = Uuid::new_v4();
        let manager = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let req = draft(unit, manager.user_id);

        let err = authorize(&manager, &req, Approved, 1, None).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { from: Draft, to: Approved }));
        assert_eq!(err.to_string(), "illegal requisition transition from draft to approved");
    }

    #[test]
    fn closed_requisitions_report_their_final_status() {
        let unit = Uuid::new_v4();
        let manager = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let mut req = draft(unit, manager.user_id);
        req.status = Cancelled;

        let err = authorize(&manager, &req, Submitted, 1, None).unwrap_err();
        assert!(matches!(err, AppError::RequisitionLocked(Cancelled)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn happy_path_notifies_the_right_people() {
        let unit = Uuid::new_v4();
        let requester = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let reviewer = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let now = Utc::now();

        let req = draft(unit, requester.user_id);
        assert_eq!(authorize(&requester, &req, Submitted, 2, None).unwrap(), Actor::Requester);
        let req = apply(&req, Submitted, &requester, None, now);
        let n = notification_for(&req).unwrap();
        assert_eq!(n.recipient, Recipient::Role(APPROVER_ROLE));
        assert_eq!(n.unit_id, unit);
        assert!(req.submitted_at.is_some());

        assert_eq!(authorize(&reviewer, &req, UnderReview, 2, None).unwrap(), Actor::Reviewer);
        let req = apply(&req, UnderReview, &reviewer, None, now);
        assert_eq!(notification_for(&req).unwrap().recipient, Recipient::User(requester.user_id));
        assert_eq!(req.reviewed_by, Some(reviewer.user_id));

        authorize(&reviewer, &req, Approved, 2, Some("ok")).unwrap();
        let req = apply(&req, Approved, &reviewer, Some("ok"), now);
        let n = notification_for(&req).unwrap();
        assert_eq!(n.recipient, Recipient::User(requester.user_id));
        assert_eq!(n.source_id, req.id);
        assert_eq!(req.status, Approved);
        assert_eq!(req.approval_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn submit_requires_items() {
        let unit = Uuid::new_v4();
        let manager = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let req = draft(unit, manager.user_id);
        assert!(matches!(
            authorize(&manager, &req, Submitted, 0, None),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejection_requires_a_reason_and_carries_it() {
        let unit = Uuid::new_v4();
        let reviewer = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let mut req = draft(unit, Uuid::new_v4());
        req.status = UnderReview;

        assert!(authorize(&reviewer, &req, Rejected, 1, Some("   ")).is_err());
        authorize(&reviewer, &req, Rejected, 1, Some("Over budget")).unwrap();

        let rejected = apply(&req, Rejected, &reviewer, Some("Over budget"), Utc::now());
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Over budget"));
        assert!(notification_for(&rejected).unwrap().message.contains("Over budget"));
    }

    #[test]
    fn only_the_requester_cancels() {
        let unit = Uuid::new_v4();
        let other_manager = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        let admin = Caller::new(Uuid::new_v4(), Role::Admin, vec![]);
        let mut req = draft(unit, Uuid::new_v4());
        req.status = Submitted;

        assert!(matches!(
            authorize(&other_manager, &req, Cancelled, 1, None),
            Err(AppError::Forbidden(_))
        ));
        authorize(&admin, &req, Cancelled, 1, None).unwrap();
        let cancelled = apply(&req, Cancelled, &admin, None, Utc::now());
        assert!(notification_for(&cancelled).is_none());
    }

    #[test]
    fn staff_cannot_review() {
        let unit = Uuid::new_v4();
        let staff = Caller::new(Uuid::new_v4(), Role::Staff, vec![unit]);
        let mut req = draft(unit, Uuid::new_v4());
        req.status = Submitted;
        assert!(matches!(
            authorize(&staff, &req, UnderReview, 1, None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn only_drafts_are_editable() {
        assert!(ensure_editable(Draft).is_ok());
        assert!(matches!(ensure_editable(Submitted), Err(AppError::RequisitionLocked(Submitted))));
    }
}
