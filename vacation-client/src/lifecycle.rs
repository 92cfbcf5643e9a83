//! Request lifecycle state machine
//!
//! ```text
//! Pending ──approve──▶ Approved ─┐
//!    │ ───reject───▶ Rejected ──┤──revert──▶ Pending
//!    └───cancel───▶ Cancelled    │
//! ```
//!
//! The machine never touches storage. It takes the current record and a
//! transition and emits the delta to persist. Checks run in a fixed order:
//! payload validation, then state, then permission.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use shared::error::{ErrorCode, ValidationError};
use shared::models::{Decision, RequestState, UserRef, VacationRequest};

use crate::error::{StoreError, StoreResult};
use crate::permissions::{Identity, PermissionResolver};
use crate::remote::FieldMap;
use crate::remote::mapping::fields;

/// Lifecycle event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Approve,
    Reject,
    Cancel,
    Revert,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Revert => "revert",
        }
    }

    /// State reached when the event succeeds
    pub fn target(&self) -> RequestState {
        match self {
            Self::Approve => RequestState::Approved,
            Self::Reject => RequestState::Rejected,
            Self::Cancel => RequestState::Cancelled,
            Self::Revert => RequestState::Pending,
        }
    }

    fn accepts(&self, from: RequestState) -> bool {
        match self {
            Self::Approve | Self::Reject | Self::Cancel => from == RequestState::Pending,
            Self::Revert => from.is_decided(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events a record in `state` may legally receive (UI helper)
pub fn allowed_events(state: RequestState) -> Vec<Event> {
    [Event::Approve, Event::Reject, Event::Cancel, Event::Revert]
        .into_iter()
        .filter(|event| event.accepts(state))
        .collect()
}

/// A requested state change and the identity asking for it
#[derive(Debug, Clone)]
pub enum Transition {
    Approve {
        approver: Identity,
        notes: Option<String>,
    },
    Reject {
        approver: Identity,
        notes: String,
    },
    Cancel {
        actor: Identity,
    },
    Revert {
        actor: Identity,
    },
}

impl Transition {
    pub fn approve(approver: Identity, notes: Option<String>) -> Self {
        Self::Approve { approver, notes }
    }

    pub fn reject(approver: Identity, notes: impl Into<String>) -> Self {
        Self::Reject {
            approver,
            notes: notes.into(),
        }
    }

    pub fn cancel(actor: Identity) -> Self {
        Self::Cancel { actor }
    }

    pub fn revert(actor: Identity) -> Self {
        Self::Revert { actor }
    }

    pub fn event(&self) -> Event {
        match self {
            Self::Approve { .. } => Event::Approve,
            Self::Reject { .. } => Event::Reject,
            Self::Cancel { .. } => Event::Cancel,
            Self::Revert { .. } => Event::Revert,
        }
    }

    pub fn actor(&self) -> &Identity {
        match self {
            Self::Approve { approver, .. } | Self::Reject { approver, .. } => approver,
            Self::Cancel { actor } | Self::Revert { actor } => actor,
        }
    }

    /// Payload checks that need no record; run before any I/O
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::Reject { notes, .. } = self
            && notes.trim().is_empty()
        {
            return Err(ValidationError::rejection_notes_required());
        }
        Ok(())
    }

    fn notes(&self) -> Option<String> {
        match self {
            Self::Approve { notes, .. } => notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            Self::Reject { notes, .. } => Some(notes.trim().to_string()),
            Self::Cancel { .. } | Self::Revert { .. } => None,
        }
    }
}

/// What happens to the decision record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionChange {
    Set(Decision),
    Clear,
}

/// Canonical field delta produced by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDelta {
    pub state: RequestState,
    pub decision: DecisionChange,
    pub editor: UserRef,
    pub at: DateTime<Utc>,
}

impl RequestDelta {
    /// Merge into a record, refreshing the bookkeeping fields
    pub fn apply_to(&self, record: &mut VacationRequest) {
        record.state = self.state;
        record.decision = match &self.decision {
            DecisionChange::Set(decision) => Some(decision.clone()),
            DecisionChange::Clear => None,
        };
        record.modified_at = self.at;
        record.last_modified_by = self.editor.clone();
    }

    /// Remote column values; `Modified`/`Editor` are server-managed
    pub fn to_fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::STATE.into(), json!(self.state.as_str()));

        match &self.decision {
            DecisionChange::Set(decision) => {
                map.insert(fields::APPROVER_ID.into(), json!(decision.approver.id));
                map.insert(fields::DECIDED_AT.into(), json!(decision.decided_at.to_rfc3339()));
                map.insert(
                    fields::DECISION_NOTES.into(),
                    decision.notes.as_deref().map_or(Value::Null, |n| json!(n)),
                );
            }
            DecisionChange::Clear => {
                map.insert(fields::APPROVER_ID.into(), Value::Null);
                map.insert(fields::DECIDED_AT.into(), Value::Null);
                map.insert(fields::DECISION_NOTES.into(), Value::Null);
            }
        }

        map
    }
}

/// Validate a transition against the current record and compute its delta
pub fn apply(
    record: &VacationRequest,
    transition: &Transition,
    now: DateTime<Utc>,
) -> StoreResult<RequestDelta> {
    // 1. Payload
    transition.validate()?;

    // 2. State
    let event = transition.event();
    if !event.accepts(record.state) {
        return Err(StoreError::InvalidTransition {
            from: record.state,
            event: event.as_str(),
        });
    }

    // 3. Permission
    authorize(record, transition)?;

    let actor = transition.actor();
    let decision = match event {
        Event::Approve | Event::Reject => DecisionChange::Set(Decision {
            approver: actor.employee.clone(),
            decided_at: now,
            notes: transition.notes(),
        }),
        Event::Cancel | Event::Revert => DecisionChange::Clear,
    };

    Ok(RequestDelta {
        state: event.target(),
        decision,
        editor: actor.employee.as_user_ref(),
        at: now,
    })
}

fn authorize(record: &VacationRequest, transition: &Transition) -> StoreResult<()> {
    let actor = transition.actor();
    let perms = PermissionResolver::resolve(actor);

    match transition.event() {
        Event::Approve if !perms.can_approve => Err(StoreError::permission_denied(
            ErrorCode::ApproverRequired,
            format!("{} cannot approve requests", actor.employee.display_name),
        )),
        Event::Reject if !perms.can_reject => Err(StoreError::permission_denied(
            ErrorCode::ApproverRequired,
            format!("{} cannot reject requests", actor.employee.display_name),
        )),
        Event::Cancel if !perms.is_admin && actor.id() != record.requester.id => {
            Err(StoreError::permission_denied(
                ErrorCode::RequesterOrAdminRequired,
                "only the requester or an administrator can cancel",
            ))
        }
        Event::Revert if !(perms.is_admin || perms.can_approve) => Err(StoreError::permission_denied(
            ErrorCode::ApproverRequired,
            format!("{} cannot revert decisions", actor.employee.display_name),
        )),
        _ => Ok(()),
    }
}
