//! Vacation Request Model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::employee::{Employee, UserRef};
use crate::error::{ErrorCode, ValidationError};

/// Longest request allowed by the length policy
pub const MAX_TOTAL_DAYS: u32 = 365;

/// Title length limit of the remote text column
pub const MAX_TITLE_LEN: usize = 255;

/// Request status
///
/// Serialized with the exact choice values used by the remote `State` column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RequestState {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestState {
    pub const ALL: [RequestState; 4] = [
        RequestState::Pending,
        RequestState::Approved,
        RequestState::Rejected,
        RequestState::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    /// States that must carry a decision record
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid request state: {}", s)),
        }
    }
}

/// Approver / timestamp / notes triple recorded by approve or reject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub approver: Employee,
    pub decided_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The central record
///
/// `decision` is `Some` exactly when `state` is Approved or Rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequest {
    pub id: u64,
    pub title: String,
    pub requester: Employee,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub state: RequestState,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub decision: Option<Decision>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: UserRef,
    pub last_modified_by: UserRef,
}

impl VacationRequest {
    /// Check the decision/state invariant
    pub fn has_consistent_decision(&self) -> bool {
        self.state.is_decided() == self.decision.is_some()
    }

    /// Approver display name, if decided
    pub fn approver_name(&self) -> Option<&str> {
        self.decision
            .as_ref()
            .map(|d| d.approver.display_name.as_str())
    }
}

/// Caller-supplied payload for creating a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationDraft {
    #[serde(default)]
    pub title: Option<String>,
    pub requester: Employee,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    #[serde(default)]
    pub reason: Option<String>,
}

impl VacationDraft {
    pub fn new(
        requester: Employee,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_days: u32,
    ) -> Self {
        Self {
            title: None,
            requester,
            start_date,
            end_date,
            total_days,
            reason: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Calendar days covered by the range, both ends included
    pub fn calendar_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Length policy: `1 <= totalDays <= min(365, calendar days)`
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_date > self.end_date {
            return Err(ValidationError::invalid_date_range("startDate"));
        }

        if self.total_days == 0 || self.total_days > MAX_TOTAL_DAYS {
            return Err(ValidationError::new(
                ErrorCode::InvalidTotalDays,
                "totalDays",
                format!("must be between 1 and {}", MAX_TOTAL_DAYS),
            ));
        }

        if i64::from(self.total_days) > self.calendar_days() {
            return Err(ValidationError::new(
                ErrorCode::InvalidTotalDays,
                "totalDays",
                format!(
                    "{} days requested but the range only covers {}",
                    self.total_days,
                    self.calendar_days()
                ),
            ));
        }

        if let Some(title) = &self.title
            && title.chars().count() > MAX_TITLE_LEN
        {
            return Err(ValidationError::new(
                ErrorCode::FieldTooLong,
                "title",
                format!("must be at most {} characters", MAX_TITLE_LEN),
            ));
        }

        Ok(())
    }

    /// Title to persist; blank titles fall back to a requester-based label
    pub fn resolved_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Vacation request - {}", self.requester.display_name),
        }
    }

    /// Reason with surrounding whitespace removed; blank means absent
    pub fn resolved_reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }

    /// Materialize a fresh Pending record
    pub fn into_request(self, id: u64, now: DateTime<Utc>) -> VacationRequest {
        let author = self.requester.as_user_ref();
        VacationRequest {
            id,
            title: self.resolved_title(),
            reason: self.resolved_reason(),
            requester: self.requester,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days: self.total_days,
            state: RequestState::Pending,
            requested_at: now,
            decision: None,
            created_at: now,
            modified_at: now,
            created_by: author.clone(),
            last_modified_by: author,
        }
    }
}
