//! Query request types
//!
//! Declarative filter / sort / page grammar shared by the remote and local
//! query paths.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::RequestState;

/// Conjunctive predicate; `None` fields place no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RequestState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
}

impl Filter {
    pub fn by_state(state: RequestState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn by_requester(requester_id: u64) -> Self {
        Self {
            requester_id: Some(requester_id),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: RequestState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_requester(mut self, requester_id: u64) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    /// Inclusive bounds on `startDate`
    pub fn starting_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.start_date_from = from;
        self.start_date_to = to;
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Trimmed search text; blank counts as absent
    pub fn search_term(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.requester_id.is_none()
            && self.state.is_none()
            && self.start_date_from.is_none()
            && self.start_date_to.is_none()
            && self.search_term().is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.start_date_from, self.start_date_to)
            && from > to
        {
            return Err(ValidationError::invalid_date_range("startDateFrom"));
        }
        Ok(())
    }
}

/// Sortable columns (allow-list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Id,
    Title,
    StartDate,
    EndDate,
    TotalDays,
    State,
    RequestedAt,
    Created,
    Modified,
    #[serde(rename = "Requester/Title")]
    RequesterName,
    #[serde(rename = "Approver/Title")]
    ApproverName,
    DecidedAt,
}

impl SortField {
    pub const ALL: [SortField; 12] = [
        SortField::Id,
        SortField::Title,
        SortField::StartDate,
        SortField::EndDate,
        SortField::TotalDays,
        SortField::State,
        SortField::RequestedAt,
        SortField::Created,
        SortField::Modified,
        SortField::RequesterName,
        SortField::ApproverName,
        SortField::DecidedAt,
    ];

    /// Remote column path (also the accepted textual form)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Title => "Title",
            Self::StartDate => "StartDate",
            Self::EndDate => "EndDate",
            Self::TotalDays => "TotalDays",
            Self::State => "State",
            Self::RequestedAt => "RequestedAt",
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::RequesterName => "Requester/Title",
            Self::ApproverName => "Approver/Title",
            Self::DecidedAt => "DecidedAt",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::unknown_sort_field(s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// Parse a caller-supplied field name against the allow-list
    pub fn parse(field: &str, direction: SortDirection) -> Result<Self, ValidationError> {
        Ok(Self {
            field: field.parse()?,
            direction,
        })
    }
}

impl Default for SortSpec {
    /// Newest first
    fn default() -> Self {
        Self::desc(SortField::Created)
    }
}

/// Zero-based page selector; `size <= 0` disables pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub size: i32,
    pub number: u32,
}

impl PageRequest {
    pub fn new(size: i32, number: u32) -> Self {
        Self { size, number }
    }

    pub fn unpaginated() -> Self {
        Self { size: 0, number: 0 }
    }

    pub fn is_paginated(&self) -> bool {
        self.size > 0
    }

    /// Items skipped before this page (0 when unpaginated)
    pub fn offset(&self) -> usize {
        if self.is_paginated() {
            self.number as usize * self.size as usize
        } else {
            0
        }
    }
}

/// One page of results plus totals computed over the filtered set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub has_next: bool,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            has_next: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Complete list request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRequest>,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn paginate(mut self, size: i32, number: u32) -> Self {
        self.page = Some(PageRequest::new(size, number));
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.filter {
            Some(filter) => filter.validate(),
            None => Ok(()),
        }
    }
}

/// Aggregates over a filtered set of requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub cancelled: usize,
    pub total_days_requested: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_requester: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!("Requester/Title".parse::<SortField>(), Ok(SortField::RequesterName));
        assert_eq!("startdate".parse::<SortField>(), Ok(SortField::StartDate));

        let err = "Password".parse::<SortField>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownSortField);
    }

    #[test]
    fn test_sort_field_serde_uses_column_path() {
        let json = serde_json::to_string(&SortField::ApproverName).unwrap();
        assert_eq!(json, "\"Approver/Title\"");
        for field in SortField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_default_sort_is_created_desc() {
        let sort = SortSpec::default();
        assert_eq!(sort.field, SortField::Created);
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_filter_blank_search_is_absent() {
        let filter = Filter::default().with_search("   ");
        assert!(filter.search_term().is_none());
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 1);
        let to = NaiveDate::from_ymd_opt(2024, 4, 1);
        let err = Filter::default()
            .starting_between(from, to)
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDateRange);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest::new(2, 2).offset(), 4);
        assert_eq!(PageRequest::new(0, 3).offset(), 0);
        assert_eq!(PageRequest::new(-1, 3).offset(), 0);
        assert!(!PageRequest::unpaginated().is_paginated());
    }

    #[test]
    fn test_list_query_builder() {
        let query = ListQuery::filtered(Filter::by_state(RequestState::Approved))
            .order_by(SortSpec::asc(SortField::StartDate))
            .paginate(10, 1);

        assert_eq!(query.page, Some(PageRequest::new(10, 1)));
        assert_eq!(query.sort.map(|s| s.field), Some(SortField::StartDate));
        assert!(query.validate().is_ok());
    }
}
