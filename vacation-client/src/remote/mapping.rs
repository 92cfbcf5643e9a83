//! Field-bag mapping
//!
//! The remote service hands back loosely typed field maps. `map_fields` is
//! the single conversion into `VacationRequest`; every optional column has a
//! defaulting rule so partial or null bags still produce a usable record.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{Value, json};
use shared::models::{Decision, Employee, RequestState, UserRef, VacationDraft, VacationRequest};

use super::FieldMap;

/// Remote column names
pub mod fields {
    pub const ID: &str = "Id";
    pub const TITLE: &str = "Title";
    pub const REQUESTER: &str = "Requester";
    pub const REQUESTER_ID: &str = "RequesterId";
    pub const REQUESTER_EMAIL: &str = "RequesterEmail";
    pub const START_DATE: &str = "StartDate";
    pub const END_DATE: &str = "EndDate";
    pub const TOTAL_DAYS: &str = "TotalDays";
    pub const REASON: &str = "Reason";
    pub const STATE: &str = "State";
    pub const REQUESTED_AT: &str = "RequestedAt";
    pub const APPROVER: &str = "Approver";
    pub const APPROVER_ID: &str = "ApproverId";
    pub const DECIDED_AT: &str = "DecidedAt";
    pub const DECISION_NOTES: &str = "DecisionNotes";
    pub const CREATED: &str = "Created";
    pub const MODIFIED: &str = "Modified";
    pub const AUTHOR: &str = "Author";
    pub const EDITOR: &str = "Editor";
}

/// `$select` projection used by every item read
pub const SELECT: &[&str] = &[
    "Id",
    "Title",
    "RequesterId",
    "Requester/Id",
    "Requester/Title",
    "Requester/EMail",
    "RequesterEmail",
    "StartDate",
    "EndDate",
    "TotalDays",
    "Reason",
    "State",
    "RequestedAt",
    "ApproverId",
    "Approver/Id",
    "Approver/Title",
    "Approver/EMail",
    "DecidedAt",
    "DecisionNotes",
    "Created",
    "Modified",
    "Author/Id",
    "Author/Title",
    "Editor/Id",
    "Editor/Title",
];

/// `$expand` lookups used by every item read
pub const EXPAND: &[&str] = &["Requester", "Approver", "Author", "Editor"];

const UNKNOWN_REQUESTER: &str = "Unknown requester";

// ========== Loose getters ==========

fn get_str<'a>(bag: &'a FieldMap, key: &str) -> Option<&'a str> {
    bag.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn get_u64(bag: &FieldMap, key: &str) -> Option<u64> {
    bag.get(key).and_then(as_u64)
}

fn get_object<'a>(bag: &'a FieldMap, key: &str) -> Option<&'a FieldMap> {
    bag.get(key).and_then(Value::as_object)
}

/// Accepts `YYYY-MM-DD` or any RFC 3339 timestamp (date part)
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Accepts RFC 3339 or a bare date (midnight UTC)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date(raw).map(|d| d.and_time(NaiveTime::MIN).and_utc()))
}

fn get_date(bag: &FieldMap, key: &str) -> Option<NaiveDate> {
    get_str(bag, key).and_then(parse_date)
}

fn get_timestamp(bag: &FieldMap, key: &str) -> Option<DateTime<Utc>> {
    get_str(bag, key).and_then(parse_timestamp)
}

fn map_employee(obj: Option<&FieldMap>, fallback_id: Option<u64>, fallback_name: &str) -> Employee {
    let id = obj
        .and_then(|o| get_u64(o, "Id"))
        .or(fallback_id)
        .unwrap_or_default();
    let name = obj
        .and_then(|o| get_str(o, "Title"))
        .unwrap_or(fallback_name);
    let email = obj
        .and_then(|o| get_str(o, "EMail").or_else(|| get_str(o, "Email")))
        .unwrap_or_default();

    let mut employee = Employee::new(id, name, email);
    if let Some(job_title) = obj.and_then(|o| get_str(o, "JobTitle")) {
        employee = employee.with_job_title(job_title);
    }
    if let Some(department) = obj.and_then(|o| get_str(o, "Department")) {
        employee = employee.with_department(department);
    }
    employee
}

fn map_user_ref(obj: Option<&FieldMap>) -> UserRef {
    match obj {
        Some(o) => UserRef {
            id: get_u64(o, "Id").unwrap_or_default(),
            title: get_str(o, "Title").unwrap_or("System").to_string(),
        },
        None => UserRef::system(),
    }
}

// ========== Bag → record ==========

/// Convert a remote field bag into a typed record
///
/// | Column | Missing / null |
/// |--------|----------------|
/// | `Title` | empty string |
/// | `Requester` | `RequesterId`, "Unknown requester", `RequesterEmail` |
/// | `StartDate` | 1970-01-01 |
/// | `EndDate` | `StartDate` |
/// | `TotalDays` | 0 |
/// | `State` | Pending (also for unknown values) |
/// | `RequestedAt` | `Created`, then epoch |
/// | `Approver` | `ApproverId`, "System" (decided states only) |
/// | `DecidedAt` | `Modified` (decided states only) |
/// | `Created` | `RequestedAt`, then epoch |
/// | `Modified` | `Created` |
/// | `Author` / `Editor` | System user |
pub fn map_fields(bag: &FieldMap) -> VacationRequest {
    let requester_obj = get_object(bag, fields::REQUESTER);
    let mut requester = map_employee(requester_obj, get_u64(bag, fields::REQUESTER_ID), UNKNOWN_REQUESTER);
    if requester.email.is_empty()
        && let Some(email) = get_str(bag, fields::REQUESTER_EMAIL)
    {
        requester.email = email.to_string();
    }

    let start_date = get_date(bag, fields::START_DATE).unwrap_or_default();
    let end_date = get_date(bag, fields::END_DATE).unwrap_or(start_date);

    let total_days = get_u64(bag, fields::TOTAL_DAYS)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or_default();

    let state = get_str(bag, fields::STATE)
        .and_then(|s| s.parse().ok())
        .unwrap_or(RequestState::Pending);

    let created_raw = get_timestamp(bag, fields::CREATED);
    let requested_at = get_timestamp(bag, fields::REQUESTED_AT)
        .or(created_raw)
        .unwrap_or_default();
    let created_at = created_raw.unwrap_or(requested_at);
    let modified_at = get_timestamp(bag, fields::MODIFIED).unwrap_or(created_at);

    let decision = state.is_decided().then(|| Decision {
        approver: map_employee(
            get_object(bag, fields::APPROVER),
            get_u64(bag, fields::APPROVER_ID),
            "System",
        ),
        decided_at: get_timestamp(bag, fields::DECIDED_AT).unwrap_or(modified_at),
        notes: get_str(bag, fields::DECISION_NOTES).map(str::to_string),
    });

    VacationRequest {
        id: get_u64(bag, fields::ID).unwrap_or_default(),
        title: get_str(bag, fields::TITLE).unwrap_or_default().to_string(),
        requester,
        start_date,
        end_date,
        total_days,
        reason: get_str(bag, fields::REASON).map(str::to_string),
        state,
        requested_at,
        decision,
        created_at,
        modified_at,
        created_by: map_user_ref(get_object(bag, fields::AUTHOR)),
        last_modified_by: map_user_ref(get_object(bag, fields::EDITOR)),
    }
}

// ========== Record → bag ==========

fn date_value(date: NaiveDate) -> Value {
    json!(date.and_time(NaiveTime::MIN).and_utc().to_rfc3339())
}

fn employee_value(employee: &Employee) -> Value {
    json!({
        "Id": employee.id,
        "Title": employee.display_name,
        "EMail": employee.email,
    })
}

fn user_ref_value(user: &UserRef) -> Value {
    json!({ "Id": user.id, "Title": user.title })
}

/// Writable columns for a new Pending request
pub fn draft_to_fields(draft: &VacationDraft, now: DateTime<Utc>) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert(fields::TITLE.into(), json!(draft.resolved_title()));
    map.insert(fields::REQUESTER_ID.into(), json!(draft.requester.id));
    map.insert(fields::REQUESTER_EMAIL.into(), json!(draft.requester.email));
    map.insert(fields::START_DATE.into(), date_value(draft.start_date));
    map.insert(fields::END_DATE.into(), date_value(draft.end_date));
    map.insert(fields::TOTAL_DAYS.into(), json!(draft.total_days));
    map.insert(
        fields::REASON.into(),
        draft.resolved_reason().map_or(Value::Null, Value::String),
    );
    map.insert(fields::STATE.into(), json!(RequestState::Pending.as_str()));
    map.insert(fields::REQUESTED_AT.into(), json!(now.to_rfc3339()));
    map
}

/// Full expanded bag, as a read would return it
pub fn request_to_fields(record: &VacationRequest) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert(fields::ID.into(), json!(record.id));
    map.insert(fields::TITLE.into(), json!(record.title));
    map.insert(fields::REQUESTER_ID.into(), json!(record.requester.id));
    map.insert(fields::REQUESTER.into(), employee_value(&record.requester));
    map.insert(fields::REQUESTER_EMAIL.into(), json!(record.requester.email));
    map.insert(fields::START_DATE.into(), date_value(record.start_date));
    map.insert(fields::END_DATE.into(), date_value(record.end_date));
    map.insert(fields::TOTAL_DAYS.into(), json!(record.total_days));
    map.insert(
        fields::REASON.into(),
        record.reason.as_deref().map_or(Value::Null, |r| json!(r)),
    );
    map.insert(fields::STATE.into(), json!(record.state.as_str()));
    map.insert(fields::REQUESTED_AT.into(), json!(record.requested_at.to_rfc3339()));

    match &record.decision {
        Some(decision) => {
            map.insert(fields::APPROVER_ID.into(), json!(decision.approver.id));
            map.insert(fields::APPROVER.into(), employee_value(&decision.approver));
            map.insert(fields::DECIDED_AT.into(), json!(decision.decided_at.to_rfc3339()));
            map.insert(
                fields::DECISION_NOTES.into(),
                decision.notes.as_deref().map_or(Value::Null, |n| json!(n)),
            );
        }
        None => {
            for key in [fields::APPROVER_ID, fields::APPROVER, fields::DECIDED_AT, fields::DECISION_NOTES] {
                map.insert(key.into(), Value::Null);
            }
        }
    }

    map.insert(fields::CREATED.into(), json!(record.created_at.to_rfc3339()));
    map.insert(fields::MODIFIED.into(), json!(record.modified_at.to_rfc3339()));
    map.insert(fields::AUTHOR.into(), user_ref_value(&record.created_by));
    map.insert(fields::EDITOR.into(), user_ref_value(&record.last_modified_by));
    map
}

/// Directory entry → expanded user lookup value
pub fn user_lookup_value(employee: &Employee) -> Value {
    employee_value(employee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::demo_requests;

    fn bag(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => FieldMap::new(),
        }
    }

    #[test]
    fn test_empty_bag_uses_defaults() {
        let record = map_fields(&FieldMap::new());
        assert_eq!(record.id, 0);
        assert_eq!(record.title, "");
        assert_eq!(record.requester.display_name, "Unknown requester");
        assert_eq!(record.start_date, NaiveDate::default());
        assert_eq!(record.end_date, record.start_date);
        assert_eq!(record.total_days, 0);
        assert_eq!(record.state, RequestState::Pending);
        assert!(record.decision.is_none());
        assert_eq!(record.requested_at, DateTime::<Utc>::default());
        assert_eq!(record.created_by, UserRef::system());
    }

    #[test]
    fn test_nulls_are_treated_as_missing() {
        let record = map_fields(&bag(json!({
            "Id": 4,
            "Title": null,
            "Requester": null,
            "RequesterId": 12,
            "RequesterEmail": "x@example.com",
            "StartDate": "2024-05-02T00:00:00Z",
            "EndDate": null,
            "TotalDays": "3",
            "Reason": "",
            "State": null,
        })));
        assert_eq!(record.id, 4);
        assert_eq!(record.requester.id, 12);
        assert_eq!(record.requester.email, "x@example.com");
        assert_eq!(record.end_date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(record.total_days, 3);
        assert_eq!(record.reason, None);
        assert_eq!(record.state, RequestState::Pending);
    }

    #[test]
    fn test_unknown_state_falls_back_to_pending() {
        let record = map_fields(&bag(json!({ "State": "Archived", "ApproverId": 3 })));
        assert_eq!(record.state, RequestState::Pending);
        assert!(record.decision.is_none());
    }

    #[test]
    fn test_decided_state_without_approver_still_has_decision() {
        let record = map_fields(&bag(json!({
            "State": "Approved",
            "Modified": "2024-02-03T09:45:00Z",
        })));
        let decision = record.decision.as_ref().unwrap();
        assert_eq!(decision.approver.display_name, "System");
        assert_eq!(decision.decided_at, parse_timestamp("2024-02-03T09:45:00Z").unwrap());
        assert!(record.has_consistent_decision());
    }

    #[test]
    fn test_pending_drops_stale_decision_columns() {
        let record = map_fields(&bag(json!({
            "State": "Pending",
            "Approver": { "Id": 9, "Title": "Old Approver" },
            "DecisionNotes": "stale",
        })));
        assert!(record.decision.is_none());
    }

    #[test]
    fn test_requested_at_falls_back_to_created() {
        let record = map_fields(&bag(json!({ "Created": "2024-01-20" })));
        assert_eq!(record.requested_at, parse_timestamp("2024-01-20T00:00:00Z").unwrap());
        assert_eq!(record.modified_at, record.created_at);
    }

    #[test]
    fn test_expanded_bag_maps_back_to_record() {
        for record in demo_requests() {
            assert_eq!(map_fields(&request_to_fields(&record)), record);
        }
    }

    #[test]
    fn test_draft_fields() {
        let draft = VacationDraft::new(
            Employee::new(5, "Joana Silva", "joana@example.com"),
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 2).unwrap(),
            2,
        )
        .with_reason("  ");
        let fields = draft_to_fields(&draft, Utc::now());

        assert_eq!(fields["Title"], "Vacation request - Joana Silva");
        assert_eq!(fields["RequesterId"], 5);
        assert_eq!(fields["StartDate"], "2024-08-01T00:00:00+00:00");
        assert_eq!(fields["State"], "Pending");
        assert!(fields["Reason"].is_null());
    }
}
