//! Query engine
//!
//! Pure filter / sort / paginate / count logic. The store supplies the
//! candidate set (a full mirror scan or a server-side filtered remote query)
//! and the same predicates run over it in both connection modes.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use shared::error::ValidationError;
use shared::models::{RequestState, VacationRequest};
use shared::query::{Filter, ListQuery, PageRequest, PageResult, RequestStats, SortDirection, SortField, SortSpec};

/// Run a list query over a candidate set
///
/// The filter is validated before anything else. `total_count` is computed
/// on the filtered, unpaginated set.
pub fn execute(
    records: Vec<VacationRequest>,
    query: &ListQuery,
) -> Result<PageResult<VacationRequest>, ValidationError> {
    query.validate()?;

    let mut items = apply_filter(records, query.filter.as_ref());
    sort(&mut items, query.sort.unwrap_or_default());

    Ok(paginate(items, query.page))
}

/// Keep the records matching every supplied predicate
pub fn apply_filter(records: Vec<VacationRequest>, filter: Option<&Filter>) -> Vec<VacationRequest> {
    match filter {
        Some(filter) => records.into_iter().filter(|r| matches(filter, r)).collect(),
        None => records,
    }
}

/// Conjunction of the filter's predicates; absent fields place no constraint
pub fn matches(filter: &Filter, record: &VacationRequest) -> bool {
    if let Some(requester_id) = filter.requester_id
        && record.requester.id != requester_id
    {
        return false;
    }

    if let Some(state) = filter.state
        && record.state != state
    {
        return false;
    }

    if let Some(from) = filter.start_date_from
        && record.start_date < from
    {
        return false;
    }

    if let Some(to) = filter.start_date_to
        && record.start_date > to
    {
        return false;
    }

    if let Some(term) = filter.search_term() {
        let needle = term.to_lowercase();
        let hit = record.title.to_lowercase().contains(&needle)
            || record
                .reason
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(&needle))
            || record.requester.display_name.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }

    true
}

/// Stable sort; ties keep the candidate set's natural order
pub fn sort(items: &mut [VacationRequest], spec: SortSpec) {
    items.sort_by(|a, b| {
        let ord = compare(a, b, spec.field);
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn compare(a: &VacationRequest, b: &VacationRequest, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::StartDate => a.start_date.cmp(&b.start_date),
        SortField::EndDate => a.end_date.cmp(&b.end_date),
        SortField::TotalDays => a.total_days.cmp(&b.total_days),
        SortField::State => a.state.as_str().cmp(b.state.as_str()),
        SortField::RequestedAt => a.requested_at.cmp(&b.requested_at),
        SortField::Created => a.created_at.cmp(&b.created_at),
        SortField::Modified => a.modified_at.cmp(&b.modified_at),
        SortField::RequesterName => a
            .requester
            .display_name
            .to_lowercase()
            .cmp(&b.requester.display_name.to_lowercase()),
        // Undecided records sort before decided ones
        SortField::ApproverName => a
            .approver_name()
            .map(str::to_lowercase)
            .cmp(&b.approver_name().map(str::to_lowercase)),
        SortField::DecidedAt => a
            .decision
            .as_ref()
            .map(|d| d.decided_at)
            .cmp(&b.decision.as_ref().map(|d| d.decided_at)),
    }
}

/// Slice one page out of a sorted, filtered set
pub fn paginate<T>(items: Vec<T>, page: Option<PageRequest>) -> PageResult<T> {
    let total_count = items.len();

    let page = match page {
        Some(page) if page.is_paginated() => page,
        _ => {
            return PageResult {
                items,
                total_count,
                has_next: false,
            };
        }
    };

    let size = page.size as usize;
    let offset = page.offset();
    let items = items.into_iter().skip(offset).take(size).collect();

    PageResult {
        items,
        total_count,
        has_next: (page.number as usize + 1) * size < total_count,
    }
}

/// Aggregate counts over an already filtered set
pub fn stats(records: &[VacationRequest]) -> RequestStats {
    let mut stats = RequestStats::default();
    // requester id -> (count, first position, display name)
    let mut per_requester: HashMap<u64, (usize, usize, &str)> = HashMap::new();

    for (position, record) in records.iter().enumerate() {
        match record.state {
            RequestState::Pending => stats.pending += 1,
            RequestState::Approved => stats.approved += 1,
            RequestState::Rejected => stats.rejected += 1,
            RequestState::Cancelled => stats.cancelled += 1,
        }
        stats.total_days_requested += u64::from(record.total_days);

        per_requester
            .entry(record.requester.id)
            .or_insert((0, position, record.requester.display_name.as_str()))
            .0 += 1;
    }

    // Highest count wins; first appearance breaks ties
    stats.top_requester = per_requester
        .into_values()
        .max_by(|(count_a, first_a, _), (count_b, first_b, _)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(_, _, name)| name.to_string());

    stats
}

// ========== Server-side rendering ==========

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn date_literal(date: NaiveDate, end_of_day: bool) -> String {
    let time = if end_of_day { "23:59:59" } else { "00:00:00" };
    format!("datetime'{}T{}Z'", date.format("%Y-%m-%d"), time)
}

/// OData-style `$filter` for the remote path; `None` when nothing constrains
///
/// Free-text search is left out: `Reason` is a note column the service will
/// not filter on, so search runs in `execute` over the returned candidates.
pub fn render_filter(filter: &Filter) -> Option<String> {
    let mut conditions = Vec::new();

    if let Some(requester_id) = filter.requester_id {
        conditions.push(format!("RequesterId eq {}", requester_id));
    }
    if let Some(state) = filter.state {
        conditions.push(format!("State eq {}", quote(state.as_str())));
    }
    if let Some(from) = filter.start_date_from {
        conditions.push(format!("StartDate ge {}", date_literal(from, false)));
    }
    if let Some(to) = filter.start_date_to {
        conditions.push(format!("StartDate le {}", date_literal(to, true)));
    }
    if conditions.is_empty() {
        None
    } else {
        Some(conditions.join(" and "))
    }
}

/// OData-style `$orderby`
pub fn render_order_by(spec: SortSpec) -> String {
    match spec.direction {
        SortDirection::Asc => format!("{} asc", spec.field.as_str()),
        SortDirection::Desc => format!("{} desc", spec.field.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use shared::models::{Decision, Employee, UserRef};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: u64, requester: &str, state: RequestState, start: NaiveDate) -> VacationRequest {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::hours(id as i64);
        let employee = Employee::new(id * 10, requester, format!("{}@example.com", id));
        let decision = state.is_decided().then(|| Decision {
            approver: Employee::new(1, "Ana Admin", "ana@example.com"),
            decided_at: created + Duration::days(1),
            notes: None,
        });
        VacationRequest {
            id,
            title: format!("Request {}", id),
            requester: employee,
            start_date: start,
            end_date: start + Duration::days(4),
            total_days: 5,
            reason: Some("Family trip".to_string()),
            state,
            requested_at: created,
            decision,
            created_at: created,
            modified_at: created,
            created_by: UserRef::system(),
            last_modified_by: UserRef::system(),
        }
    }

    fn five() -> Vec<VacationRequest> {
        vec![
            record(1, "Joana Silva", RequestState::Pending, date(2024, 6, 3)),
            record(2, "Pedro Costa", RequestState::Approved, date(2024, 7, 1)),
            record(3, "Maria Santos", RequestState::Rejected, date(2024, 8, 12)),
            record(4, "Joana Silva", RequestState::Approved, date(2024, 9, 2)),
            record(5, "Rui Almeida", RequestState::Cancelled, date(2024, 10, 7)),
        ]
    }

    fn ids(page: &PageResult<VacationRequest>) -> Vec<u64> {
        page.items.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = execute(five(), &ListQuery::all()).unwrap();
        assert_eq!(ids(&page), vec![5, 4, 3, 2, 1]);
        assert_eq!(page.total_count, 5);
        assert!(!page.has_next);
    }

    #[test]
    fn test_filter_conjunction() {
        let filter = Filter::by_state(RequestState::Approved).with_search("JOANA");
        let page = execute(five(), &ListQuery::filtered(filter)).unwrap();
        assert_eq!(ids(&page), vec![4]);
    }

    #[test]
    fn test_search_matches_reason_and_title() {
        let filter = Filter::default().with_search("family");
        assert_eq!(execute(five(), &ListQuery::filtered(filter)).unwrap().total_count, 5);

        let filter = Filter::default().with_search("request 3");
        let page = execute(five(), &ListQuery::filtered(filter)).unwrap();
        assert_eq!(ids(&page), vec![3]);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let filter = Filter::default().starting_between(Some(date(2024, 7, 1)), Some(date(2024, 9, 2)));
        let query = ListQuery::filtered(filter).order_by(SortSpec::asc(SortField::StartDate));
        assert_eq!(ids(&execute(five(), &query).unwrap()), vec![2, 3, 4]);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let filter = Filter::default().starting_between(Some(date(2024, 9, 1)), Some(date(2024, 1, 1)));
        assert!(execute(five(), &ListQuery::filtered(filter)).is_err());
    }

    #[test]
    fn test_requester_filter() {
        let query = ListQuery::filtered(Filter::by_requester(10));
        assert_eq!(ids(&execute(five(), &query).unwrap()), vec![1]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        // Every record has 5 days; natural order must survive in both directions
        let asc = ListQuery::all().order_by(SortSpec::asc(SortField::TotalDays));
        assert_eq!(ids(&execute(five(), &asc).unwrap()), vec![1, 2, 3, 4, 5]);

        let by_name = ListQuery::all().order_by(SortSpec::asc(SortField::RequesterName));
        assert_eq!(ids(&execute(five(), &by_name).unwrap()), vec![1, 4, 3, 2, 5]);
    }

    #[test]
    fn test_sort_by_state_name() {
        let query = ListQuery::all().order_by(SortSpec::asc(SortField::State));
        // Approved, Approved, Cancelled, Pending, Rejected
        assert_eq!(ids(&execute(five(), &query).unwrap()), vec![2, 4, 5, 1, 3]);
    }

    #[test]
    fn test_pages() {
        let first = execute(five(), &ListQuery::all().paginate(2, 0)).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.total_count, 5);
        assert!(first.has_next);

        let last = execute(five(), &ListQuery::all().paginate(2, 2)).unwrap();
        assert_eq!(last.len(), 1);
        assert!(!last.has_next);

        let beyond = execute(five(), &ListQuery::all().paginate(2, 7)).unwrap();
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_count, 5);
    }

    #[test]
    fn test_pages_concatenate_to_full_result() {
        let sort = SortSpec::asc(SortField::StartDate);
        let full = ids(&execute(five(), &ListQuery::all().order_by(sort)).unwrap());

        for size in 1..=6 {
            let mut collected = Vec::new();
            let mut number = 0;
            loop {
                let page = execute(five(), &ListQuery::all().order_by(sort).paginate(size, number)).unwrap();
                collected.extend(ids(&page));
                if !page.has_next {
                    break;
                }
                number += 1;
            }
            assert_eq!(collected, full, "page size {}", size);
        }
    }

    #[test]
    fn test_non_positive_size_is_unpaginated() {
        let page = execute(five(), &ListQuery::all().paginate(-3, 4)).unwrap();
        assert_eq!(page.len(), 5);
        assert!(!page.has_next);
    }

    #[test]
    fn test_stats() {
        let stats = stats(&five());
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_days_requested, 25);
        assert_eq!(stats.top_requester.as_deref(), Some("Joana Silva"));

        assert_eq!(super::stats(&[]), RequestStats::default());
    }

    #[test]
    fn test_top_requester_groups_by_id_not_name() {
        // Two different people named "Joana Silva" (ids 10 and 40), one
        // request each; Pedro Costa has two.
        let mut records = five();
        let mut again = record(6, "Pedro Costa", RequestState::Pending, date(2024, 11, 4));
        again.requester = records[1].requester.clone();
        records.push(again);

        assert_eq!(stats(&records).top_requester.as_deref(), Some("Pedro Costa"));
    }

    #[test]
    fn test_render_filter() {
        assert_eq!(render_filter(&Filter::default()), None);

        let filter = Filter::by_requester(7)
            .with_state(RequestState::Pending)
            .starting_between(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)))
            .with_search("d'Ávila");
        let rendered = render_filter(&filter).unwrap();

        assert!(rendered.starts_with("RequesterId eq 7 and State eq 'Pending'"));
        assert!(rendered.contains("StartDate ge datetime'2024-01-01T00:00:00Z'"));
        assert!(rendered.contains("StartDate le datetime'2024-01-31T23:59:59Z'"));
        assert!(!rendered.contains("substringof"));
        assert!(!rendered.contains("Reason"));
    }

    #[test]
    fn test_search_only_filter_is_not_sent_to_the_server() {
        let filter = Filter::default().with_search("beach");
        assert_eq!(render_filter(&filter), None);

        // Still applied locally, reason included
        let mut hit = record(1, "Joana Silva", RequestState::Pending, date(2024, 5, 1));
        hit.reason = Some("Beach week".into());
        let miss = record(2, "Rui Almeida", RequestState::Pending, date(2024, 5, 1));
        let found = apply_filter(vec![hit, miss], Some(&filter));
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_render_order_by() {
        assert_eq!(render_order_by(SortSpec::default()), "Created desc");
        assert_eq!(
            render_order_by(SortSpec::asc(SortField::RequesterName)),
            "Requester/Title asc"
        );
    }
}
