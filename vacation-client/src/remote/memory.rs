//! In-memory remote service
//!
//! Process-local stand-in for the remote list service. Items are stored as
//! loose field bags exactly like the real service returns them, user lookup
//! columns are expanded from a small directory, and faults can be injected to
//! exercise failover.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::models::{Employee, UserRef, VacationRequest};

use super::mapping::{self, fields};
use super::{CurrentUser, FieldDefinition, FieldMap, RemoteError, RemoteQuery, RemoteRecordService, RemoteResult};
use crate::query;

#[derive(Debug, Default)]
struct ListState {
    fields: BTreeSet<String>,
    items: BTreeMap<u64, FieldMap>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct State {
    lists: HashMap<String, ListState>,
    users: BTreeMap<u64, Employee>,
    current_user: Option<CurrentUser>,
    groups: Vec<String>,
    offline: Option<String>,
    fail_next: Option<RemoteError>,
    calls: usize,
}

impl State {
    /// Count the call and surface any injected fault
    fn enter(&mut self) -> RemoteResult<()> {
        self.calls += 1;
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        if let Some(reason) = &self.offline {
            return Err(RemoteError::Connection(reason.clone()));
        }
        Ok(())
    }

    fn list_mut(&mut self, list: &str) -> RemoteResult<&mut ListState> {
        self.lists
            .get_mut(list)
            .ok_or_else(|| RemoteError::NotFound(format!("List '{}' does not exist", list)))
    }

    fn list(&self, list: &str) -> RemoteResult<&ListState> {
        self.lists
            .get(list)
            .ok_or_else(|| RemoteError::NotFound(format!("List '{}' does not exist", list)))
    }

    fn editor(&self) -> Value {
        let user = self
            .current_user
            .as_ref()
            .map(|u| u.employee.as_user_ref())
            .unwrap_or_else(UserRef::system);
        json!({ "Id": user.id, "Title": user.title })
    }

    /// Resolve user lookup ids into expanded objects
    fn expand(&self, bag: &FieldMap) -> FieldMap {
        let mut expanded = bag.clone();
        for (id_key, object_key) in [
            (fields::REQUESTER_ID, fields::REQUESTER),
            (fields::APPROVER_ID, fields::APPROVER),
        ] {
            let value = match bag.get(id_key).and_then(Value::as_u64) {
                Some(id) => match self.users.get(&id) {
                    Some(user) => mapping::user_lookup_value(user),
                    None => json!({ "Id": id }),
                },
                None => Value::Null,
            };
            expanded.insert(object_key.into(), value);
        }
        expanded
    }

    fn register(&mut self, employee: &Employee) {
        self.users.insert(employee.id, employee.clone());
    }
}

/// In-memory remote record service
#[derive(Debug, Default)]
pub struct InMemoryRemoteService {
    state: Mutex<State>,
}

impl InMemoryRemoteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with one existing, empty list
    pub fn with_list(list: &str) -> Self {
        let service = Self::new();
        service.state.lock().lists.insert(
            list.to_string(),
            ListState {
                next_id: 1,
                ..ListState::default()
            },
        );
        service
    }

    /// Service with one list holding the given records
    pub fn with_requests(list: &str, records: &[VacationRequest]) -> Self {
        let service = Self::with_list(list);
        service.seed(list, records);
        service
    }

    /// Store records as expanded bags, registering their users
    pub fn seed(&self, list: &str, records: &[VacationRequest]) {
        let mut state = self.state.lock();
        for record in records {
            state.register(&record.requester);
            if let Some(decision) = &record.decision {
                state.register(&decision.approver);
            }
        }

        let list_state = state.lists.entry(list.to_string()).or_default();
        for record in records {
            list_state.items.insert(record.id, mapping::request_to_fields(record));
        }
        let max_id = list_state.items.keys().next_back().copied().unwrap_or_default();
        list_state.next_id = list_state.next_id.max(max_id + 1);
    }

    /// Add a directory entry used for lookup expansion and user search
    pub fn register_user(&self, employee: Employee) {
        self.state.lock().register(&employee);
    }

    pub fn set_current_user(&self, user: CurrentUser, groups: Vec<String>) {
        let mut state = self.state.lock();
        state.register(&user.employee);
        state.current_user = Some(user);
        state.groups = groups;
    }

    /// Directory entry by email (case-insensitive)
    pub fn user_by_email(&self, email: &str) -> Option<Employee> {
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Fail every call with a connectivity error until `go_online`
    pub fn go_offline(&self, reason: impl Into<String>) {
        self.state.lock().offline = Some(reason.into());
    }

    pub fn go_online(&self) {
        self.state.lock().offline = None;
    }

    /// Fail only the next call with `error`
    pub fn fail_next(&self, error: RemoteError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Number of calls received so far, faulted ones included
    pub fn call_count(&self) -> usize {
        self.state.lock().calls
    }

    /// Item count of a list (0 when absent)
    pub fn item_count(&self, list: &str) -> usize {
        self.state
            .lock()
            .lists
            .get(list)
            .map_or(0, |l| l.items.len())
    }
}

#[async_trait]
impl RemoteRecordService for InMemoryRemoteService {
    async fn list_exists(&self, list: &str) -> RemoteResult<bool> {
        let mut state = self.state.lock();
        state.enter()?;
        Ok(state.lists.contains_key(list))
    }

    async fn create_list(&self, list: &str, _description: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.enter()?;
        state.lists.entry(list.to_string()).or_insert_with(|| ListState {
            next_id: 1,
            ..ListState::default()
        });
        Ok(())
    }

    async fn ensure_field(&self, list: &str, field: &FieldDefinition) -> RemoteResult<bool> {
        let mut state = self.state.lock();
        state.enter()?;
        Ok(state.list_mut(list)?.fields.insert(field.name.to_string()))
    }

    async fn query_items(&self, list: &str, remote_query: &RemoteQuery) -> RemoteResult<Vec<FieldMap>> {
        let mut state = self.state.lock();
        state.enter()?;
        let state = &*state;

        let expanded: BTreeMap<u64, FieldMap> = state
            .list(list)?
            .items
            .iter()
            .map(|(id, bag)| (*id, state.expand(bag)))
            .collect();

        let records = expanded.values().map(mapping::map_fields).collect();
        let mut records = query::apply_filter(records, remote_query.filter.as_ref());
        if let Some(sort) = remote_query.order_by {
            query::sort(&mut records, sort);
        }

        let skip = remote_query.skip.unwrap_or_default() as usize;
        let top = remote_query.top.map_or(usize::MAX, |t| t as usize);

        Ok(records
            .iter()
            .skip(skip)
            .take(top)
            .filter_map(|record| expanded.get(&record.id).cloned())
            .collect())
    }

    async fn get_item(&self, list: &str, id: u64) -> RemoteResult<FieldMap> {
        let mut state = self.state.lock();
        state.enter()?;
        let bag = state
            .list(list)?
            .items
            .get(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("Item {} does not exist", id)))?;
        Ok(state.expand(bag))
    }

    async fn add_item(&self, list: &str, values: FieldMap) -> RemoteResult<u64> {
        let mut state = self.state.lock();
        state.enter()?;
        let editor = state.editor();
        let now = json!(Utc::now().to_rfc3339());

        let list_state = state.list_mut(list)?;
        let id = list_state.next_id.max(1);
        list_state.next_id = id + 1;

        let mut bag = values;
        bag.insert(fields::ID.into(), json!(id));
        bag.insert(fields::CREATED.into(), now.clone());
        bag.insert(fields::MODIFIED.into(), now);
        bag.insert(fields::AUTHOR.into(), editor.clone());
        bag.insert(fields::EDITOR.into(), editor);
        list_state.items.insert(id, bag);

        Ok(id)
    }

    async fn update_item(&self, list: &str, id: u64, values: FieldMap) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.enter()?;
        let editor = state.editor();

        let bag = state
            .list_mut(list)?
            .items
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("Item {} does not exist", id)))?;
        bag.extend(values);
        bag.insert(fields::MODIFIED.into(), json!(Utc::now().to_rfc3339()));
        bag.insert(fields::EDITOR.into(), editor);
        Ok(())
    }

    async fn delete_item(&self, list: &str, id: u64) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.enter()?;
        state
            .list_mut(list)?
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("Item {} does not exist", id)))
    }

    async fn current_user(&self) -> RemoteResult<CurrentUser> {
        let mut state = self.state.lock();
        state.enter()?;
        state.current_user.clone().ok_or(RemoteError::Unauthorized)
    }

    async fn current_user_groups(&self) -> RemoteResult<Vec<String>> {
        let mut state = self.state.lock();
        state.enter()?;
        Ok(state.groups.clone())
    }

    async fn search_users(&self, text: &str, top: usize) -> RemoteResult<Vec<Employee>> {
        let mut state = self.state.lock();
        state.enter()?;
        let needle = text.trim().to_lowercase();

        Ok(state
            .users
            .values()
            .filter(|u| {
                u.display_name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
            })
            .take(top)
            .cloned()
            .collect())
    }
}
