//! Failover-aware record store
//!
//! Single CRUD + query surface over the remote service and the local mirror.
//!
//! Every operation follows the same shape:
//!
//! 1. In `LocalMirror` mode go straight to the mirror.
//! 2. Otherwise try the remote service.
//! 3. A connectivity failure flips the mode to `LocalMirror` (once, with the
//!    captured reason) and the same operation is retried on the mirror. Any
//!    other failure is returned unchanged and the mode is left alone.
//!
//! The mode never flips back; build a new store to retry the remote service.
//! Overlapping writes to the same id are not sequenced (last write wins).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use shared::connection::ConnectionMode;
use shared::models::{Employee, VacationDraft, VacationRequest};
use shared::query::{Filter, ListQuery, PageRequest, PageResult, RequestStats};

use crate::config::ClientConfig;
use crate::error::{StoreError, StoreResult};
use crate::lifecycle::{self, Transition};
use crate::mirror::{LocalMirrorStore, demo_requests};
use crate::query;
use crate::remote::mapping::{self, map_fields};
use crate::remote::{
    HttpRecordService, InMemoryRemoteService, ListSchema, RemoteError, RemoteQuery, RemoteRecordService,
    ensure_list,
};

/// People-picker result limit
const SEARCH_LIMIT: usize = 10;

/// Remote "not found" for an item becomes the store's `NotFound(id)`
fn item_error(id: u64) -> impl Fn(RemoteError) -> StoreError {
    move |err| match err {
        RemoteError::NotFound(_) => StoreError::NotFound(id),
        other => StoreError::Remote(other),
    }
}

/// Drops the list cache when a write completes
struct WriteGuard<'a>(&'a ResilientRecordStore);

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.invalidate();
    }
}

pub struct ResilientRecordStore {
    remote: Arc<dyn RemoteRecordService>,
    mirror: LocalMirrorStore,
    list_title: String,
    default_page_size: i32,
    mode: RwLock<ConnectionMode>,
    provisioned: RwLock<bool>,
    last_query: RwLock<Option<ListQuery>>,
    /// Result of the last `list`, dropped on every write
    list_cache: RwLock<Option<PageResult<VacationRequest>>>,
    /// Bumped by every write; a `list` that overlapped one does not cache
    write_generation: AtomicU64,
}

impl ResilientRecordStore {
    pub fn new(
        remote: Arc<dyn RemoteRecordService>,
        mirror: LocalMirrorStore,
        list_title: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            mirror,
            list_title: list_title.into(),
            default_page_size: 0,
            mode: RwLock::new(ConnectionMode::Remote),
            provisioned: RwLock::new(false),
            last_query: RwLock::new(None),
            list_cache: RwLock::new(None),
            write_generation: AtomicU64::new(0),
        }
    }

    /// Page size applied when a list query carries none (`<= 0` = unpaginated)
    pub fn with_default_page_size(mut self, size: i32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Wire up the remote transport and mirror described by `config`
    ///
    /// Without a remote URL the store runs against an in-memory service.
    pub async fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        let remote: Arc<dyn RemoteRecordService> = match HttpRecordService::from_config(config) {
            Some(service) => Arc::new(service?),
            None => {
                tracing::info!("No remote URL configured, using in-memory remote service");
                let service = InMemoryRemoteService::with_list(&config.list_title);
                if config.mirror_seed_demo {
                    service.seed(&config.list_title, &demo_requests());
                }
                Arc::new(service)
            }
        };

        let mirror = LocalMirrorStore::open(&config.mirror_path)?;
        if config.mirror_seed_demo {
            mirror.seed_if_empty(&demo_requests()).await?;
        }

        tracing::info!(
            list = %config.list_title,
            mirror = %config.mirror_path,
            "Record store ready"
        );

        Ok(Self::new(remote, mirror, config.list_title.clone())
            .with_default_page_size(config.default_page_size))
    }

    // ========== Mode ==========

    pub fn current_mode(&self) -> ConnectionMode {
        self.mode.read().clone()
    }

    /// Reason captured when the store failed over
    pub fn connection_error(&self) -> Option<String> {
        self.mode.read().reason().map(str::to_string)
    }

    pub fn mirror(&self) -> &LocalMirrorStore {
        &self.mirror
    }

    pub fn list_title(&self) -> &str {
        &self.list_title
    }

    fn is_remote(&self) -> bool {
        self.mode.read().is_remote()
    }

    /// Switch to the mirror on connectivity failures, surface anything else
    fn fail_over(&self, operation: &'static str, err: StoreError) -> StoreResult<()> {
        if !err.is_connectivity() {
            return Err(err);
        }

        let mut mode = self.mode.write();
        if mode.is_remote() {
            let reason = err.to_string();
            tracing::warn!(operation, reason = %reason, "Remote unreachable, switching to local mirror");
            *mode = ConnectionMode::local_mirror(reason);
        }
        Ok(())
    }

    fn invalidate(&self) {
        self.write_generation.fetch_add(1, Ordering::SeqCst);
        self.list_cache.write().take();
    }

    /// Invalidate now and again when the write finishes (or is dropped)
    fn begin_write(&self) -> WriteGuard<'_> {
        self.invalidate();
        WriteGuard(self)
    }

    // ========== Provisioning ==========

    /// Provision the remote list once
    pub async fn initialize(&self) -> StoreResult<()> {
        if !self.is_remote() || *self.provisioned.read() {
            return Ok(());
        }

        let schema = ListSchema::vacation_requests(self.list_title.clone());
        match ensure_list(self.remote.as_ref(), &schema).await {
            Ok(_) => {
                *self.provisioned.write() = true;
                Ok(())
            }
            Err(e) => self.fail_over("initialize", e.into()),
        }
    }

    // ========== CRUD ==========

    /// Validate and persist a new Pending request; returns its id
    pub async fn create(&self, draft: VacationDraft) -> StoreResult<u64> {
        draft.validate()?;
        let _write = self.begin_write();

        if self.is_remote() {
            let fields = mapping::draft_to_fields(&draft, Utc::now());
            match self.remote.add_item(&self.list_title, fields).await {
                Ok(id) => {
                    tracing::info!(id, requester = draft.requester.id, "Request created");
                    return Ok(id);
                }
                Err(e) => self.fail_over("create", e.into())?,
            }
        }

        let record = self.mirror.create(draft).await?;
        tracing::info!(id = record.id, requester = record.requester.id, "Request created on mirror");
        Ok(record.id)
    }

    pub async fn get(&self, id: u64) -> StoreResult<VacationRequest> {
        if self.is_remote() {
            match self.remote.get_item(&self.list_title, id).await {
                Ok(bag) => return Ok(map_fields(&bag)),
                Err(e) => self.fail_over("get", item_error(id)(e))?,
            }
        }

        Ok(self.mirror.get(id).await?)
    }

    /// Filter / sort / paginate over the active source
    pub async fn list(&self, query: ListQuery) -> StoreResult<PageResult<VacationRequest>> {
        query.validate()?;

        let mut query = query;
        if query.page.is_none() && self.default_page_size > 0 {
            query.page = Some(PageRequest::new(self.default_page_size, 0));
        }

        let generation = self.write_generation.load(Ordering::SeqCst);
        let candidates = self.candidates("list", query.filter.as_ref()).await?;
        let result = query::execute(candidates, &query)?;

        tracing::debug!(
            total = result.total_count,
            returned = result.len(),
            has_next = result.has_next,
            "List query executed"
        );

        *self.last_query.write() = Some(query);

        // Checked under the cache lock; a concurrent invalidate cannot interleave
        let mut cache = self.list_cache.write();
        if self.write_generation.load(Ordering::SeqCst) == generation {
            *cache = Some(result.clone());
        } else {
            tracing::debug!("Write overlapped list query, result not cached");
        }
        Ok(result)
    }

    /// Re-run the last list query (all requests when none ran yet)
    pub async fn refresh(&self) -> StoreResult<PageResult<VacationRequest>> {
        let query = self.last_query.read().clone().unwrap_or_default();
        self.list(query).await
    }

    /// Result of the last `list`, unless a write happened since
    pub fn cached_list(&self) -> Option<PageResult<VacationRequest>> {
        self.list_cache.read().clone()
    }

    /// Validate, apply and persist a lifecycle transition
    ///
    /// Returns the updated record as stored.
    pub async fn apply_transition(&self, id: u64, transition: Transition) -> StoreResult<VacationRequest> {
        transition.validate()?;
        let _write = self.begin_write();

        if self.is_remote() {
            match self.remote_transition(id, &transition).await {
                Ok(record) => {
                    tracing::info!(id, event = %transition.event(), state = %record.state, "Transition applied");
                    return Ok(record);
                }
                Err(e) => self.fail_over("apply_transition", e)?,
            }
        }

        let current = self.mirror.get(id).await?;
        let delta = lifecycle::apply(&current, &transition, Utc::now())?;
        let record = self.mirror.update(id, &delta).await?;

        tracing::info!(id, event = %transition.event(), state = %record.state, "Transition applied on mirror");
        Ok(record)
    }

    async fn remote_transition(&self, id: u64, transition: &Transition) -> StoreResult<VacationRequest> {
        let bag = self
            .remote
            .get_item(&self.list_title, id)
            .await
            .map_err(item_error(id))?;
        let current = map_fields(&bag);

        let delta = lifecycle::apply(&current, transition, Utc::now())?;
        self.remote
            .update_item(&self.list_title, id, delta.to_fields())
            .await
            .map_err(item_error(id))?;

        let bag = self
            .remote
            .get_item(&self.list_title, id)
            .await
            .map_err(item_error(id))?;
        Ok(map_fields(&bag))
    }

    pub async fn delete(&self, id: u64) -> StoreResult<()> {
        let _write = self.begin_write();

        if self.is_remote() {
            match self.remote.delete_item(&self.list_title, id).await {
                Ok(()) => {
                    tracing::info!(id, "Request deleted");
                    return Ok(());
                }
                Err(e) => self.fail_over("delete", item_error(id)(e))?,
            }
        }

        self.mirror.delete(id).await?;
        tracing::info!(id, "Request deleted on mirror");
        Ok(())
    }

    // ========== Aggregates & lookups ==========

    /// Counts over the filtered set
    pub async fn stats(&self, filter: Option<Filter>) -> StoreResult<RequestStats> {
        if let Some(filter) = &filter {
            filter.validate()?;
        }

        let candidates = self.candidates("stats", filter.as_ref()).await?;
        let filtered = query::apply_filter(candidates, filter.as_ref());
        Ok(query::stats(&filtered))
    }

    /// People picker: directory search, or distinct mirror requesters
    pub async fn search_employees(&self, text: &str) -> StoreResult<Vec<Employee>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        if self.is_remote() {
            match self.remote.search_users(text, SEARCH_LIMIT).await {
                Ok(users) => return Ok(users),
                Err(e) => self.fail_over("search_employees", e.into())?,
            }
        }

        let needle = text.to_lowercase();
        let mut found: Vec<Employee> = Vec::new();
        for record in self.mirror.load_all().await? {
            let employee = record.requester;
            let hit = employee.display_name.to_lowercase().contains(&needle)
                || employee.email.to_lowercase().contains(&needle);
            if hit && !found.iter().any(|e| e.id == employee.id) {
                found.push(employee);
            }
            if found.len() == SEARCH_LIMIT {
                break;
            }
        }
        Ok(found)
    }

    /// Candidate set for the query engine
    async fn candidates(
        &self,
        operation: &'static str,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<VacationRequest>> {
        if self.is_remote() {
            let query = RemoteQuery::requests(filter.cloned());
            match self.remote.query_items(&self.list_title, &query).await {
                Ok(bags) => return Ok(bags.iter().map(map_fields).collect()),
                Err(e) => self.fail_over(operation, e.into())?,
            }
        }

        Ok(self.mirror.load_all().await?)
    }
}
