// vacation-client/tests/failover.rs
// Connectivity failover from the remote service to the local mirror

use std::sync::Arc;

use chrono::NaiveDate;
use shared::query::{Filter, ListQuery};
use shared::{ConnectionMode, ErrorCode, RequestState};
use tempfile::TempDir;
use vacation_client::{
    ClientConfig, Employee, ErrorKind, Identity, InMemoryRemoteService, LocalMirrorStore, RemoteError,
    ResilientRecordStore, Transition, VacationDraft, demo_requests,
};

const LIST: &str = "VacationRequests";

fn draft() -> VacationDraft {
    let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 9, 6).unwrap();
    VacationDraft::new(Employee::new(101, "Joao Silva", "joao.silva@example.com"), start, end, 5)
        .with_title("Autumn break")
}

async fn seeded_mirror() -> LocalMirrorStore {
    let mirror = LocalMirrorStore::open_in_memory().unwrap();
    mirror.seed_if_empty(&demo_requests()).await.unwrap();
    mirror
}

#[tokio::test]
async fn test_first_write_fails_over_and_lands_on_mirror() {
    let remote = Arc::new(InMemoryRemoteService::with_list(LIST));
    let store = ResilientRecordStore::new(remote.clone(), seeded_mirror().await, LIST);
    assert_eq!(store.current_mode(), ConnectionMode::Remote);

    remote.fail_next(RemoteError::from_message("TypeError: Failed to fetch"));
    let id = store.create(draft()).await.unwrap();

    assert!(store.current_mode().is_local_mirror());
    assert!(store.connection_error().unwrap().contains("Failed to fetch"));
    assert_eq!(id, 6);
    assert_eq!(remote.item_count(LIST), 0);

    let record = store.mirror().get(id).await.unwrap();
    assert_eq!(record.title, "Autumn break");
    assert_eq!(record.state, RequestState::Pending);
    assert_eq!(store.get(id).await.unwrap(), record);
}

#[tokio::test]
async fn test_mirror_mode_serves_all_operations() {
    let remote = Arc::new(InMemoryRemoteService::with_list(LIST));
    let store = ResilientRecordStore::new(remote.clone(), seeded_mirror().await, LIST);
    remote.go_offline("connection refused");

    let pending = store
        .list(ListQuery::filtered(Filter::by_state(RequestState::Pending)))
        .await
        .unwrap();
    assert_eq!(pending.total_count, 2);
    assert!(store.current_mode().is_local_mirror());

    let approver = Identity::new(Employee::new(201, "Carlos Manager", "carlos.manager@example.com")).site_admin();
    let approved = store
        .apply_transition(1, Transition::approve(approver, Some("ok".into())))
        .await
        .unwrap();
    assert_eq!(approved.state, RequestState::Approved);
    assert_eq!(approved.last_modified_by.id, 201);

    let stats = store.stats(None).await.unwrap();
    assert_eq!(stats.approved, 3);
    assert_eq!(stats.pending, 1);

    let people = store.search_employees("silva").await.unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].id, 101);

    store.delete(5).await.unwrap();
    assert_eq!(store.mirror().count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_mode_does_not_return_to_remote() {
    let remote = Arc::new(InMemoryRemoteService::with_requests(LIST, &demo_requests()));
    let store = ResilientRecordStore::new(remote.clone(), LocalMirrorStore::open_in_memory().unwrap(), LIST);

    remote.go_offline("network is unreachable");
    assert_eq!(store.list(ListQuery::all()).await.unwrap().total_count, 0);

    remote.go_online();
    let calls = remote.call_count();
    store.create(draft()).await.unwrap();
    assert_eq!(store.list(ListQuery::all()).await.unwrap().total_count, 1);
    assert_eq!(remote.call_count(), calls);
    assert_eq!(remote.item_count(LIST), 5);
}

#[tokio::test]
async fn test_rejected_request_is_not_a_failover() {
    let remote = Arc::new(InMemoryRemoteService::with_requests(LIST, &demo_requests()));
    let store = ResilientRecordStore::new(remote.clone(), seeded_mirror().await, LIST);

    remote.fail_next(RemoteError::Forbidden("Access denied".into()));
    let err = store.get(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.code(), ErrorCode::PermissionDenied);
    assert!(store.current_mode().is_remote());

    remote.fail_next(RemoteError::Status {
        status: 503,
        message: "Service Unavailable".into(),
    });
    assert_eq!(store.get(1).await.unwrap().id, 1);
    assert!(store.current_mode().is_local_mirror());
}

#[tokio::test]
async fn test_initialize_failure_switches_to_mirror() {
    let remote = Arc::new(InMemoryRemoteService::new());
    let store = ResilientRecordStore::new(remote.clone(), seeded_mirror().await, LIST);

    remote.go_offline("request timeout");
    store.initialize().await.unwrap();
    assert!(store.current_mode().is_local_mirror());
    assert_eq!(store.list(ListQuery::all()).await.unwrap().total_count, 5);
}

#[tokio::test]
async fn test_from_config_uses_in_memory_remote_and_file_mirror() {
    let temp_dir = TempDir::new().unwrap();
    let mirror_path = temp_dir.path().join("data").join("mirror.redb");
    let config = ClientConfig::from_env()
        .with_list_title(LIST)
        .with_mirror_path(mirror_path.to_string_lossy())
        .with_seed_demo(true);
    let config = ClientConfig {
        remote_base_url: None,
        default_page_size: 2,
        ..config
    };

    let store = ResilientRecordStore::from_config(&config).await.unwrap();
    store.initialize().await.unwrap();
    assert!(store.current_mode().is_remote());

    let page = store.list(ListQuery::all()).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.total_count, 5);
    assert!(mirror_path.exists());
    assert_eq!(store.mirror().count().await.unwrap(), 5);
}
