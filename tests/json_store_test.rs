mod common;

use common::{assert_pool_consistent, service_time};
use guard_dispatch::core::{DispatchStore, GuardStatus, RequestState};
use guard_dispatch::{DispatchError, Dispatcher, EngineSettings, JsonFileStore};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_dispatcher(path: &std::path::Path) -> Dispatcher<JsonFileStore> {
    let store = JsonFileStore::open(path).await.unwrap();
    Dispatcher::new(Arc::new(store), EngineSettings::default())
}

#[tokio::test]
async fn test_state_survives_reopen() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("state.json");

    let request_id = {
        let dispatcher = open_dispatcher(&path).await;
        dispatcher.pool().provision("North Gate").await?;
        let request = dispatcher
            .engine()
            .create_request("client-a", service_time(), 4)
            .await?;
        dispatcher.engine().assign_resource(request.id).await?;
        request.id
    };

    let reopened = open_dispatcher(&path).await;
    let request = reopened.engine().get_request(request_id).await?;
    assert_eq!(request.state, RequestState::Assigned);
    assert_eq!(request.client_id, "client-a");

    let guards = reopened.pool().list(Some(GuardStatus::Committed)).await?;
    assert_eq!(guards.len(), 1);
    assert_eq!(reopened.engine().list_bindings().await?.len(), 1);
    assert_pool_consistent(reopened.store()).await;

    let err = reopened.engine().assign_resource(request_id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidState { .. }));
    Ok(())
}

#[tokio::test]
async fn test_failed_write_applies_nothing() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let state_dir = temp_dir.path().join("state");
    let path = state_dir.join("state.json");

    let dispatcher = open_dispatcher(&path).await;
    dispatcher.pool().provision("North Gate").await?;
    let request = dispatcher
        .engine()
        .create_request("client-a", service_time(), 4)
        .await?;

    // pull the directory out from under the store so the next write fails
    std::fs::remove_dir_all(&state_dir)?;

    let err = dispatcher
        .engine()
        .assign_resource(request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::PersistenceFailure { .. }));

    let store = dispatcher.store();
    assert_eq!(
        store.get_request(request.id).await?.state,
        RequestState::Pending
    );
    assert_eq!(store.list_guards(Some(GuardStatus::Free)).await?.len(), 1);
    assert!(store.list_bindings().await?.is_empty());

    std::fs::create_dir_all(&state_dir)?;
    let binding = dispatcher.engine().assign_resource(request.id).await?;
    assert_eq!(binding.request_id, request.id);
    assert_pool_consistent(store).await;
    Ok(())
}

#[tokio::test]
async fn test_seed_guards_only_into_empty_pool() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("state.json");
    let labels = vec!["North Gate".to_string(), "South Gate".to_string()];

    let dispatcher = open_dispatcher(&path).await;
    assert_eq!(dispatcher.seed_guards(&labels).await?, 2);
    drop(dispatcher);

    let reopened = open_dispatcher(&path).await;
    assert_eq!(reopened.seed_guards(&labels).await?, 0);
    assert_eq!(reopened.pool().stats().await?.total, 2);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_snapshot_is_persistence_failure() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let result = JsonFileStore::open(&path).await;
    assert!(matches!(
        result,
        Err(DispatchError::PersistenceFailure { .. })
    ));
}

#[tokio::test]
async fn test_second_opener_is_refused_while_snapshot_is_held() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("state.json");

    let first = JsonFileStore::open(&path).await?;
    let refused = JsonFileStore::try_open(&path).await;
    assert!(matches!(
        refused,
        Err(DispatchError::PersistenceFailure { .. })
    ));

    drop(first);
    assert!(JsonFileStore::try_open(&path).await.is_ok());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiting_opener_sees_earlier_assignment() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("state.json");

    let first = open_dispatcher(&path).await;
    first.pool().provision("R1").await?;
    let q1 = first
        .engine()
        .create_request("client-a", service_time(), 1)
        .await?;
    let q2 = first
        .engine()
        .create_request("client-b", service_time(), 1)
        .await?;

    let q2_id = q2.id;
    let second_path = path.clone();
    let second = tokio::spawn(async move {
        let dispatcher = open_dispatcher(&second_path).await;
        let outcome = dispatcher.engine().assign_resource(q2_id).await;
        (dispatcher, outcome)
    });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!second.is_finished(), "second store opened while the first held the lock");

    let binding = first.engine().assign_resource(q1.id).await?;
    drop(first);

    let (dispatcher, outcome) = second.await?;
    assert!(matches!(outcome, Err(DispatchError::NoResourceAvailable)));

    let bindings = dispatcher.engine().list_bindings().await?;
    assert_eq!(bindings, vec![binding]);
    assert_eq!(
        dispatcher.engine().get_request(q1.id).await?.state,
        RequestState::Assigned
    );
    assert_eq!(
        dispatcher.engine().get_request(q2_id).await?.state,
        RequestState::Pending
    );
    assert_pool_consistent(dispatcher.store()).await;
    Ok(())
}

#[tokio::test]
async fn test_failed_completion_write_applies_nothing() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let state_dir = temp_dir.path().join("state");
    let path = state_dir.join("state.json");

    let dispatcher = open_dispatcher(&path).await;
    dispatcher.pool().provision("North Gate").await?;
    let request = dispatcher
        .engine()
        .create_request("client-a", service_time(), 4)
        .await?;
    let binding = dispatcher.engine().assign_resource(request.id).await?;

    std::fs::remove_dir_all(&state_dir)?;

    let err = dispatcher
        .engine()
        .complete_request(request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::PersistenceFailure { .. }));

    let store = dispatcher.store();
    assert_eq!(
        store.get_request(request.id).await?.state,
        RequestState::Assigned
    );
    assert_eq!(
        store.get_guard(binding.guard_id).await?.status,
        GuardStatus::Committed
    );
    assert_pool_consistent(store).await;
    Ok(())
}
