#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use guard_dispatch::core::{DispatchStore, GuardStatus, RequestState};
use guard_dispatch::{Dispatcher, EngineSettings, InMemoryStore};
use std::sync::Arc;

pub fn service_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, 1, 8, 0, 0).unwrap()
}

pub async fn dispatcher_with_guards(labels: &[&str]) -> Arc<Dispatcher<InMemoryStore>> {
    dispatcher_with_settings(labels, EngineSettings::default()).await
}

pub async fn dispatcher_with_settings(
    labels: &[&str],
    settings: EngineSettings,
) -> Arc<Dispatcher<InMemoryStore>> {
    let dispatcher = Dispatcher::new(Arc::new(InMemoryStore::new()), settings);
    for label in labels {
        dispatcher.pool().provision(label).await.unwrap();
    }
    Arc::new(dispatcher)
}

/// A guard is committed iff exactly one binding whose request is not
/// completed points at it.
pub async fn assert_pool_consistent<S: DispatchStore>(store: &S) {
    let guards = store.list_guards(None).await.unwrap();
    let bindings = store.list_bindings().await.unwrap();

    for guard in guards {
        let mut active = 0;
        for binding in bindings.iter().filter(|b| b.guard_id == guard.id) {
            let request = store.get_request(binding.request_id).await.unwrap();
            if request.state != RequestState::Completed {
                active += 1;
            }
        }

        match guard.status {
            GuardStatus::Committed => assert_eq!(
                active, 1,
                "committed guard {} has {} active bindings",
                guard.id, active
            ),
            GuardStatus::Free => assert_eq!(
                active, 0,
                "free guard {} has {} active bindings",
                guard.id, active
            ),
        }
    }
}
