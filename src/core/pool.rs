//! Resource pool manager.
//!
//! The pool is the only component that moves a guard between `free` and
//! `committed`. All of those moves happen inside a [`PoolSession`], which holds
//! the pool-wide lock for its lifetime.

use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, PoolStats, RequestId, RequestState, Transition,
};
use crate::domain::ports::DispatchStore;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::{as_input_error, validate_non_empty_string};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub struct ResourcePool<S: DispatchStore> {
    store: Arc<S>,
    lock: Mutex<()>,
}

/// Serialized critical section over the pool.
pub struct PoolSession<'a, S: DispatchStore> {
    store: &'a S,
    _lock: MutexGuard<'a, ()>,
}

impl<S: DispatchStore> ResourcePool<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Waits for exclusive access to the pool.
    pub async fn session(&self) -> PoolSession<'_, S> {
        PoolSession {
            store: self.store.as_ref(),
            _lock: self.lock.lock().await,
        }
    }

    /// Marks the lowest-numbered free guard committed and returns it.
    /// `None` means the pool is exhausted.
    pub async fn acquire_free(&self) -> Result<Option<Guard>> {
        self.session().await.acquire_free().await
    }

    pub async fn release(&self, id: GuardId) -> Result<Guard> {
        self.session().await.release(id).await
    }

    /// Administrative provisioning of a new free guard.
    pub async fn provision(&self, label: &str) -> Result<Guard> {
        self.session().await.provision(label).await
    }

    pub async fn list(&self, filter: Option<GuardStatus>) -> Result<Vec<Guard>> {
        self.store.list_guards(filter).await
    }

    pub async fn stats(&self) -> Result<PoolStats> {
        let guards = self.store.list_guards(None).await?;
        let free = guards.iter().filter(|g| g.is_free()).count();
        Ok(PoolStats {
            total: guards.len(),
            free,
            committed: guards.len() - free,
        })
    }
}

impl<'a, S: DispatchStore> PoolSession<'a, S> {
    pub fn store(&self) -> &'a S {
        self.store
    }

    pub async fn provision(&self, label: &str) -> Result<Guard> {
        validate_non_empty_string("label", label).map_err(as_input_error)?;

        let guard = self.store.insert_guard(label.trim()).await?;
        tracing::info!("Provisioned guard {} ({})", guard.id, guard.label);
        Ok(guard)
    }

    /// Selection rule: lowest identity first.
    pub async fn next_free(&self) -> Result<Option<Guard>> {
        let free = self.store.list_guards(Some(GuardStatus::Free)).await?;
        Ok(free.into_iter().min_by_key(|g| g.id))
    }

    pub async fn acquire_free(&self) -> Result<Option<Guard>> {
        let Some(mut guard) = self.next_free().await? else {
            tracing::warn!("Pool exhausted, no free guard to acquire");
            return Ok(None);
        };

        guard.status = GuardStatus::Committed;
        self.store.save_guard(&guard).await?;
        tracing::debug!("Acquired guard {}", guard.id);
        Ok(Some(guard))
    }

    /// Commits `guard` to `request_id` together with the request transition and
    /// the binding record.
    pub async fn commit_to(&self, request_id: RequestId, guard: &Guard) -> Result<Binding> {
        let binding = self
            .store
            .commit(Transition::Assign {
                request_id,
                guard_id: guard.id,
            })
            .await?;

        binding.ok_or_else(|| DispatchError::persistence("store returned no binding for assign"))
    }

    /// Completes `request_id`, freeing `release` in the same write when given.
    pub async fn complete(&self, request_id: RequestId, release: Option<GuardId>) -> Result<()> {
        self.store
            .commit(Transition::Complete {
                request_id,
                release,
            })
            .await?;
        Ok(())
    }

    /// Frees a guard. A guard still bound to an active request cannot be freed.
    pub async fn release(&self, id: GuardId) -> Result<Guard> {
        let mut guard = self.store.get_guard(id).await?;
        if guard.is_free() {
            return Ok(guard);
        }

        for binding in self.store.list_bindings().await? {
            if binding.guard_id != id {
                continue;
            }
            let request = self.store.get_request(binding.request_id).await?;
            if request.state != RequestState::Completed {
                return Err(DispatchError::invalid_state(
                    "guard",
                    id.get(),
                    guard.status,
                    format!("still bound to active request {}", request.id),
                ));
            }
        }

        guard.status = GuardStatus::Free;
        self.store.save_guard(&guard).await?;
        tracing::info!("Released guard {}", guard.id);
        Ok(guard)
    }
}
