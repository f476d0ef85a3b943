use crate::core::pool::ResourcePool;
use crate::domain::model::{Binding, NewServiceRequest, RequestId, RequestState, ServiceRequest};
use crate::domain::ports::DispatchStore;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::{as_input_error, validate_non_empty_string, validate_range};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Free the bound guard when its request completes.
    pub release_on_completion: bool,
    pub max_duration_hours: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            release_on_completion: true,
            max_duration_hours: 24,
        }
    }
}

/// Owns the service request lifecycle and hands guard selection to the pool.
pub struct AssignmentEngine<S: DispatchStore> {
    store: Arc<S>,
    pool: Arc<ResourcePool<S>>,
    settings: EngineSettings,
}

impl<S: DispatchStore> AssignmentEngine<S> {
    pub fn new(store: Arc<S>, pool: Arc<ResourcePool<S>>, settings: EngineSettings) -> Self {
        Self {
            store,
            pool,
            settings,
        }
    }

    pub async fn create_request(
        &self,
        client_id: &str,
        service_time: DateTime<Utc>,
        duration_hours: u32,
    ) -> Result<ServiceRequest> {
        validate_non_empty_string("client_id", client_id).map_err(as_input_error)?;
        validate_range(
            "duration_hours",
            duration_hours,
            1,
            self.settings.max_duration_hours,
        )
        .map_err(as_input_error)?;

        let request = self
            .store
            .insert_request(NewServiceRequest {
                client_id: client_id.trim().to_string(),
                service_time,
                duration_hours,
            })
            .await?;

        tracing::info!(
            "Created request {} for client {} at {} ({}h)",
            request.id,
            request.client_id,
            request.service_time,
            request.duration_hours
        );
        Ok(request)
    }

    /// Binds one free guard to a pending request.
    ///
    /// Fails with `NotFound`, `InvalidState` (already assigned or completed) or
    /// `NoResourceAvailable`. On any failure nothing has been written.
    pub async fn assign_resource(&self, request_id: RequestId) -> Result<Binding> {
        let session = self.pool.session().await;

        let request = session.store().get_request(request_id).await?;
        if request.state != RequestState::Pending {
            tracing::warn!(
                "Rejected assignment for {}: request is {}",
                request_id,
                request.state
            );
            return Err(DispatchError::invalid_state(
                "request",
                request_id.get(),
                request.state,
                "already assigned or completed",
            ));
        }

        let Some(guard) = session.next_free().await? else {
            tracing::warn!("No guard available for {}, request stays pending", request_id);
            return Err(DispatchError::NoResourceAvailable);
        };
        tracing::debug!("Selected guard {} for {}", guard.id, request_id);

        let binding = session.commit_to(request_id, &guard).await?;
        tracing::info!(
            "Assigned guard {} ({}) to request {} as binding {}",
            guard.id,
            guard.label,
            request_id,
            binding.id
        );
        Ok(binding)
    }

    /// Applies the external completion signal to an assigned request.
    pub async fn complete_request(&self, request_id: RequestId) -> Result<ServiceRequest> {
        let session = self.pool.session().await;

        let request = session.store().get_request(request_id).await?;
        if !request.state.can_transition_to(RequestState::Completed) {
            return Err(DispatchError::invalid_state(
                "request",
                request_id.get(),
                request.state,
                "only assigned requests can be completed",
            ));
        }

        let release = if self.settings.release_on_completion {
            // 只會有一筆，assign 保證
            session
                .store()
                .bindings_for_request(request_id)
                .await?
                .into_iter()
                .max_by_key(|b| b.id)
                .map(|b| b.guard_id)
        } else {
            None
        };

        session.complete(request_id, release).await?;
        match release {
            Some(guard_id) => tracing::info!(
                "Completed request {}, released guard {}",
                request_id,
                guard_id
            ),
            None => tracing::info!("Completed request {}", request_id),
        }

        Ok(ServiceRequest {
            state: RequestState::Completed,
            ..request
        })
    }

    pub async fn get_request(&self, request_id: RequestId) -> Result<ServiceRequest> {
        self.store.get_request(request_id).await
    }

    pub async fn list_requests(&self, filter: Option<RequestState>) -> Result<Vec<ServiceRequest>> {
        self.store.list_requests(filter).await
    }

    pub async fn list_bindings(&self) -> Result<Vec<Binding>> {
        self.store.list_bindings().await
    }
}
