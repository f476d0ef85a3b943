//! Typed command surface for callers above the engine (CLI, RPC, HTTP).

use crate::core::engine::{AssignmentEngine, EngineSettings};
use crate::core::pool::ResourcePool;
use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, PoolStats, RequestId, RequestState, ServiceRequest,
};
use crate::domain::ports::DispatchStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ProvisionGuard {
        label: String,
    },
    CreateRequest {
        client_id: String,
        service_time: DateTime<Utc>,
        duration_hours: u32,
    },
    AssignResource {
        request_id: RequestId,
    },
    CompleteRequest {
        request_id: RequestId,
    },
    ReleaseGuard {
        guard_id: GuardId,
    },
    ListGuards {
        #[serde(default)]
        status: Option<GuardStatus>,
    },
    ListRequests {
        #[serde(default)]
        state: Option<RequestState>,
    },
    ListBindings,
    PoolStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CommandOutput {
    Guard(Guard),
    Request(ServiceRequest),
    Binding(Binding),
    Guards(Vec<Guard>),
    Requests(Vec<ServiceRequest>),
    Bindings(Vec<Binding>),
    PoolStatus(PoolStats),
}

/// Wires a store into a pool and an engine and routes commands to them.
pub struct Dispatcher<S: DispatchStore> {
    store: Arc<S>,
    pool: Arc<ResourcePool<S>>,
    engine: AssignmentEngine<S>,
}

impl<S: DispatchStore> Dispatcher<S> {
    pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
        let pool = Arc::new(ResourcePool::new(store.clone()));
        let engine = AssignmentEngine::new(store.clone(), pool.clone(), settings);
        Self {
            store,
            pool,
            engine,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pool(&self) -> &ResourcePool<S> {
        &self.pool
    }

    pub fn engine(&self) -> &AssignmentEngine<S> {
        &self.engine
    }

    /// Provisions `labels` when the pool is still empty. Returns how many were added.
    pub async fn seed_guards(&self, labels: &[String]) -> Result<usize> {
        if labels.is_empty() {
            return Ok(0);
        }

        let session = self.pool.session().await;
        if !session.store().list_guards(None).await?.is_empty() {
            return Ok(0);
        }
        for label in labels {
            session.provision(label).await?;
        }
        tracing::info!("Seeded pool with {} guards", labels.len());
        Ok(labels.len())
    }

    pub async fn handle(&self, command: Command) -> Result<CommandOutput> {
        tracing::debug!("Handling command: {:?}", command);

        let output = match command {
            Command::ProvisionGuard { label } => {
                CommandOutput::Guard(self.pool.provision(&label).await?)
            }
            Command::CreateRequest {
                client_id,
                service_time,
                duration_hours,
            } => CommandOutput::Request(
                self.engine
                    .create_request(&client_id, service_time, duration_hours)
                    .await?,
            ),
            Command::AssignResource { request_id } => {
                CommandOutput::Binding(self.engine.assign_resource(request_id).await?)
            }
            Command::CompleteRequest { request_id } => {
                CommandOutput::Request(self.engine.complete_request(request_id).await?)
            }
            Command::ReleaseGuard { guard_id } => {
                CommandOutput::Guard(self.pool.release(guard_id).await?)
            }
            Command::ListGuards { status } => CommandOutput::Guards(self.pool.list(status).await?),
            Command::ListRequests { state } => {
                CommandOutput::Requests(self.engine.list_requests(state).await?)
            }
            Command::ListBindings => CommandOutput::Bindings(self.engine.list_bindings().await?),
            Command::PoolStatus => CommandOutput::PoolStatus(self.pool.stats().await?),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let command: Command =
            serde_json::from_str(r#"{"command":"assign_resource","request_id":3}"#).unwrap();
        assert_eq!(
            command,
            Command::AssignResource {
                request_id: RequestId(3)
            }
        );

        let listing: Command = serde_json::from_str(r#"{"command":"list_guards"}"#).unwrap();
        assert_eq!(listing, Command::ListGuards { status: None });
    }

    #[test]
    fn test_output_json_shape() {
        let output = CommandOutput::PoolStatus(PoolStats {
            total: 2,
            free: 1,
            committed: 1,
        });
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "pool_status");
        assert_eq!(json["data"]["committed"], 1);
    }
}
