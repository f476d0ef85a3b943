use crate::adapters::tables::Tables;
use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, NewServiceRequest, RequestId, RequestState,
    ServiceRequest, Transition,
};
use crate::domain::ports::DispatchStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lock-guarded in-memory store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn get_request(&self, id: RequestId) -> Result<ServiceRequest> {
        self.tables.lock().await.get_request(id)
    }

    async fn insert_request(&self, request: NewServiceRequest) -> Result<ServiceRequest> {
        Ok(self.tables.lock().await.insert_request(request))
    }

    async fn save_request(&self, request: &ServiceRequest) -> Result<()> {
        self.tables.lock().await.save_request(request)
    }

    async fn list_requests(&self, filter: Option<RequestState>) -> Result<Vec<ServiceRequest>> {
        Ok(self.tables.lock().await.list_requests(filter))
    }

    async fn get_guard(&self, id: GuardId) -> Result<Guard> {
        self.tables.lock().await.get_guard(id)
    }

    async fn insert_guard(&self, label: &str) -> Result<Guard> {
        Ok(self.tables.lock().await.insert_guard(label))
    }

    async fn save_guard(&self, guard: &Guard) -> Result<()> {
        self.tables.lock().await.save_guard(guard);
        Ok(())
    }

    async fn list_guards(&self, filter: Option<GuardStatus>) -> Result<Vec<Guard>> {
        Ok(self.tables.lock().await.list_guards(filter))
    }

    async fn create_binding(&self, request_id: RequestId, guard_id: GuardId) -> Result<Binding> {
        self.tables.lock().await.create_binding(request_id, guard_id)
    }

    async fn list_bindings(&self) -> Result<Vec<Binding>> {
        Ok(self.tables.lock().await.list_bindings())
    }

    async fn bindings_for_request(&self, request_id: RequestId) -> Result<Vec<Binding>> {
        Ok(self.tables.lock().await.bindings_for_request(request_id))
    }

    async fn commit(&self, transition: Transition) -> Result<Option<Binding>> {
        self.tables.lock().await.apply(transition)
    }
}
