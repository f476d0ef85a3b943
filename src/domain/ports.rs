use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, NewServiceRequest, RequestId, RequestState,
    ServiceRequest, Transition,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Data-access contract the pool and engine persist through.
///
/// Single-entity reads and writes are atomic individually. Anything spanning
/// more than one entity goes through [`DispatchStore::commit`].
#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn get_request(&self, id: RequestId) -> Result<ServiceRequest>;
    async fn insert_request(&self, request: NewServiceRequest) -> Result<ServiceRequest>;
    async fn save_request(&self, request: &ServiceRequest) -> Result<()>;
    async fn list_requests(&self, filter: Option<RequestState>) -> Result<Vec<ServiceRequest>>;

    async fn get_guard(&self, id: GuardId) -> Result<Guard>;
    async fn insert_guard(&self, label: &str) -> Result<Guard>;
    async fn save_guard(&self, guard: &Guard) -> Result<()>;
    /// Ordered by identity, lowest first.
    async fn list_guards(&self, filter: Option<GuardStatus>) -> Result<Vec<Guard>>;

    async fn create_binding(&self, request_id: RequestId, guard_id: GuardId) -> Result<Binding>;
    async fn list_bindings(&self) -> Result<Vec<Binding>>;
    async fn bindings_for_request(&self, request_id: RequestId) -> Result<Vec<Binding>>;

    /// Applies every write of `transition` or none of them. Returns the new
    /// binding for [`Transition::Assign`].
    async fn commit(&self, transition: Transition) -> Result<Option<Binding>>;
}
