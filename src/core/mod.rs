pub mod engine;
pub mod pool;

pub use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, PoolStats, RequestId, RequestState, ServiceRequest,
};
pub use crate::domain::ports::DispatchStore;
pub use crate::utils::error::Result;
