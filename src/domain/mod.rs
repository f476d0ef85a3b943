// Domain layer: entities and the data-access port. No knowledge of storage backends.

pub mod model;
pub mod ports;
