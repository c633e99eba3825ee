// Port traits the hub consumes
// Implemented by infrastructure (store), interfaces (transport) and application (metrics)

pub mod metrics;
pub mod store;
pub mod transport;

pub use metrics::*;
pub use store::*;
pub use transport::*;
