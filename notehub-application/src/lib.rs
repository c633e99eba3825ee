// NoteHub Application Layer

pub mod commands;
pub mod error;
pub mod hub;
pub mod metrics;
pub mod queries;
pub mod state;

pub use error::{AppError, HubError};
pub use hub::Hub;
pub use metrics::Metrics;
pub use state::AppState;
