// Domain entities
pub mod notification;
pub mod runtime_config;

pub use notification::*;
pub use runtime_config::*;
