pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod ws;

pub use error::*;
pub use handlers::*;
pub use middleware::*;
pub use routes::*;
pub use ws::*;
