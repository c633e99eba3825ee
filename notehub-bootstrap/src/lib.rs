pub mod context;
pub mod lifecycle;
pub mod logging;

pub use context::AppContext;
pub use lifecycle::{run_context, run_standalone, serve_on};
pub use logging::init_tracing;

pub async fn run() -> anyhow::Result<()> {
    run_standalone().await
}
