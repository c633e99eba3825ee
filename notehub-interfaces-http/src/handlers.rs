pub mod note_handlers;
pub mod ops_handlers;

pub use note_handlers::*;
pub use ops_handlers::*;
