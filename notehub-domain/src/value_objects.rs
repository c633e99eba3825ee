// Domain value objects
pub mod identifiers;
pub mod notification_kind;

pub use identifiers::*;
pub use notification_kind::*;
