mod cents;
mod secret;

pub mod helpers;
pub mod op;

pub use cents::{Cents, CentsConversionError};
pub use secret::Secret;
