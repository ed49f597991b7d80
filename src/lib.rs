pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use error::{ErrorKind, EstateError};
