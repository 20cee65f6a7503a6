pub mod error;

pub use error::{MigrateError, Result};
