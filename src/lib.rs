pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{BillingError, Operation, PersistenceError, RemoteError, ValidationError};
pub use services::state::{Billing, Committed, MirrorStatus};
