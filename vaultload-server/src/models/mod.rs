//! Request and response models

pub mod common;
pub mod operations;

pub use common::{HealthResponse, RespWrapper};
pub use operations::{Operation, RunRequest};
