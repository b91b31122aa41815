pub mod errors;
pub mod service;

pub use errors::{AppError, AppResult};
pub use service::App;
