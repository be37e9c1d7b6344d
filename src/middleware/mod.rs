pub mod auth;
pub mod response;

pub use auth::{optional_auth, require_auth, require_verified_email};
pub use response::{ApiResponse, ApiResult};
