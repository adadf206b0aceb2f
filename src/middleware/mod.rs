pub mod identity;
pub mod response;

pub use identity::{identity_middleware, CallerIdentity};
pub use response::{ApiResponse, ApiResult};
