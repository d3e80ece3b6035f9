pub mod auth;
pub mod gate;
pub mod response;

pub use auth::identity_middleware;
pub use gate::access_gate_middleware;
pub use response::{ApiResponse, ApiResult};
