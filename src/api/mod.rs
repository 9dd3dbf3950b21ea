pub mod auth;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;

pub use auth::*;
pub use error::*;
pub use handlers::*;
pub use registry::*;
pub use routes::*;
