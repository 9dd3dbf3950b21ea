pub mod path;
pub mod query_filter;
pub mod route_resolver;

pub use path::*;
pub use query_filter::*;
pub use route_resolver::*;
