pub mod collection;
pub mod filter;
pub mod identity;

pub use collection::*;
pub use filter::*;
pub use identity::*;
