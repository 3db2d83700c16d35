pub mod bootstrap;
pub mod http;

pub use bootstrap::*;
pub use http::*;
