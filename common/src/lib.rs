pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod store;
pub mod utils;

pub use self::config::*;
pub use self::credential::*;
pub use self::error::*;
pub use self::store::*;
pub use self::utils::*;
