pub mod connection;
pub mod error;
pub mod frame;
pub mod types;

pub use connection::Connection;
pub use error::{Result, SimError};
