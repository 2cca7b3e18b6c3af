pub mod connector;
pub mod error;
pub mod result;

pub use connector::Connector;
pub use error::{ConnectorError, QueryError, Result};
