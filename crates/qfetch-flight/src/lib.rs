//! Arrow Flight access to the remote analytical query engine
//!
//! Implements the [`qfetch_core::Connector`] boundary over gRPC/Flight,
//! with a direct-engine variant and a managed-platform gateway variant
//! selected by an explicit [`DeploymentMode`].

pub mod client;
pub mod config;
pub mod error;

pub use client::{connect, FlightConnector, GatewayConnector, LazyConnector};
pub use config::{ConnectorConfig, Credentials, DeploymentMode, ENV_TOKEN, ENV_USER};
pub use error::FlightError;
