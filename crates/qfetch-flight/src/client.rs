//! Arrow Flight connectors for remote query execution
//!
//! Two variants of the same capability: [`FlightConnector`] talks to the
//! engine directly with basic credentials, [`GatewayConnector`] goes
//! through the managed platform's gateway with a bearer token. Both
//! resolve a query to a ticket via `get_flight_info` and stream the
//! result batches back over `do_get`.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::FlightDescriptor;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::TryStreamExt;
use qfetch_core::{Connector, ConnectorError};
use tokio::sync::OnceCell;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;
use tonic::Request;
use tracing::{debug, info};

use crate::config::{ConnectorConfig, Credentials, DeploymentMode};
use crate::error::FlightError;

/// An authenticated Flight channel. Tonic clients are cheap to clone, so
/// each call clones the client instead of holding a mutable borrow.
struct FlightSession {
    client: FlightServiceClient<Channel>,
    authorization: MetadataValue<Ascii>,
    endpoint: String,
}

impl FlightSession {
    async fn connect(endpoint: String, authorization: MetadataValue<Ascii>) -> Result<Self, FlightError> {
        info!(endpoint = %endpoint, "connecting to query engine");

        let channel = Channel::from_shared(endpoint.clone())
            .map_err(|e| FlightError::InvalidEndpoint(e.to_string()))?
            .connect()
            .await?;

        Ok(Self {
            client: FlightServiceClient::new(channel),
            authorization,
            endpoint,
        })
    }

    fn authed<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert("authorization", self.authorization.clone());
        request
    }

    /// Execute a SQL query and collect all result batches.
    async fn execute_sql(&self, sql: &str) -> Result<Vec<RecordBatch>, FlightError> {
        debug!(endpoint = %self.endpoint, "executing query");

        let mut client = self.client.clone();

        // Resolve the query to a ticket, then stream the results.
        let descriptor = FlightDescriptor::new_cmd(sql.to_string());
        let info = client.get_flight_info(self.authed(descriptor)).await?.into_inner();

        let endpoint = info
            .endpoint
            .into_iter()
            .next()
            .ok_or_else(|| FlightError::InvalidResponse("no endpoints in flight info".to_string()))?;
        let ticket = endpoint
            .ticket
            .ok_or_else(|| FlightError::InvalidResponse("endpoint carries no ticket".to_string()))?;

        let stream = client.do_get(self.authed(ticket)).await?.into_inner();
        let mapped = stream.map_err(arrow_flight::error::FlightError::Tonic);
        let batches: Vec<RecordBatch> = FlightRecordBatchStream::new_from_flight_data(mapped)
            .try_collect()
            .await?;

        debug!(batches = batches.len(), "received result batches");
        Ok(batches)
    }
}

fn header_value(header: String) -> Result<MetadataValue<Ascii>, FlightError> {
    header
        .parse()
        .map_err(|_| FlightError::Auth("credential contains non-ASCII characters".to_string()))
}

fn basic_authorization(credentials: &Credentials) -> Result<MetadataValue<Ascii>, FlightError> {
    let pair = format!("{}:{}", credentials.user, credentials.token);
    header_value(format!("Basic {}", BASE64.encode(pair)))
}

fn bearer_authorization(token: &str) -> Result<MetadataValue<Ascii>, FlightError> {
    header_value(format!("Bearer {token}"))
}

/// Connector for direct engine access with basic credentials.
pub struct FlightConnector {
    session: FlightSession,
}

impl FlightConnector {
    /// Connect to the engine described by `config`.
    pub async fn connect(
        config: &ConnectorConfig,
        credentials: &Credentials,
    ) -> Result<Self, FlightError> {
        let authorization = basic_authorization(credentials)?;
        let session = FlightSession::connect(config.endpoint_url(), authorization).await?;
        Ok(Self { session })
    }

    /// The endpoint URL this connector talks to.
    pub fn endpoint(&self) -> &str {
        &self.session.endpoint
    }
}

#[async_trait]
impl Connector for FlightConnector {
    async fn execute(&self, query: &str) -> Result<Vec<RecordBatch>, ConnectorError> {
        self.session
            .execute_sql(query)
            .await
            .map_err(ConnectorError::from)
    }
}

/// Connector for managed-platform execution through the platform gateway.
/// The platform hands out a bearer token; no username is involved.
pub struct GatewayConnector {
    session: FlightSession,
}

impl GatewayConnector {
    pub async fn connect(config: &ConnectorConfig, token: &str) -> Result<Self, FlightError> {
        let authorization = bearer_authorization(token)?;
        let session = FlightSession::connect(config.endpoint_url(), authorization).await?;
        Ok(Self { session })
    }

    pub fn endpoint(&self) -> &str {
        &self.session.endpoint
    }
}

#[async_trait]
impl Connector for GatewayConnector {
    async fn execute(&self, query: &str) -> Result<Vec<RecordBatch>, ConnectorError> {
        self.session
            .execute_sql(query)
            .await
            .map_err(ConnectorError::from)
    }
}

/// Build the connector for the given deployment mode.
pub async fn connect(
    mode: DeploymentMode,
    config: &ConnectorConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn Connector>, FlightError> {
    match mode {
        DeploymentMode::Local => Ok(Arc::new(FlightConnector::connect(config, credentials).await?)),
        DeploymentMode::Platform => {
            Ok(Arc::new(GatewayConnector::connect(config, &credentials.token).await?))
        }
    }
}

/// Connector that defers the session to the first live fetch.
///
/// A caller served entirely from cache never opens a network connection.
/// The session is established once and reused afterwards.
pub struct LazyConnector {
    mode: DeploymentMode,
    config: ConnectorConfig,
    credentials: Credentials,
    inner: OnceCell<Arc<dyn Connector>>,
}

impl LazyConnector {
    pub fn new(mode: DeploymentMode, config: ConnectorConfig, credentials: Credentials) -> Self {
        Self {
            mode,
            config,
            credentials,
            inner: OnceCell::new(),
        }
    }
}

#[async_trait]
impl Connector for LazyConnector {
    async fn execute(&self, query: &str) -> Result<Vec<RecordBatch>, ConnectorError> {
        let connector = self
            .inner
            .get_or_try_init(|| async {
                connect(self.mode, &self.config, &self.credentials)
                    .await
                    .map_err(ConnectorError::from)
            })
            .await?;
        connector.execute(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_authorization_encoding() {
        let credentials = Credentials::new("alice", "t0ken");
        let value = basic_authorization(&credentials).unwrap();
        // base64("alice:t0ken")
        assert_eq!(value.to_str().unwrap(), "Basic YWxpY2U6dDBrZW4=");
    }

    #[test]
    fn test_bearer_authorization() {
        let value = bearer_authorization("abc123").unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc123");
    }

    #[test]
    fn test_non_ascii_token_is_rejected() {
        let credentials = Credentials::new("alice", "tøken");
        // Base64 output is always ASCII, so basic auth tolerates this;
        // a raw bearer header does not.
        assert!(basic_authorization(&credentials).is_ok());
        assert!(bearer_authorization("tøken").is_err());
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let config = ConnectorConfig::new("localhost:not-a-port", 0);
        let credentials = Credentials::new("u", "t");
        let result = FlightConnector::connect(&config, &credentials).await;
        assert!(result.is_err());
    }
}
