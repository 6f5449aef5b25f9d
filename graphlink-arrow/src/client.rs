//! Authenticated Arrow Flight connection
//!
//! Wraps `arrow_flight::FlightClient` with the envelope, authentication, and
//! retry conventions of the GDS Arrow endpoint: versioned action names,
//! `GET_COMMAND`/`PUT_COMMAND` payload envelopes, basic-auth handshake
//! exchanged for a cached bearer token, and backoff on transient transport
//! failures.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow_flight::error::FlightError;
use arrow_flight::{Action, FlightClient, Ticket};
use base64::prelude::{Engine, BASE64_STANDARD};
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

use graphlink_core::error::{ClientError, Result};
use graphlink_core::retry::{retry_with_backoff, RetryPolicy};

use crate::auth::TokenStore;

const DEFAULT_PORT: u16 = 8491;
const USER_AGENT_HEADER: &str = "x-gds-user-agent";
const DEFAULT_USER_AGENT: &str = concat!("graphlink-v", env!("CARGO_PKG_VERSION"));

/// Version prefix of the v1 action and envelope surface.
const ENDPOINT_VERSION: &str = "v1";

#[derive(Debug, Clone)]
pub struct FlightConnectOptions {
    pub host: String,
    pub port: u16,
    /// Use TLS for the channel
    pub encrypted: bool,
    /// PEM-encoded root certificates for the TLS connection
    pub tls_root_certs: Option<Vec<u8>>,
    /// Username and password for the basic-auth handshake
    pub auth: Option<(String, String)>,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for FlightConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            encrypted: false,
            tls_root_certs: None,
            auth: None,
            user_agent: None,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct FlightConnection {
    client: Arc<Mutex<FlightClient>>,
    options: FlightConnectOptions,
    token: TokenStore,
}

impl FlightConnection {
    pub async fn connect(options: FlightConnectOptions) -> Result<Self> {
        let channel = build_channel(&options).await?;
        let mut client = FlightClient::new(channel);

        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        set_header(&mut client, USER_AGENT_HEADER, &user_agent)?;

        let connection = Self {
            client: Arc::new(Mutex::new(client)),
            options,
            token: TokenStore::new(),
        };

        if connection.options.auth.is_some() {
            connection.authenticate().await?;
        }

        Ok(connection)
    }

    pub fn connection_info(&self) -> (&str, u16) {
        (&self.options.host, self.options.port)
    }

    /// Exchanges the credentials for a bearer token via the Flight
    /// handshake and installs it on the channel metadata.
    async fn authenticate(&self) -> Result<()> {
        let Some((user, password)) = &self.options.auth else {
            return Ok(());
        };
        let basic = BASE64_STANDARD.encode(format!("{user}:{password}"));

        let token = retry_with_backoff(&self.options.retry, "handshake", || async {
            let mut client = self.client.lock().await;
            set_header(&mut client, "authorization", &format!("Basic {basic}"))?;
            let response = client
                .handshake(Bytes::new())
                .await
                .map_err(map_flight_error)?;
            String::from_utf8(response.to_vec())
                .map_err(|_| ClientError::Authentication("server returned a malformed token".to_string()))
        })
        .await?;

        self.token.set(token.clone());
        let mut client = self.client.lock().await;
        set_header(&mut client, "authorization", &format!("Bearer {token}"))?;
        Ok(())
    }

    /// Re-runs the handshake when the cached token has aged out.
    async fn ensure_authenticated(&self) -> Result<()> {
        if self.options.auth.is_some() && self.token.get().is_none() {
            self.authenticate().await?;
        }
        Ok(())
    }

    /// The action name with the endpoint-version prefix, e.g.
    /// `v1/CREATE_GRAPH`.
    pub fn versioned_action(&self, action_type: &str) -> String {
        if action_type.contains('/') {
            action_type.to_string()
        } else {
            format!("{ENDPOINT_VERSION}/{action_type}")
        }
    }

    /// Runs a Flight action with a JSON body and returns the single JSON
    /// result the server answers with.
    pub async fn do_action_json(&self, action_type: &str, body: &Value) -> Result<Value> {
        self.ensure_authenticated().await?;

        let action_type = self.versioned_action(action_type);
        let payload = Bytes::from(serde_json::to_vec(body)?);

        retry_with_backoff(&self.options.retry, &action_type, || {
            let action = Action::new(action_type.clone(), payload.clone());
            async move {
                debug!("Sending action `{}`", action.r#type);
                let mut client = self.client.lock().await;
                let results: Vec<Bytes> = client
                    .do_action(action)
                    .await
                    .map_err(map_flight_error)?
                    .try_collect()
                    .await
                    .map_err(map_flight_error)?;

                // exactly one result sanity check, mirroring the server contract
                match results.as_slice() {
                    [single] => Ok(serde_json::from_slice(single)?),
                    other => Err(ClientError::Flight(format!(
                        "expected exactly one action result, got {}",
                        other.len()
                    ))),
                }
            }
        })
        .await
    }

    /// Fetches the record batches behind a `GET_COMMAND`-enveloped ticket.
    pub async fn do_get_batches(&self, payload: &Value) -> Result<Vec<RecordBatch>> {
        self.ensure_authenticated().await?;

        let envelope = get_command_envelope(payload);
        let ticket_bytes = Bytes::from(serde_json::to_vec(&envelope)?);

        retry_with_backoff(&self.options.retry, "do_get", || {
            let ticket = Ticket::new(ticket_bytes.clone());
            async move {
                let mut client = self.client.lock().await;
                let stream = client.do_get(ticket).await.map_err(map_flight_error)?;
                stream
                    .try_collect::<Vec<RecordBatch>>()
                    .await
                    .map_err(map_flight_error)
            }
        })
        .await
    }

    pub(crate) fn raw_client(&self) -> Arc<Mutex<FlightClient>> {
        Arc::clone(&self.client)
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.options.retry
    }
}

async fn build_channel(options: &FlightConnectOptions) -> Result<Channel> {
    let scheme = if options.encrypted { "https" } else { "http" };
    let uri = format!("{scheme}://{}:{}", options.host, options.port);

    let mut endpoint =
        Endpoint::from_shared(uri).map_err(|e| ClientError::Config(e.to_string()))?;

    if options.encrypted {
        let mut tls = ClientTlsConfig::new().domain_name(options.host.clone());
        if let Some(certs) = &options.tls_root_certs {
            tls = tls.ca_certificate(Certificate::from_pem(certs.clone()));
        }
        endpoint = endpoint
            .tls_config(tls)
            .map_err(|e| ClientError::Config(e.to_string()))?;
    }

    endpoint
        .connect()
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))
}

fn set_header(client: &mut FlightClient, key: &str, value: &str) -> Result<()> {
    let key: tonic::metadata::MetadataKey<_> = key
        .parse()
        .map_err(|_| ClientError::Config(format!("invalid header name `{key}`")))?;
    let value = value
        .parse()
        .map_err(|_| ClientError::Config(format!("invalid header value for `{key}`")))?;
    client.metadata_mut().insert(key, value);
    Ok(())
}

/// Wraps a download payload in the versioned `GET_COMMAND` envelope.
pub fn get_command_envelope(body: &Value) -> Value {
    serde_json::json!({
        "name": "GET_COMMAND",
        "version": ENDPOINT_VERSION,
        "body": body,
    })
}

/// Wraps an upload descriptor in the versioned `PUT_COMMAND` envelope.
pub fn put_command_envelope(body: &Value) -> Value {
    serde_json::json!({
        "name": "PUT_COMMAND",
        "version": ENDPOINT_VERSION,
        "body": body,
    })
}

pub(crate) fn map_flight_error(e: FlightError) -> ClientError {
    match e {
        FlightError::Tonic(status) => map_status(status),
        other => ClientError::Flight(clean_server_message(&other.to_string())),
    }
}

fn map_status(status: Status) -> ClientError {
    let message = clean_server_message(status.message());
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Internal => {
            ClientError::FlightUnavailable(message)
        }
        Code::Unauthenticated | Code::PermissionDenied => ClientError::Authentication(message),
        Code::NotFound => ClientError::NotFound(message),
        _ => ClientError::Flight(message),
    }
}

/// Strips the Flight/gRPC boilerplate the server wraps its error messages in.
pub fn clean_server_message(message: &str) -> String {
    const PREFIXES: [&str; 3] = [
        "Flight RPC failed with message: org.apache.arrow.flight.FlightRuntimeException: ",
        "Flight returned internal error, with message: org.apache.arrow.flight.FlightRuntimeException: ",
        "Failed to invoke procedure `gds.arrow.project`: Caused by: org.apache.arrow.flight.FlightRuntimeException: ",
    ];

    let mut cleaned = message.to_string();
    for prefix in PREFIXES {
        cleaned = cleaned.replace(prefix, "");
    }

    if let Some(idx) = cleaned.find("gRPC client debug context:") {
        cleaned.truncate(idx);
        let trimmed = cleaned.trim_end().trim_end_matches('.').trim_end();
        cleaned = trimmed.to_string();
    }

    cleaned
}
