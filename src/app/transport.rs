//! Transport interface and default HTTP implementation
//!
//! A transport performs exactly one download attempt per call; retry policy
//! lives in [`ResilientTransfer`](crate::app::transfer::ResilientTransfer).
//! The bundled [`HttpTransport`] fetches artifacts over HTTP and writes them
//! with the atomic temp-file + rename pattern.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::constants::http;

/// Runtime configuration of the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-attempt request timeout
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Directory artifacts are written into
    pub destination_root: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            request_timeout: http::REQUEST_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            destination_root: PathBuf::from("."),
        }
    }
}

/// One logical transfer: a fetchable URL plus the destination filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// URL of the artifact to fetch
    pub url: Url,
    /// Destination filename, already formatted and filesystem-safe
    pub destination_name: String,
}

/// Outcome of a single transport attempt
///
/// Exactly one terminal signal per attempt; intermediate progress is not
/// surfaced to the retry layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The attempt reached a success-equivalent completion status
    Completed { status: u16 },
    /// The attempt failed; eligible for retry
    Failed { cause: String },
    /// The attempt was aborted; terminal, never retried
    Aborted,
    /// The attempt timed out; terminal, never retried
    TimedOut,
}

/// Performs a single download attempt for a request
///
/// At most one attempt is outstanding per request at a time; the engine
/// serializes all calls by construction.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one attempt and report its terminal signal
    async fn attempt(&self, request: &TransferRequest) -> TransportSignal;
}

/// HTTP-backed transport writing artifacts into a destination directory
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    destination_root: PathBuf,
}

impl HttpTransport {
    /// Create a transport saving artifacts under `destination_root`
    pub fn new(destination_root: impl Into<PathBuf>) -> Result<Self, reqwest::Error> {
        Self::with_config(HttpConfig {
            destination_root: destination_root.into(),
            ..HttpConfig::default()
        })
    }

    /// Create a transport from an explicit configuration
    pub fn with_config(config: HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            destination_root: config.destination_root,
        })
    }

    /// Destination directory artifacts are written into
    pub fn destination_root(&self) -> &PathBuf {
        &self.destination_root
    }

    async fn fetch_and_save(&self, request: &TransferRequest) -> Result<u16, TransportSignal> {
        let response = self
            .client
            .get(request.url.clone())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportSignal::Failed {
                cause: format!("server returned HTTP {}", status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(classify_request_error)?;

        tokio::fs::create_dir_all(&self.destination_root)
            .await
            .map_err(io_failure)?;

        let final_path = self.destination_root.join(&request.destination_name);
        let temp_path = self
            .destination_root
            .join(format!("{}{}", request.destination_name, http::TEMP_FILE_SUFFIX));

        let mut file = File::create(&temp_path).await.map_err(io_failure)?;
        file.write_all(&bytes).await.map_err(io_failure)?;
        file.flush().await.map_err(io_failure)?;
        drop(file);

        // Atomic move so an interrupted attempt never leaves a partial artifact
        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(io_failure)?;

        debug!(path = %final_path.display(), bytes = bytes.len(), "artifact saved");
        Ok(status.as_u16())
    }
}

fn classify_request_error(error: reqwest::Error) -> TransportSignal {
    if error.is_timeout() {
        TransportSignal::TimedOut
    } else {
        TransportSignal::Failed {
            cause: error.to_string(),
        }
    }
}

fn io_failure(error: std::io::Error) -> TransportSignal {
    TransportSignal::Failed {
        cause: format!("file I/O failed: {error}"),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn attempt(&self, request: &TransferRequest) -> TransportSignal {
        match self.fetch_and_save(request).await {
            Ok(status) => TransportSignal::Completed { status },
            Err(signal) => signal,
        }
    }
}
