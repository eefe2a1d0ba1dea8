//! Remote data sources
//!
//! - `BootstrapSource`: initial data used only when no snapshot exists
//! - `RemoteMirror`: best-effort POST of the full export after each save
//!
//! Neither is required. A missing bootstrap document is "no data", and a
//! failed mirror push is logged and reported as an event, never surfaced
//! to the mutation that triggered it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::events::{EventSink, StoreEvent};

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

const USER_AGENT: &str = concat!("enchant/", env!("CARGO_PKG_VERSION"));

/// Errors from fetching bootstrap data
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors from pushing to the remote mirror
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{url}' answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Where initial data comes from when no snapshot exists yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapSource {
    /// `GET {base_url}/{name}.json`
    Remote { base_url: String, name: String },
    /// A local JSON file
    File(PathBuf),
}

impl BootstrapSource {
    pub fn remote(base_url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Remote {
            base_url: base_url.into(),
            name: name.into(),
        }
    }

    /// URL or path, for logs and status output
    pub fn location(&self) -> String {
        match self {
            Self::Remote { base_url, name } => {
                format!("{}/{}.json", base_url.trim_end_matches('/'), name)
            }
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Fetch the raw document text
    ///
    /// Returns `Ok(None)` for a non-OK response or a missing file: there is
    /// simply no bootstrap data. Transport and read failures are errors.
    pub async fn fetch(&self) -> Result<Option<String>, FetchError> {
        match self {
            Self::Remote { .. } => {
                let url = self.location();
                fetch_url(&url)
                    .await
                    .map_err(|source| FetchError::Transport { url, source })
            }
            Self::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(FetchError::Read {
                    path: path.clone(),
                    source,
                }),
            },
        }
    }
}

async fn fetch_url(url: &str) -> Result<Option<String>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT))
        .user_agent(USER_AGENT)
        .build()?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        debug!("Bootstrap source {} answered {}", url, response.status());
        return Ok(None);
    }

    Ok(Some(response.text().await?))
}

/// Opportunistic copy of the collection on a remote endpoint
#[derive(Debug, Clone)]
pub struct RemoteMirror {
    url: String,
    client: reqwest::Client,
}

impl RemoteMirror {
    pub fn new(url: impl Into<String>) -> Result<Self, MirrorError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(MirrorError::Client)?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the export body and wait for the answer
    pub async fn push(&self, body: String) -> Result<(), MirrorError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| MirrorError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Push in the background; the outcome goes to the log and `events`
    ///
    /// Outside a tokio runtime the push is skipped.
    pub(crate) fn spawn_push(&self, body: String, events: EventSink) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No async runtime, skipping remote sync to {}", self.url);
                return;
            }
        };

        let mirror = self.clone();
        handle.spawn(async move {
            let url = mirror.url.clone();
            match mirror.push(body).await {
                Ok(()) => {
                    debug!("Synced enchantments to {}", url);
                    events.emit(StoreEvent::Synced { url });
                }
                Err(e) => {
                    debug!("Remote sync unavailable, data kept locally only: {}", e);
                    events.emit(StoreEvent::SyncFailed {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        });
    }
}
