use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::content::Content;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no content id given")]
    MissingId,
    #[error("invalid content id: {0:?}")]
    InvalidId(String),
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("content service returned no data")]
    Empty,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed content: {0}")]
    Malformed(String),
}

/// What the "content unavailable" screen offers next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    BackToList,
}

impl Recovery {
    pub fn label(self) -> &'static str {
        match self {
            Recovery::BackToList => "Back to the list",
        }
    }
}

impl FetchError {
    /// Every failure is recovered the same way; nothing is retried.
    pub fn recovery(&self) -> Recovery {
        Recovery::BackToList
    }

    /// Text for the "content unavailable" screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::MissingId | FetchError::InvalidId(_) => "No content id was given.",
            FetchError::NotFound(_) => "Content not found.",
            FetchError::Empty => "The content data could not be loaded.",
            FetchError::Network(_) | FetchError::Malformed(_) => {
                "An error occurred while loading the content."
            }
        }
    }
}

/// The single "get content by id" boundary.
pub trait ContentSource {
    fn get_content(&self, id: &str) -> impl Future<Output = Result<Content, FetchError>> + Send;
}

/// Ids end up in URLs and file names, so only plain tokens pass.
pub fn validate_id(id: &str) -> Result<&str, FetchError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(FetchError::MissingId);
    }
    if id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(id)
    } else {
        Err(FetchError::InvalidId(id.to_string()))
    }
}

/// Decode a service payload. Accepts the bare content object or one wrapped
/// in `{ "data": … }`.
pub fn decode_content(body: &str) -> Result<Content, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") && !map.contains_key("id") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    if value.is_null() {
        return Err(FetchError::Empty);
    }
    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

// ── HTTP ──

pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn content_url(&self, id: &str) -> String {
        format!("{}/contents/{}/", self.base_url, id)
    }
}

fn check_status(status: StatusCode, id: &str) -> Result<(), FetchError> {
    if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound(id.to_string()))
    } else if !status.is_success() {
        Err(FetchError::Network(format!("HTTP {status}")))
    } else {
        Ok(())
    }
}

impl ContentSource for HttpContentSource {
    async fn get_content(&self, id: &str) -> Result<Content, FetchError> {
        let id = validate_id(id)?;
        let url = self.content_url(id);
        let t0 = Instant::now();
        info!(%url, "fetching content");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        check_status(resp.status(), id)?;
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let content = decode_content(&body)?;
        info!(id, latency_ms = t0.elapsed().as_millis() as u64, "content fetched");
        Ok(content)
    }
}

// ── Local exports ──

/// Reads `{dir}/{id}.json`, the format the service returns.
pub struct FileContentSource {
    dir: PathBuf,
}

impl FileContentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl ContentSource for FileContentSource {
    async fn get_content(&self, id: &str) -> Result<Content, FetchError> {
        let id = validate_id(id)?;
        let path = self.path_for(id);
        info!(path = %path.display(), "reading content");
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => decode_content(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(id.to_string()))
            }
            Err(e) => Err(FetchError::Network(e.to_string())),
        }
    }
}

/// Read a content file synchronously (batch rendering).
pub fn read_content_file(path: &Path) -> Result<Content, FetchError> {
    let body = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FetchError::NotFound(path.display().to_string()),
        _ => FetchError::Network(e.to_string()),
    })?;
    decode_content(&body)
}

// ── Loader ──

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Pending,
    Loaded(Content),
    Failed(FetchError),
}

/// Wraps a source: one in-flight fetch per id, no retries, errors passed
/// through unchanged.
pub struct ContentLoader<S> {
    source: S,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    states: Mutex<HashMap<String, FetchState>>,
}

impl<S: ContentSource> ContentLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            gates: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Last observed state for `id`, if it was ever requested.
    pub fn state(&self, id: &str) -> Option<FetchState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Fetch `id`. A concurrent call for the same id waits for the running
    /// one to settle before issuing its own request.
    pub async fn load(&self, id: &str) -> FetchState {
        let key = id.trim().to_string();
        if key.is_empty() {
            return FetchState::Failed(FetchError::MissingId);
        }

        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(gates.entry(key.clone()).or_default())
        };
        let in_flight = gate.lock().await;

        self.set_state(&key, FetchState::Pending);
        let state = match self.source.get_content(&key).await {
            Ok(content) => FetchState::Loaded(content),
            Err(e) => {
                warn!(id = %key, error = %e, "content load failed");
                FetchState::Failed(e)
            }
        };
        self.set_state(&key, state.clone());
        drop(in_flight);
        self.release_gate(&key, gate);
        state
    }

    /// Forget the gate for `id` once no other caller holds or waits on it.
    fn release_gate(&self, id: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = gates
            .get(id)
            .is_some_and(|g| Arc::ptr_eq(g, &gate) && Arc::strong_count(&gate) == 2);
        if idle {
            gates.remove(id);
        }
    }

    #[cfg(test)]
    fn open_gates(&self) -> usize {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn set_state(&self, id: &str, state: FetchState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), state);
    }
}

// ── Tests ──
