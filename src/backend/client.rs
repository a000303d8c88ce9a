use std::path::Path;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::http;
use super::params::RunParams;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{endpoint} answered with HTTP status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    pub dataset_ref: String,
    pub params: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainAck {
    pub status: String,
}

/// One entry of the run history, newest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRecord {
    pub id: String,
    pub created_at: String,
    pub accuracy: Option<f64>,
    pub f1: Option<f64>,
    pub params: JsonValue,
}

impl RunRecord {
    pub fn params(&self) -> Option<RunParams> {
        RunParams::normalize(&self.params)
    }
}

/// Headline evaluation metrics written by the training job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadAck {
    pub path: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin client for the training backend. Every call is a single request
/// with no retries.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    max_bytes: usize,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes: http::DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Kick off training; the backend runs it in the background.
    pub fn train(&self, request: &TrainRequest) -> Result<TrainAck, BackendError> {
        let endpoint = self.url("/svm/train");
        info!("Starting training on {}", request.dataset_ref);
        let body = serde_json::to_string(request).map_err(|source| BackendError::Decode {
            endpoint: endpoint.clone(),
            source,
        })?;
        let response = http::agent()
            .post(&endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body);
        self.decode(&endpoint, response)
    }

    pub fn runs(&self) -> Result<Vec<RunRecord>, BackendError> {
        self.get_json("/svm/runs.json")
    }

    pub fn datasets(&self) -> Result<Vec<String>, BackendError> {
        self.get_json("/svm/datasets/list.json")
    }

    pub fn metrics(&self) -> Result<Metrics, BackendError> {
        self.get_json("/svm/outputs/metrics.json")
    }

    /// Upload a CSV file as multipart form field `file`.
    pub fn upload(&self, path: &Path) -> Result<UploadAck, BackendError> {
        let endpoint = self.url("/svm/datasets/upload");
        let contents = std::fs::read(path).map_err(|source| BackendError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let boundary = multipart_boundary(&contents, seed);
        let body = multipart_body(&boundary, "file", &file_name, &contents);
        info!("Uploading {file_name} ({} bytes)", contents.len());
        let response = http::agent()
            .post(&endpoint)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body);
        self.decode(&endpoint, response)
    }

    /// Raw text of a backend artifact (CSV, report, JSON).
    pub fn fetch_text(&self, path: &str) -> Result<String, BackendError> {
        let endpoint = self.url(path);
        let bytes = self.read(&endpoint, http::agent().get(&endpoint).call())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let endpoint = self.url(path);
        debug!("GET {endpoint}");
        self.decode(&endpoint, http::agent().get(&endpoint).call())
    }

    fn decode<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: Result<ureq::Response, ureq::Error>,
    ) -> Result<T, BackendError> {
        let bytes = self.read(endpoint, response)?;
        serde_json::from_slice(&bytes).map_err(|source| BackendError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn read(
        &self,
        endpoint: &str,
        response: Result<ureq::Response, ureq::Error>,
    ) -> Result<Vec<u8>, BackendError> {
        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(BackendError::Status {
                    endpoint: endpoint.to_string(),
                    status,
                })
            }
            Err(e) => {
                return Err(BackendError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        http::read_response_bytes(response, self.max_bytes).map_err(|e| BackendError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A boundary string that does not occur anywhere in `contents`.
fn multipart_boundary(contents: &[u8], seed: u64) -> String {
    let mut state = seed;
    loop {
        // splitmix64
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        let candidate = format!("review-dash-{z:016x}");
        if !contains(contents, candidate.as_bytes()) {
            return candidate;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn multipart_body(boundary: &str, field: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
            file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
