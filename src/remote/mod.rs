/// Client for a remote TAED BLAST service
///
/// The service exposes three GET endpoints sharing one base URL: the base
/// itself starts a search, `<base>Status` and `<base>Result` take the job's
/// `uid`.
use crate::blast::job::{RunStatus, SearchRequest};
use crate::blast::service::{ErrorResponse, ResultResponse, SubmitResponse};
use crate::core::config::RemoteConfig;
use crate::TaedError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

pub struct RemoteClient {
    base_url: String,
    poll_interval: Duration,
    client: reqwest::blocking::Client,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, TaedError> {
        url::Url::parse(&config.url)
            .map_err(|e| TaedError::Config(format!("Invalid remote url '{}': {}", config.url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("taed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TaedError::Remote(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn status_url(&self) -> String {
        format!("{}Status", self.base_url)
    }

    pub fn result_url(&self) -> String {
        format!("{}Result", self.base_url)
    }

    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, TaedError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|e| TaedError::Remote(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TaedError::Remote(format!("Failed to read response from {}: {}", url, e)))?;

        if !status.is_success() {
            return Err(TaedError::Remote(format!("{} returned status {}", url, status)));
        }
        Ok(body)
    }

    /// Start a search for the request's sequence on the remote service
    pub fn submit(&self, request: &SearchRequest) -> Result<SubmitResponse, TaedError> {
        let params = submit_params(request)?;
        let body = self.get(&self.base_url, &params)?;
        decode(&body)
    }

    pub fn status(&self, uid: &str) -> Result<RunStatus, TaedError> {
        let body = self.get(&self.status_url(), &[("uid", uid.to_string())])?;
        decode_status(&body)
    }

    pub fn result(&self, uid: &str) -> Result<ResultResponse, TaedError> {
        let body = self.get(&self.result_url(), &[("uid", uid.to_string())])?;
        decode(&body)
    }

    /// Poll until the job leaves IN_PROGRESS (or READY) and return the final status
    pub fn wait(&self, uid: &str, timeout: Option<Duration>) -> Result<RunStatus, TaedError> {
        let started = std::time::Instant::now();
        loop {
            let status = self.status(uid)?;
            if !matches!(status, RunStatus::InProgress | RunStatus::Ready) {
                return Ok(status);
            }
            if timeout.map_or(false, |limit| started.elapsed() >= limit) {
                return Ok(status);
            }
            tracing::debug!("Job {} still {}, sleeping {:?}", uid, status, self.poll_interval);
            std::thread::sleep(self.poll_interval);
        }
    }
}

/// Query parameters for a remote submission; the service takes one raw sequence
pub fn submit_params(request: &SearchRequest) -> Result<Vec<(&'static str, String)>, TaedError> {
    let sequence = request
        .sequence
        .clone()
        .ok_or_else(|| TaedError::Validation("A sequence must be sent to the remote service.".to_string()))?;

    let mut params = Vec::new();
    if let Some(name) = &request.job_name {
        params.push(("job_name", name.clone()));
    }
    if let Some(uuid) = &request.uuid {
        params.push(("uuid", uuid.clone()));
    }
    if let Some(e_value) = &request.e_value {
        params.push(("e_value", e_value.clone()));
    }
    if let Some(max_hits) = &request.max_hits {
        params.push(("max_hits", max_hits.clone()));
    }
    params.push(("sequence", sequence));
    Ok(params)
}

fn remote_error(value: &Value) -> Option<TaedError> {
    let object = value.as_object()?;
    let error = object.get("error").or_else(|| object.get("Error"))?;
    let response: ErrorResponse = serde_json::from_value(value.clone()).unwrap_or(ErrorResponse {
        error: error.as_str().unwrap_or_default().to_string(),
        uid: None,
        status: None,
    });

    Some(match (response.uid, response.status) {
        (Some(job_id), Some(status)) => TaedError::Incomplete { job_id, status },
        (Some(job_id), None) if response.error == "No Record Found" => TaedError::NotFound { job_id },
        _ => TaedError::Remote(response.error),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, TaedError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TaedError::Remote(format!("Invalid JSON from remote service: {}", e)))?;
    if let Some(err) = remote_error(&value) {
        return Err(err);
    }
    serde_json::from_value(value)
        .map_err(|e| TaedError::Remote(format!("Unexpected response from remote service: {}", e)))
}

/// Accepts either a bare status string or an object carrying `run_status`
pub fn decode_status(body: &str) -> Result<RunStatus, TaedError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TaedError::Remote(format!("Invalid JSON from remote service: {}", e)))?;
    if let Some(err) = remote_error(&value) {
        return Err(err);
    }

    let status = match value {
        Value::Object(mut object) => object.remove("run_status").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(status)
        .map_err(|e| TaedError::Remote(format!("Unexpected status from remote service: {}", e)))
}
