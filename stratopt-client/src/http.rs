//! HTTP backend over `reqwest::blocking`.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::BufReader;
use std::time::Duration;

use stratopt_core::{
    AppConfig, BacktestResult, BuyHoldRequest, SignalRequest, SignalResponse, SweepRequest,
};

use crate::backend::{Backend, SweepStream};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::sse::SseDecoder;

/// Talks to the real backend service.
pub struct HttpBackend {
    config: ClientConfig,
    /// Plain request/response calls; bounded by the configured timeout.
    client: Client,
    /// Sweep streams run as long as the backend keeps sending frames, so
    /// only the connect phase is bounded.
    stream_client: Client,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        let stream_client = Client::builder()
            .connect_timeout(config.timeout())
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            stream_client,
        })
    }

    pub fn config_ref(&self) -> &ClientConfig {
        &self.config
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        tracing::debug!("GET {url}");
        let resp = self.client.get(&url).send()?;
        decode_json(check_status(resp)?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        tracing::debug!("POST {url}");
        let resp = self.client.post(&url).json(body).send()?;
        decode_json(check_status(resp)?)
    }
}

/// Map a non-success status to `ClientError::Http`, keeping the body text.
fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ClientError::Http {
        status: status.as_u16(),
        body: error_detail(&body),
    })
}

/// Pull `detail`/`message` out of a JSON error body when there is one.
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|v| {
        ["detail", "message"]
            .iter()
            .find_map(|k| v.get(*k).and_then(|d| d.as_str()).map(str::to_string))
    });
    detail.unwrap_or_else(|| body.trim().to_string())
}

fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let text = resp.text()?;
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        &self.config.base_url
    }

    fn config(&self) -> Result<AppConfig, ClientError> {
        self.get("config")
    }

    fn save_config(&self, config: &AppConfig) -> Result<(), ClientError> {
        let url = self.config.endpoint("config");
        tracing::debug!("POST {url}");
        let resp = self.client.post(&url).json(config).send()?;
        // The acknowledgement body carries nothing we use.
        check_status(resp)?;
        Ok(())
    }

    fn buy_hold(&self, request: &BuyHoldRequest) -> Result<BacktestResult, ClientError> {
        self.post("run/buyhold", request)
    }

    fn signal(&self, request: &SignalRequest) -> Result<SignalResponse, ClientError> {
        self.post("run/signal", request)
    }

    fn securities(&self) -> Result<Vec<String>, ClientError> {
        self.get("securities")
    }

    fn open_sweep(&self, request: &SweepRequest) -> Result<SweepStream, ClientError> {
        let url = self.config.endpoint("run/optimizer");
        tracing::info!(
            "opening sweep at {url} ({} combinations)",
            request.grids.combinations()
        );
        let resp = self
            .stream_client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()?;
        let resp = check_status(resp)?;
        Ok(Box::new(SseDecoder::new(BufReader::new(resp))))
    }
}
