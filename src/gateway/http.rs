//! HTTP/JSON implementation of the gateway.

use super::types::{
    AttendanceStatusReply, MessageReply, RecognizeFaceReply, RecognizeFaceRequest,
    RegisterFacesRequest,
};
use super::{EnrollmentSubject, GatewayError, RecognitionResult, VerificationGateway};
use crate::capture::CapturedImage;
use crate::config::ServiceConfig;
use crate::status::{AttendanceStatusSnapshot, Subject};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Talks to the recognition service over HTTP.
///
/// Reply bodies are decoded whatever the HTTP status: the service reports
/// rejected input as `400` with a normal `{status: "error"}` body.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpGateway {
    /// Builds the client with the configured connect and request timeouts.
    pub fn new(config: &ServiceConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            request_timeout: config.request_timeout(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.decode(path, response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.decode(path, response).await
    }

    async fn decode<R: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<R, GatewayError> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        tracing::debug!(path, %status, bytes = body.len(), "Service replied");

        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::Transport(format!("unreadable reply from {path} (HTTP {status}): {e}"))
        })
    }

    fn map_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.request_timeout)
        } else {
            GatewayError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl VerificationGateway for HttpGateway {
    async fn enroll(&self, subject: &EnrollmentSubject) -> Result<String, GatewayError> {
        let request = RegisterFacesRequest::from(subject);
        let reply: MessageReply = self.post("/register-faces", &request).await?;
        reply.into_message()
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<RecognitionResult, GatewayError> {
        let request = RecognizeFaceRequest {
            image: image.to_data_uri(),
        };
        let reply: RecognizeFaceReply = self.post("/recognize-face", &request).await?;
        reply.into_result()
    }

    async fn mark_attendance(&self, subject: &Subject) -> Result<String, GatewayError> {
        let reply: MessageReply = self.post("/mark-attendance", subject).await?;
        reply.into_message()
    }

    async fn fetch_status(&self) -> Result<AttendanceStatusSnapshot, GatewayError> {
        let reply: AttendanceStatusReply = self.get("/attendance-status").await?;
        reply.into_snapshot()
    }
}
