//! Client side of the remote dubbing service.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::JobId,
    protocol::{form_fields, CreateJobResponse, JobStatusResponse},
};
use tracing::{debug, info};

use crate::{controller::commands::SubmitRequest, error::RemoteError};

#[async_trait]
pub trait DubbingApi: Send + Sync {
    async fn create_job(&self, request: &SubmitRequest) -> Result<CreateJobResponse, RemoteError>;
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusResponse, RemoteError>;
    async fn update_email(&self, job_id: &JobId, email: &str) -> Result<(), RemoteError>;
    async fn download(&self, url: &str) -> Result<Arc<[u8]>, RemoteError>;
}

/// Upper bound for a single request; a hung status check surfaces as a transient failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpDubbingApi {
    http: Client,
    base_url: String,
}

impl HttpDubbingApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build dubbing http client")?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turns a non-2xx response into `Rejected` carrying the body text.
async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DubbingApi for HttpDubbingApi {
    async fn create_job(&self, request: &SubmitRequest) -> Result<CreateJobResponse, RemoteError> {
        let mut file_part = Part::bytes(request.file.data.to_vec()).file_name(request.file.name.clone());
        if let Some(mime) = request.file.mime_type.as_deref() {
            file_part = file_part
                .mime_str(mime)
                .map_err(|e| RemoteError::Malformed(format!("invalid MIME type '{mime}': {e}")))?;
        }

        let mut form = Form::new()
            .text(form_fields::FILE_NAME, request.file.name.clone())
            .part(form_fields::FILE, file_part)
            .text(form_fields::SOURCE_LOCALE, request.source_locale.clone())
            .text(form_fields::TARGET_LOCALE, request.target_locale.clone());
        if let Some(email) = &request.email {
            form = form.text(form_fields::EMAIL, email.clone());
        }

        info!(
            file = %request.file.name,
            bytes = request.file.size(),
            source_locale = %request.source_locale,
            target_locale = %request.target_locale,
            "dubbing: creating job"
        );
        let response = self
            .http
            .post(format!("{}/jobs/create", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let body: CreateJobResponse = ensure_success(response).await?.json().await?;
        Ok(body)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusResponse, RemoteError> {
        let response = self
            .http
            .get(format!("{}/jobs/{job_id}/status", self.base_url))
            .send()
            .await?;
        let body: JobStatusResponse = ensure_success(response).await?.json().await?;
        debug!(%job_id, status = ?body.status, "dubbing: status fetched");
        Ok(body)
    }

    async fn update_email(&self, job_id: &JobId, email: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(format!("{}/jobs/{job_id}/update-email", self.base_url))
            .header(CONTENT_TYPE, "text/plain")
            .body(email.to_string())
            .send()
            .await?;
        ensure_success(response).await?;
        info!(%job_id, "dubbing: email attached to job");
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Arc<[u8]>, RemoteError> {
        let response = self.http.get(url).send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        debug!(bytes = bytes.len(), "dubbing: result downloaded");
        Ok(Arc::from(bytes.to_vec()))
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
