use std::time::Duration;

use rebuild_logging::{rebuild_debug, rebuild_warn};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::wire::{self, actions};
use crate::{
    FailureKind, JobProgress, JobServerError, KnowledgeStatus, StartAck, UpdatedChunks,
};

#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Full URL of `wp-admin/admin-ajax.php`.
    pub ajax_url: String,
    /// Opaque per-session token sent as `nonce`; never inspected.
    pub nonce: String,
    pub connect_timeout: Duration,
    /// Upper bound for a single call, batches included. Expiry is reported as
    /// `FailureKind::Timeout` and is not retried.
    pub request_timeout: Duration,
}

impl ServerSettings {
    pub fn new(ajax_url: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            ajax_url: ajax_url.into(),
            nonce: nonce.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// The server side of the rebuild: every call is one independent request.
#[async_trait::async_trait]
pub trait JobServer: Send + Sync {
    async fn start_job(&self, force: bool) -> Result<StartAck, JobServerError>;

    async fn process_batch(&self) -> Result<JobProgress, JobServerError>;

    async fn progress(&self) -> Result<JobProgress, JobServerError>;

    async fn cancel_job(&self) -> Result<(), JobServerError>;

    /// Re-embeds chunks edited since the last rebuild, optionally only those
    /// of one knowledge entry.
    async fn rebuild_updated_chunks(
        &self,
        source_id: Option<&str>,
    ) -> Result<UpdatedChunks, JobServerError>;

    async fn knowledge_status(&self) -> Result<KnowledgeStatus, JobServerError>;
}

/// `JobServer` over WordPress `admin-ajax.php` form posts.
#[derive(Debug, Clone)]
pub struct AjaxJobServer {
    settings: ServerSettings,
    client: reqwest::Client,
}

impl AjaxJobServer {
    pub fn new(settings: ServerSettings) -> Result<Self, JobServerError> {
        reqwest::Url::parse(&settings.ajax_url)
            .map_err(|err| JobServerError::new(FailureKind::Transport, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| JobServerError::new(FailureKind::Transport, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn post(&self, action: &str, fields: &[(&str, &str)]) -> Result<Value, JobServerError> {
        // The serializer is not `Send`; it must be gone before the first await.
        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("action", action)
                .append_pair("nonce", &self.settings.nonce);
            for (name, value) in fields {
                form.append_pair(name, value);
            }
            form.finish()
        };

        rebuild_debug!("POST action={} fields={}", action, fields.len());
        let response = self
            .client
            .post(&self.settings.ajax_url)
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            rebuild_warn!("action={} answered {}", action, status);
            return Err(JobServerError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        wire::open_envelope(&bytes)
    }
}

#[async_trait::async_trait]
impl JobServer for AjaxJobServer {
    async fn start_job(&self, force: bool) -> Result<StartAck, JobServerError> {
        let force = if force { "1" } else { "0" };
        let data = self.post(actions::START_REBUILD, &[("force", force)]).await?;
        Ok(wire::decode_start(data))
    }

    async fn process_batch(&self) -> Result<JobProgress, JobServerError> {
        let data = self.post(actions::PROCESS_BATCH, &[]).await?;
        wire::decode_progress(data)
    }

    async fn progress(&self) -> Result<JobProgress, JobServerError> {
        let data = self.post(actions::GET_PROGRESS, &[]).await?;
        wire::decode_progress(data)
    }

    async fn cancel_job(&self) -> Result<(), JobServerError> {
        self.post(actions::CANCEL_REBUILD, &[]).await.map(|_| ())
    }

    async fn rebuild_updated_chunks(
        &self,
        source_id: Option<&str>,
    ) -> Result<UpdatedChunks, JobServerError> {
        let data = match source_id {
            Some(source_id) => {
                self.post(actions::REBUILD_UPDATED, &[("source_id", source_id)])
                    .await?
            }
            None => self.post(actions::REBUILD_UPDATED, &[]).await?,
        };
        wire::decode_updated(data)
    }

    async fn knowledge_status(&self) -> Result<KnowledgeStatus, JobServerError> {
        let data = self.post(actions::GET_STATUS, &[]).await?;
        wire::decode_status(data)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> JobServerError {
    if err.is_timeout() {
        return JobServerError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return JobServerError::new(FailureKind::Decode, err.to_string());
    }
    JobServerError::new(FailureKind::Transport, err.to_string())
}
