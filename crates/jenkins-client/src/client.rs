use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::types::{Build, BuildNumber, LogChunk, Parameters, QueueItem, QueueItemId};
use crate::{ProtocolError, Result};

const USER_AGENT: &str = concat!("jenkins-build/", env!("CARGO_PKG_VERSION"));
const TEXT_SIZE_HEADER: &str = "X-Text-Size";
const MORE_DATA_HEADER: &str = "X-More-Data";
const WEBHOOK_PATH: [&str; 4] = ["plugin", "rundeck", "webhook", ""];

static QUEUE_ITEM_RE: OnceLock<Regex> = OnceLock::new();

fn queue_item_re() -> &'static Regex {
    QUEUE_ITEM_RE.get_or_init(|| Regex::new(r"/queue/item/(\d+)/$").unwrap())
}

// ─── JenkinsApi ───────────────────────────────────────────────────────────

/// The remote operations the build orchestration needs.
///
/// [`JenkinsClient`] is the HTTP implementation; tests drive the executor
/// with scripted implementations instead.
#[allow(async_fn_in_trait)]
pub trait JenkinsApi {
    /// Queue a build. Returns the queue item id from the `Location` header.
    async fn trigger(
        &self,
        job_name: &str,
        parameters: &Parameters,
        token: Option<&str>,
    ) -> Result<QueueItemId>;

    async fn cancel_queue_item(&self, id: QueueItemId) -> Result<()>;

    async fn get_queue_item(&self, id: QueueItemId) -> Result<QueueItem>;

    async fn get_build(&self, job_name: &str, number: BuildNumber) -> Result<Build>;

    /// Fetch the console log from byte offset `start`.
    async fn get_log_text(&self, job_name: &str, number: BuildNumber, start: u64)
        -> Result<LogChunk>;

    async fn stop_build(&self, job_name: &str, number: BuildNumber) -> Result<()>;
}

// ─── JenkinsClientBuilder ─────────────────────────────────────────────────

/// Builds a [`JenkinsClient`] with the transport settings the protocol
/// depends on: redirects are returned rather than followed, nothing is
/// retried, and idle connections are not kept around.
#[derive(Debug, Clone)]
pub struct JenkinsClientBuilder {
    base_url: String,
    user_id: Option<String>,
    api_token: Option<String>,
}

impl JenkinsClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_id: None,
            api_token: None,
        }
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn api_token(mut self, api_token: Option<String>) -> Self {
        self.api_token = api_token;
        self
    }

    pub fn build(self) -> Result<JenkinsClient> {
        let mut base_url = Url::parse(self.base_url.trim())
            .map_err(|e| ProtocolError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProtocolError::InvalidBaseUrl(self.base_url));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .build()?;

        // Basic auth only when the pair is complete, otherwise anonymous.
        let credentials = match (self.user_id, self.api_token) {
            (Some(user_id), Some(api_token)) => Some((user_id, api_token)),
            _ => None,
        };

        Ok(JenkinsClient {
            http,
            base_url,
            credentials,
        })
    }
}

// ─── JenkinsClient ────────────────────────────────────────────────────────

/// HTTP client for one Jenkins instance.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl JenkinsClient {
    pub fn builder(base_url: impl Into<String>) -> JenkinsClientBuilder {
        JenkinsClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Post a notification document to the Rundeck webhook endpoint.
    pub async fn deliver(&self, document: String) -> Result<()> {
        let url = self.url(WEBHOOK_PATH);
        tracing::debug!(url = %url, "delivering webhook notification");
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(document);
        self.execute(request, StatusCode::OK).await?;
        Ok(())
    }

    /// Append path segments to the base URL; each segment is percent-encoded.
    fn url<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        // The builder rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `/job/<a>/job/<b>/<tail...>` for job name `a/b`.
    fn job_url<I>(&self, job_name: &str, tail: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut segments: Vec<String> = Vec::new();
        for segment in job_name.trim_end_matches('/').split('/') {
            segments.push("job".to_string());
            segments.push(segment.to_string());
        }
        segments.extend(tail.into_iter().map(|s| s.as_ref().to_string()));
        self.url(segments)
    }

    async fn execute(&self, request: RequestBuilder, expected: StatusCode) -> Result<Response> {
        let request = match &self.credentials {
            Some((user_id, api_token)) => request.basic_auth(user_id, Some(api_token)),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status != expected {
            let body = response.text().await.unwrap_or_default();
            return Err(ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.execute(self.http.get(url.clone()), StatusCode::OK).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ProtocolError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn queue_item_id_from_location(&self, location: &str) -> Result<QueueItemId> {
        let url = self
            .base_url
            .join(location)
            .map_err(|_| ProtocolError::InvalidLocation(location.to_string()))?;
        queue_item_re()
            .captures(url.path())
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .map(QueueItemId)
            .ok_or_else(|| ProtocolError::QueueItemIdNotFound(location.to_string()))
    }
}

fn header_value(value: &reqwest::header::HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

impl JenkinsApi for JenkinsClient {
    async fn trigger(
        &self,
        job_name: &str,
        parameters: &Parameters,
        token: Option<&str>,
    ) -> Result<QueueItemId> {
        let endpoint = if parameters.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let mut url = self.job_url(job_name, [endpoint]);
        if token.is_some() || !parameters.is_empty() {
            let mut query = url.query_pairs_mut();
            if let Some(token) = token {
                query.append_pair("token", token);
            }
            for (key, value) in parameters.iter() {
                query.append_pair(key, value);
            }
        }

        tracing::debug!(job = job_name, endpoint, "triggering build");
        let response = self.execute(self.http.post(url), StatusCode::CREATED).await?;
        let location = response
            .headers()
            .get(LOCATION)
            .ok_or(ProtocolError::MissingHeader("Location"))?;
        let location = location.to_str().map_err(|_| ProtocolError::InvalidHeader {
            name: "Location",
            value: header_value(location),
        })?;
        self.queue_item_id_from_location(location)
    }

    async fn cancel_queue_item(&self, id: QueueItemId) -> Result<()> {
        let mut url = self.url(["queue", "cancelItem"]);
        url.query_pairs_mut().append_pair("id", &id.to_string());
        self.execute(self.http.post(url), StatusCode::FOUND).await?;
        Ok(())
    }

    async fn get_queue_item(&self, id: QueueItemId) -> Result<QueueItem> {
        let url = self.url(["queue", "item", id.to_string().as_str(), "api", "json"]);
        self.get_json(url).await
    }

    async fn get_build(&self, job_name: &str, number: BuildNumber) -> Result<Build> {
        let url = self.job_url(job_name, [number.to_string().as_str(), "api", "json"]);
        self.get_json(url).await
    }

    async fn get_log_text(
        &self,
        job_name: &str,
        number: BuildNumber,
        start: u64,
    ) -> Result<LogChunk> {
        let mut url = self.job_url(
            job_name,
            [number.to_string().as_str(), "logText", "progressiveText"],
        );
        url.query_pairs_mut().append_pair("start", &start.to_string());

        let response = self.execute(self.http.get(url), StatusCode::OK).await?;
        let headers = response.headers();
        let text_size = headers
            .get(TEXT_SIZE_HEADER)
            .ok_or(ProtocolError::MissingHeader(TEXT_SIZE_HEADER))?;
        let next_offset = text_size
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| ProtocolError::InvalidHeader {
                name: TEXT_SIZE_HEADER,
                value: header_value(text_size),
            })?;
        let complete = !headers.contains_key(MORE_DATA_HEADER);
        let body = response.bytes().await?;
        let (content, held_back) = decode_log(&body, complete);

        Ok(LogChunk {
            content,
            next_offset: next_offset.saturating_sub(held_back as u64),
            complete,
        })
    }

    async fn stop_build(&self, job_name: &str, number: BuildNumber) -> Result<()> {
        let url = self.job_url(job_name, [number.to_string().as_str(), "stop"]);
        self.execute(self.http.post(url), StatusCode::FOUND).await?;
        Ok(())
    }
}

/// Decode a log chunk as UTF-8. While more data is coming, a character split
/// at the end of the chunk is held back (its byte count is returned) so the
/// next request starts at its first byte.
fn decode_log(body: &[u8], complete: bool) -> (String, usize) {
    match std::str::from_utf8(body) {
        Ok(text) => (text.to_string(), 0),
        Err(e) if !complete && e.error_len().is_none() => {
            let valid = e.valid_up_to();
            (
                String::from_utf8_lossy(&body[..valid]).into_owned(),
                body.len() - valid,
            )
        }
        Err(_) => (String::from_utf8_lossy(body).into_owned(), 0),
    }
}
