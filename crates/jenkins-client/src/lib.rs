//! `jenkins-client`: typed driver for the Jenkins remote build API.
//!
//! This crate owns every wire detail of talking to Jenkins: how job names
//! map onto `/job/<segment>` paths, which endpoints answer with `201` versus
//! `302`, how the queue item id hides inside the `Location` header, and how
//! the progressive console log is paged with `X-Text-Size` / `X-More-Data`.
//!
//! # Architecture
//!
//! ```text
//! JenkinsClientBuilder
//!     │                 base URL, optional user id + API token
//!     ▼
//! JenkinsClient     ← implements JenkinsApi
//!     │                one reqwest request per call, no retries,
//!     │                redirects surfaced as status codes
//!     ▼
//! QueueItemId / QueueItem / Build / LogChunk
//! ```
//!
//! The client never retries and never interprets failures; everything that
//! does not match the expected exchange comes back as a [`ProtocolError`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use jenkins_client::{JenkinsApi, JenkinsClient, Parameters};
//!
//! let client = JenkinsClient::builder("https://ci.example.com")
//!     .user_id(Some("deploy".into()))
//!     .api_token(Some("11d0…".into()))
//!     .build()?;
//!
//! let id = client.trigger("platform/deploy", &Parameters::default(), None).await?;
//! let item = client.get_queue_item(id).await?;
//! ```

pub mod client;
pub mod error;
pub mod types;


pub use client::{JenkinsApi, JenkinsClient, JenkinsClientBuilder};
pub use error::ProtocolError;
pub use types::{
    Build, BuildNumber, BuildResult, BuildTrigger, Executable, LogChunk, Parameters, QueueItem,
    QueueItemId, UnknownResult,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
