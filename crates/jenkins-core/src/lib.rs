//! `jenkins-core`: triggers a Jenkins build and supervises it to the end.
//!
//! # Architecture
//!
//! ```text
//! StepConfig ──validate──▶ StepPlan
//!     │                       │  secrets from KeyStorage
//!     ▼                       ▼
//! run_build_step ──▶ BuildExecutor<JenkinsApi, ConsoleSink>
//!     │                 Queued → Assigned → Terminal
//!     │                 every wait raced against Interrupt
//!     ▼
//! check_threshold   ← failure threshold vs. final BuildResult
//! ```
//!
//! The notification path is separate: [`notification_document`] renders an
//! execution event and [`deliver_notification`] posts it to the webhook.

pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod interrupt;
pub mod keys;
pub mod notification;
pub mod properties;
pub mod step;

pub use config::{StepConfig, StepPlan};
pub use console::{ConsoleSink, LineBufferedConsole, LineSink, TracingLines, WriterLines};
pub use error::{BuildError, FailureReason, Result};
pub use executor::{BuildExecutor, Monitoring};
pub use interrupt::{Interrupt, InterruptHandle};
pub use keys::{FileKeyStorage, KeyStorage};
pub use notification::{
    deliver_notification, notification_document, ExecutionData, JobData, WebhookConfig,
};
pub use step::{check_threshold, run_build_step};
