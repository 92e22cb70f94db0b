//! Three-phase build supervision: queue → build → log.
//!
//! ```text
//! trigger ──▶ Queued ──(executable)──▶ Assigned ──(finished)──▶ Build
//!               │                        │
//!          cancelled=true           interrupted
//!               ▼                        ▼
//!           Canceled              stop_build, Interrupted
//! ```
//!
//! Every poll and every sleep between polls is raced against the
//! [`Interrupt`]. The trigger itself runs to completion and the interrupt is
//! checked right after it. An interrupt in the Queued phase cancels the queue
//! item, an interrupt in the Assigned phase stops the build; in both cases the
//! cleanup call is made once and the caller sees [`BuildError::Interrupted`].

use std::future::Future;
use std::time::Duration;

use jenkins_client::{Build, BuildNumber, BuildTrigger, JenkinsApi, QueueItemId};

use crate::console::ConsoleSink;
use crate::error::{BuildError, Result};
use crate::interrupt::Interrupt;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How much of the build the executor follows after triggering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitoring {
    /// Trigger and return; the outcome is not tracked.
    TriggerOnly,
    /// Stream the console log until it completes, then fetch the build once.
    FollowLog,
    /// Poll the build until it stops building, optionally replaying the
    /// whole console log afterwards.
    WaitForFinish { log_console_output: bool },
}

impl Monitoring {
    /// Log following and logging only apply when waiting is enabled.
    pub fn from_flags(wait_for_finish: bool, log_console_output: bool, follow: bool) -> Self {
        match (wait_for_finish, follow) {
            (false, _) => Monitoring::TriggerOnly,
            (true, true) => Monitoring::FollowLog,
            (true, false) => Monitoring::WaitForFinish { log_console_output },
        }
    }
}

/// The Assigned-phase part of [`Monitoring`].
#[derive(Debug, Clone, Copy)]
enum Supervision {
    FollowLog,
    WaitForFinish { log_console_output: bool },
}

pub struct BuildExecutor<'a, C, S> {
    client: &'a C,
    console: &'a mut S,
    poll_interval: Duration,
}

impl<'a, C: JenkinsApi, S: ConsoleSink> BuildExecutor<'a, C, S> {
    pub fn new(client: &'a C, console: &'a mut S) -> Self {
        Self {
            client,
            console,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Trigger the build and supervise it according to `monitoring`.
    ///
    /// Returns `None` for [`Monitoring::TriggerOnly`], otherwise the last
    /// build status observed.
    pub async fn execute(
        &mut self,
        trigger: &BuildTrigger,
        monitoring: Monitoring,
        interrupt: &mut Interrupt,
    ) -> Result<Option<Build>> {
        let job = trigger.job_name.as_str();
        if interrupt.is_interrupted() {
            return Err(BuildError::Interrupted);
        }

        // Not raced: the queue item may exist remotely as soon as this is sent.
        let queue_item = self
            .client
            .trigger(job, &trigger.parameters, trigger.token.as_deref())
            .await?;
        tracing::info!(job, queue_item = %queue_item, "build queued");

        if interrupt.is_interrupted() {
            self.cancel_queue_item(job, queue_item).await;
            return Err(BuildError::Interrupted);
        }

        let supervision = match monitoring {
            Monitoring::TriggerOnly => return Ok(None),
            Monitoring::FollowLog => Supervision::FollowLog,
            Monitoring::WaitForFinish { log_console_output } => {
                Supervision::WaitForFinish { log_console_output }
            }
        };

        let number = match self.wait_for_executable(job, queue_item, interrupt).await {
            Err(BuildError::Interrupted) => {
                self.cancel_queue_item(job, queue_item).await;
                return Err(BuildError::Interrupted);
            }
            other => other?,
        };
        tracing::info!(job, build_number = number, "build started");

        match self.supervise(job, number, supervision, interrupt).await {
            Err(BuildError::Interrupted) => {
                self.stop_build(job, number).await;
                Err(BuildError::Interrupted)
            }
            other => other.map(Some),
        }
    }

    // ---------------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------------

    async fn wait_for_executable(
        &mut self,
        job: &str,
        id: QueueItemId,
        interrupt: &mut Interrupt,
    ) -> Result<BuildNumber> {
        loop {
            let item = interruptible(interrupt, self.client.get_queue_item(id)).await?;
            if item.cancelled {
                tracing::info!(job, queue_item = %id, "queue item was canceled");
                return Err(BuildError::Canceled {
                    job: job.to_string(),
                });
            }
            if let Some(executable) = item.executable {
                return Ok(executable.number);
            }
            tracing::debug!(job, queue_item = %id, "waiting for an executor");
            pause(interrupt, self.poll_interval).await?;
        }
    }

    async fn supervise(
        &mut self,
        job: &str,
        number: BuildNumber,
        supervision: Supervision,
        interrupt: &mut Interrupt,
    ) -> Result<Build> {
        match supervision {
            Supervision::FollowLog => {
                self.follow_log(job, number, interrupt).await?;
                // The build is taken as finished once its log is complete.
                interruptible(interrupt, self.client.get_build(job, number)).await
            }
            Supervision::WaitForFinish { log_console_output } => {
                let build = self.wait_for_build(job, number, interrupt).await?;
                if log_console_output {
                    self.follow_log(job, number, interrupt).await?;
                }
                Ok(build)
            }
        }
    }

    async fn wait_for_build(
        &mut self,
        job: &str,
        number: BuildNumber,
        interrupt: &mut Interrupt,
    ) -> Result<Build> {
        loop {
            let build = interruptible(interrupt, self.client.get_build(job, number)).await?;
            if !build.building {
                tracing::info!(
                    job,
                    build_number = number,
                    result = build.result.map(|r| r.as_str()).unwrap_or("none"),
                    "build finished"
                );
                return Ok(build);
            }
            tracing::debug!(job, build_number = number, "build in progress");
            pause(interrupt, self.poll_interval).await?;
        }
    }

    async fn follow_log(
        &mut self,
        job: &str,
        number: BuildNumber,
        interrupt: &mut Interrupt,
    ) -> Result<()> {
        match self.stream_log(job, number, interrupt).await {
            Err(BuildError::Interrupted) => {
                // Flush the partial last line before the build is stopped.
                if let Err(e) = self.console.finish() {
                    tracing::warn!(job, build_number = number, "failed to flush console: {e}");
                }
                Err(BuildError::Interrupted)
            }
            other => other,
        }
    }

    async fn stream_log(
        &mut self,
        job: &str,
        number: BuildNumber,
        interrupt: &mut Interrupt,
    ) -> Result<()> {
        let mut offset = 0;
        loop {
            let chunk =
                interruptible(interrupt, self.client.get_log_text(job, number, offset)).await?;
            tracing::debug!(
                job,
                build_number = number,
                offset,
                next_offset = chunk.next_offset,
                complete = chunk.complete,
                "console chunk"
            );
            self.console.log(&chunk.content)?;
            if chunk.complete {
                self.console.finish()?;
                return Ok(());
            }
            offset = chunk.next_offset;
            pause(interrupt, self.poll_interval).await?;
        }
    }

    // ---------------------------------------------------------------------------
    // Cleanup
    // ---------------------------------------------------------------------------

    async fn cancel_queue_item(&self, job: &str, id: QueueItemId) {
        match self.client.cancel_queue_item(id).await {
            Ok(()) => tracing::info!(job, queue_item = %id, "canceled queue item"),
            Err(e) => tracing::warn!(job, queue_item = %id, "failed to cancel queue item: {e}"),
        }
    }

    async fn stop_build(&self, job: &str, number: BuildNumber) {
        match self.client.stop_build(job, number).await {
            Ok(()) => tracing::info!(job, build_number = number, "stopped build"),
            Err(e) => tracing::warn!(job, build_number = number, "failed to stop build: {e}"),
        }
    }
}

/// Run `fut` unless the interrupt fires first.
async fn interruptible<T, F>(interrupt: &mut Interrupt, fut: F) -> Result<T>
where
    F: Future<Output = jenkins_client::Result<T>>,
{
    tokio::select! {
        biased;
        _ = interrupt.interrupted() => Err(BuildError::Interrupted),
        result = fut => result.map_err(BuildError::from),
    }
}

async fn pause(interrupt: &mut Interrupt, interval: Duration) -> Result<()> {
    tokio::select! {
        biased;
        _ = interrupt.interrupted() => Err(BuildError::Interrupted),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}
