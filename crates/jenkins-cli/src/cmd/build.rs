use crate::cmd::runtime_with_interrupt;
use crate::output::print_json;
use anyhow::Result;
use clap::Args;
use jenkins_client::Build;
use jenkins_core::{
    properties, run_build_step, BuildError, FileKeyStorage, LineBufferedConsole, LineSink,
    StepConfig, TracingLines, WriterLines,
};
use serde::Serialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// YAML step configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Job name; folders separated by '/'
    #[arg(long)]
    job: Option<String>,

    /// Build parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Build parameters in Java properties format
    #[arg(long)]
    parameters_file: Option<PathBuf>,

    /// Jenkins base URL
    #[arg(long, env = "JENKINS_URL")]
    base_url: Option<String>,

    /// User to authenticate as (needs --api-token-path)
    #[arg(long, env = "JENKINS_USER_ID")]
    user_id: Option<String>,

    /// Key storage path of the user's API token
    #[arg(long)]
    api_token_path: Option<String>,

    /// Key storage path of the job's remote trigger token
    #[arg(long)]
    token_path: Option<String>,

    /// Key storage root directory
    #[arg(long, env = "JENKINS_KEY_STORAGE", default_value = ".")]
    key_storage: PathBuf,

    /// Wait for the build to finish
    #[arg(long)]
    wait: bool,

    /// Seconds between polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Print the console log once the build has finished
    #[arg(long)]
    log_console: bool,

    /// Stream the console log while the build runs
    #[arg(long)]
    follow: bool,

    /// Fail if the result is worse than or equal to this (SUCCESS, UNSTABLE, FAILURE, ...)
    #[arg(long)]
    failure_threshold: Option<String>,
}

impl BuildArgs {
    fn step_config(&self) -> Result<StepConfig, BuildError> {
        let mut config = match &self.config {
            Some(path) => StepConfig::load(path)?,
            None => StepConfig::default(),
        };

        if let Some(job) = &self.job {
            config.job_name = Some(job.clone());
        }
        if let Some(path) = &self.parameters_file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                BuildError::Configuration(format!("failed to read {}: {e}", path.display()))
            })?;
            append_lines(&mut config.parameters, &text);
        }
        for param in &self.params {
            let (key, value) = param.split_once('=').ok_or_else(|| {
                BuildError::Configuration(format!("--param expects KEY=VALUE, got '{param}'"))
            })?;
            append_lines(&mut config.parameters, &properties::format_entry(key, value));
        }

        if self.base_url.is_some() {
            config.base_url = self.base_url.clone();
        }
        if self.user_id.is_some() {
            config.user_id = self.user_id.clone();
        }
        if self.api_token_path.is_some() {
            config.api_token_path = self.api_token_path.clone();
        }
        if self.token_path.is_some() {
            config.authorization_token_path = self.token_path.clone();
        }
        if let Some(poll_interval) = self.poll_interval {
            config.poll_interval = poll_interval;
        }
        if self.failure_threshold.is_some() {
            config.failure_threshold = self.failure_threshold.clone();
        }
        config.wait_for_build_to_finish |= self.wait;
        config.log_console_output |= self.log_console;
        config.follow_console_output |= self.follow;

        Ok(config)
    }
}

fn append_lines(text: &mut String, more: &str) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(more);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BuildReport<'a> {
    job: &'a str,
    build: Option<&'a Build>,
}

pub fn run(args: BuildArgs, json: bool) -> Result<()> {
    let config = args.step_config()?;
    let keys = FileKeyStorage::new(&args.key_storage);

    // With --json stdout is reserved for the report.
    let lines: Box<dyn LineSink> = if json {
        Box::new(TracingLines)
    } else {
        Box::new(WriterLines::new(std::io::stdout()))
    };
    let mut console = LineBufferedConsole::new(lines);

    let (rt, mut interrupt) = runtime_with_interrupt()?;
    let build = rt.block_on(run_build_step(&config, &keys, &mut console, &mut interrupt))?;

    let job = config.job_name.as_deref().unwrap_or_default().trim();
    if json {
        return print_json(&BuildReport {
            job,
            build: build.as_ref(),
        });
    }
    match build {
        None => println!("Triggered {job}"),
        Some(build) => match build.result {
            Some(result) => println!("Finished {job}: {result}"),
            None => println!("Finished {job}: no result reported"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn parse(argv: &[&str]) -> BuildArgs {
        let mut full = vec!["jenkins-build"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).args
    }

    #[test]
    fn flags_build_a_config() {
        let args = parse(&[
            "--job",
            "platform/deploy",
            "--param",
            "ENV=prod",
            "--param",
            "NOTE=a b=c",
            "--base-url",
            "http://ci",
            "--wait",
            "--follow",
            "--poll-interval",
            "0",
            "--failure-threshold",
            "unstable",
        ]);
        let plan = args.step_config().unwrap().validate().unwrap();
        assert_eq!(plan.trigger.job_name, "platform/deploy");
        assert_eq!(plan.trigger.parameters.get("ENV"), Some("prod"));
        assert_eq!(plan.trigger.parameters.get("NOTE"), Some("a b=c"));
        assert_eq!(plan.monitoring, jenkins_core::Monitoring::FollowLog);
        assert_eq!(plan.poll_interval.as_secs(), 0);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("step.yaml");
        std::fs::write(
            &path,
            "job_name: from-file\nparameters: \"A=1\"\nbase_url: http://file\npoll_interval: 30\n",
        )
        .unwrap();

        let args = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--job",
            "from-flag",
            "--param",
            "A=2",
        ]);
        let config = args.step_config().unwrap();
        assert_eq!(config.job_name.as_deref(), Some("from-flag"));
        assert_eq!(config.poll_interval, 30);
        let plan = config.validate().unwrap();
        assert_eq!(plan.trigger.parameters.get("A"), Some("2"));
        assert_eq!(plan.trigger.parameters.len(), 1);
    }

    #[test]
    fn param_without_equals_is_a_configuration_error() {
        let args = parse(&["--job", "app", "--param", "JUSTKEY"]);
        assert!(matches!(
            args.step_config(),
            Err(BuildError::Configuration(_))
        ));
    }
}
