use crate::output::print_json;
use anyhow::{Context, Result};
use clap::Args;
use jenkins_core::{
    deliver_notification, BuildError, ExecutionData, FileKeyStorage, KeyStorage, WebhookConfig,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// JSON file describing the execution ("-" reads stdin)
    #[arg(long)]
    execution: PathBuf,

    /// Jenkins base URL
    #[arg(long, env = "JENKINS_URL")]
    base_url: Option<String>,

    /// User to authenticate as (needs --api-token-path)
    #[arg(long, env = "JENKINS_USER_ID")]
    user_id: Option<String>,

    /// Key storage path of the user's API token
    #[arg(long)]
    api_token_path: Option<String>,

    /// Key storage root directory
    #[arg(long, env = "JENKINS_KEY_STORAGE", default_value = ".")]
    key_storage: PathBuf,
}

fn read_execution(path: &Path) -> Result<ExecutionData, BuildError> {
    let data = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|e| BuildError::Configuration(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&data).map_err(|e| {
        BuildError::Configuration(format!("invalid execution data {}: {e}", path.display()))
    })
}

pub fn run(args: NotifyArgs, json: bool) -> Result<()> {
    let execution = read_execution(&args.execution)?;

    let api_token = match args.api_token_path.as_deref() {
        Some(path) => FileKeyStorage::new(&args.key_storage)
            .lookup(path)
            .map_err(|e| {
                BuildError::Configuration(format!(
                    "failed to get API token from key storage, path={path}: {e}"
                ))
            })?,
        None => None,
    };
    let config = WebhookConfig {
        base_url: args.base_url,
        user_id: args.user_id,
        api_token,
    };

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    rt.block_on(deliver_notification(&config, &execution))?;

    if json {
        print_json(&serde_json::json!({ "delivered": true }))?;
    } else {
        println!("Notification delivered");
    }
    Ok(())
}
