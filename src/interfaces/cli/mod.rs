//! CLI command execution

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::cli::Commands;
use crate::config::{StaticConfig, get_config};
use crate::context::OpContext;
use crate::errors::ShortdigestError;
use crate::services::RegistrationEngine;
use crate::system::init_db;

/// Run one command against the globally loaded config.
pub async fn run_cli_command(cmd: Commands, as_json: bool) -> anyhow::Result<()> {
    if let Commands::ConfigGen { output_path, force } = cmd {
        return config_generate(output_path.as_deref(), force);
    }

    let config = get_config();
    let backends = init_db(&config).await?;

    match cmd {
        Commands::Init => {
            if as_json {
                println!("{}", json!({ "status": "ready" }));
            } else {
                println!("{} All backends ready", "✓".bold().green());
            }
            Ok(())
        }
        Commands::Store { url } => {
            let engine = RegistrationEngine::from_backends(backends, &config);
            let ctx = request_context(&config);
            match engine.store_url(&ctx, &url).await {
                Ok(digest) => {
                    print_registration(as_json, &url, &digest, false);
                    Ok(())
                }
                // 已注册不算失败，输出原有 digest
                Err(ShortdigestError::AlreadyExists { url, digest }) => {
                    print_registration(as_json, &url, &digest, true);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Resolve { digest } => {
            let engine = RegistrationEngine::from_backends(backends, &config);
            let ctx = request_context(&config);
            let url = engine.get_original_url(&ctx, &digest).await?;
            if as_json {
                println!("{}", json!({ "digest": digest, "url": url }));
            } else {
                println!("{}", url);
            }
            Ok(())
        }
        Commands::ConfigGen { .. } => unreachable!("handled above"),
    }
}

fn request_context(config: &StaticConfig) -> OpContext {
    match config.registration.request_timeout_ms {
        0 => OpContext::background(),
        ms => OpContext::with_timeout(Duration::from_millis(ms)),
    }
}

fn print_registration(as_json: bool, url: &str, digest: &str, existed: bool) {
    if as_json {
        let status = if existed { "exists" } else { "created" };
        println!(
            "{}",
            json!({ "url": url, "digest": digest, "status": status })
        );
    } else if existed {
        println!(
            "{} Already registered: {} -> {}",
            "ℹ".bold().blue(),
            url.blue().underline(),
            digest.cyan()
        );
    } else {
        println!(
            "{} Registered: {} -> {}",
            "✓".bold().green(),
            url.blue().underline(),
            digest.cyan()
        );
    }
}

fn config_generate(output_path: Option<&str>, force: bool) -> anyhow::Result<()> {
    let sample = StaticConfig::generate_sample_config();
    let Some(path) = output_path else {
        print!("{}", sample);
        return Ok(());
    };

    if Path::new(path).exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path);
    }
    std::fs::write(path, sample).with_context(|| format!("Failed to write {}", path))?;
    debug!("Sample config written to {}", path);
    println!("{} Config written to {}", "✓".bold().green(), path.magenta());
    Ok(())
}
