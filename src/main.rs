use anyhow::{Context, Result};
use proteome_picker::api::rest::ProteomeRest;
use proteome_picker::config::Config;
use proteome_picker::controller::download::FsDownloadSink;
use proteome_picker::controller::{DownloadController, QueryController};
use proteome_picker::tui::{self, App};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "proteome-picker.log";
const DEFAULT_CONFIG: &str = "config.toml";

/// `--config <path>`; anything else is rejected.
fn config_path_from_args(args: &[String]) -> Result<Option<PathBuf>> {
    let mut path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    // The terminal belongs to the TUI, so logs go to a file.
    let log_file = std::fs::File::create(LOG_FILE)
        .with_context(|| format!("Failed to create log file: {}", LOG_FILE))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("proteome_picker=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = match config_path_from_args(&args)? {
        Some(path) => Config::load(&path)?,
        None => Config::load_or_default(&PathBuf::from(DEFAULT_CONFIG))?,
    };

    // Saved values from .env (real env vars take precedence)
    Config::load_env_file();
    config.apply_env();

    tracing::info!(
        base_url = %config.server.base_url,
        page_size = config.table.page_size,
        output_dir = %config.download.output_dir.display(),
        "starting proteome picker"
    );

    let rest = Arc::new(ProteomeRest::new(
        &config.server.base_url,
        config.server.request_timeout(),
    )?);
    let query = QueryController::new(config.table.page_size);
    let download = DownloadController::new(
        &config.download.file_name,
        Box::new(FsDownloadSink::new(config.download.output_dir.clone())),
    );

    let (app, events_rx) = App::new(rest, query, download, &config.server.base_url);
    tui::run_tui(app, events_rx).await?;

    tracing::debug!("shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_uses_default() {
        assert!(config_path_from_args(&[]).unwrap().is_none());
    }

    #[test]
    fn test_config_flag() {
        let path = config_path_from_args(&args(&["--config", "alt.toml"])).unwrap();
        assert_eq!(path, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn test_config_flag_needs_value() {
        assert!(config_path_from_args(&args(&["-c"])).is_err());
        assert!(config_path_from_args(&args(&["--simulate"])).is_err());
    }
}
