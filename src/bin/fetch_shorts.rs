#![forbid(unsafe_code)]

//! Command-line front end for the Shorts pipeline.
//!
//! `keyword` and `channel` print one public URL per downloaded file;
//! `request` takes the API JSON body and prints the API JSON response.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use newtube_shorts::config::{RuntimeConfig, RuntimeOverrides, resolve_runtime_config};
use newtube_shorts::layout::StorageLayout;
use newtube_shorts::logging::init_logging;
use newtube_shorts::pipeline::PipelineSettings;
use newtube_shorts::progress::ProgressWriter;
use newtube_shorts::request::{DownloadRequest, DownloadResponse};
use newtube_shorts::security::{
    CredentialVerifier, DigestCredentials, ensure_not_root, hash_password,
};
use newtube_shorts::{Pipeline, PipelineError, RunReport, SearchRequest, YtDlp};
use tokio::signal;
use tracing::{error, info, warn};

const PROCESS_NAME: &str = "fetch-shorts";
const EXIT_INTERRUPTED: i32 = 130;
const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Parser)]
#[command(name = "fetch-shorts", version, about = "Find and download new YouTube Shorts")]
struct Cli {
    /// Path to the .env file with SHORTS_* settings.
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Download root (overrides SHORTS_ROOT).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Ledger of already downloaded ids (overrides SHORTS_LEDGER).
    #[arg(long, global = true, value_name = "PATH")]
    ledger: Option<PathBuf>,

    /// Directory for rotating log files (overrides SHORTS_LOG_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Write `{progress, message}` JSON here while running.
    #[arg(long, global = true, value_name = "PATH")]
    progress_file: Option<PathBuf>,

    /// Write the full run report as JSON here when the run finishes.
    #[arg(long, global = true, value_name = "PATH")]
    report_file: Option<PathBuf>,

    /// More output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Errors only.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search Shorts by keyword.
    Keyword {
        query: String,
        #[arg(short = 'n', long = "max", default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
    },
    /// Download Shorts from a channel URL, handle or id.
    Channel {
        channel_url: String,
        #[arg(short = 'n', long = "max", default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
    },
    /// Run one API request body (read from stdin when omitted).
    Request { json: Option<String> },
    /// Print the BLAKE3 digest of the password read from stdin.
    HashPassword,
    /// Check a password from stdin against the configured account.
    VerifyLogin {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ensure_not_root(PROCESS_NAME)?;

    let config = resolve_runtime_config(RuntimeOverrides {
        videos_root: cli.root.clone(),
        ledger_path: cli.ledger.clone(),
        log_dir: cli.log_dir.clone(),
        env_path: cli.env_file.clone(),
    })?;
    let _log_guard = init_logging(cli.verbose, cli.quiet, config.log_dir.as_deref());

    match &cli.command {
        Command::Keyword { query, max_results } => {
            let request = SearchRequest::keyword(query, *max_results)?;
            let report = run_pipeline(&cli, &config, request).await??;
            for url in report.video_urls() {
                println!("{url}");
            }
        }
        Command::Channel {
            channel_url,
            max_results,
        } => {
            let request = SearchRequest::channel(channel_url, *max_results)?;
            let report = run_pipeline(&cli, &config, request).await??;
            for url in report.video_urls() {
                println!("{url}");
            }
        }
        Command::Request { json } => {
            let body = match json {
                Some(json) => json.clone(),
                None => read_stdin().context("reading request body from stdin")?,
            };
            let response = handle_request(&cli, &config, &body).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                process::exit(1);
            }
        }
        Command::HashPassword => {
            let password = read_password()?;
            println!("{}", hash_password(&password));
        }
        Command::VerifyLogin { username } => {
            let (Some(configured_user), Some(digest)) =
                (config.username.as_deref(), config.password_digest.as_deref())
            else {
                bail!("SHORTS_USERNAME and SHORTS_PASSWORD_BLAKE3 must both be set");
            };
            let verifier = DigestCredentials::from_config(configured_user, digest)?;
            if verifier.verify(username, &read_password()?) {
                println!("ok");
            } else {
                eprintln!("invalid credentials");
                process::exit(1);
            }
        }
    }

    Ok(())
}

/// Parses and validates an API body, runs it, and folds every outcome into a
/// response payload.
async fn handle_request(
    cli: &Cli,
    config: &RuntimeConfig,
    body: &str,
) -> Result<DownloadResponse> {
    let request: DownloadRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(err) => {
            return Ok(DownloadResponse::failure(
                "invalid_request",
                format!("malformed request body: {err}"),
            ));
        }
    };
    let request = match SearchRequest::try_from(request) {
        Ok(request) => request,
        Err(err) => return Ok(DownloadResponse::invalid_request(&err)),
    };

    Ok(match run_pipeline(cli, config, request).await {
        Ok(Ok(report)) => DownloadResponse::success(report.video_urls()),
        Ok(Err(err)) => DownloadResponse::from_error(&err),
        Err(err) => {
            error!(error = %format!("{err:#}"), "request could not be run");
            DownloadResponse::failure("unexpected", err.to_string())
        }
    })
}

/// Runs the blocking pipeline off the async runtime. Ctrl+C exits the process
/// with status 130; a download already in flight is not rolled back.
async fn run_pipeline(
    cli: &Cli,
    config: &RuntimeConfig,
    request: SearchRequest,
) -> Result<Result<RunReport, PipelineError>> {
    let extractor = YtDlp::new(&config.yt_dlp_bin).with_cookies(config.cookies_file.clone());
    extractor.ensure_available().with_context(|| {
        format!(
            "{} is required; install yt-dlp or set YT_DLP_BIN",
            extractor.program().display()
        )
    })?;

    let mut settings = PipelineSettings::new(
        StorageLayout::new(&config.videos_root, config.public_prefix.clone()),
        &config.ledger_path,
    );
    settings.page_size = config.page_size;
    settings.max_page_attempts = config.max_page_attempts;

    info!(
        mode = request.mode(),
        root = %config.videos_root.display(),
        ledger = %config.ledger_path.display(),
        "starting run"
    );

    let pipeline = Pipeline::new(extractor, settings)
        .with_progress(cli.progress_file.clone().map(ProgressWriter::new));
    let task = tokio::task::spawn_blocking(move || pipeline.run(&request));

    let outcome = tokio::select! {
        joined = task => joined.context("pipeline task panicked")?,
        _ = signal::ctrl_c() => {
            warn!("interrupted, stopping");
            process::exit(EXIT_INTERRUPTED);
        }
    };

    if let (Ok(report), Some(path)) = (&outcome, cli.report_file.as_deref()) {
        write_report(path, report)?;
    }
    Ok(outcome)
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }
    let payload = serde_json::to_vec_pretty(report).context("serializing run report")?;
    fs::write(path, payload).with_context(|| format!("Writing {}", path.display()))
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("no password given on stdin");
    }
    Ok(password.to_string())
}
