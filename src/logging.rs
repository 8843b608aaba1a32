#![forbid(unsafe_code)]

//! tracing subscriber setup for the binaries.

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_PREFIX: &str = "newtube-shorts";

/// Filter directives for the `-q` / `-v` flags. The binary logs under its own
/// target, so it is listed next to the library.
fn default_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "newtube_shorts=info,fetch_shorts=info,warn",
        1 => "newtube_shorts=debug,fetch_shorts=debug,info",
        2 => "newtube_shorts=trace,fetch_shorts=trace,debug",
        _ => "trace",
    }
}

/// Installs a stderr layer plus, when `log_dir` is set, a daily-rotating
/// plain-text file layer. `RUST_LOG` overrides the verbosity flags.
///
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost.
pub fn init_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, quiet)));

    let (file_layer, guard) = match log_dir {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .compact();
                (Some(layer), Some(guard))
            }
            Err(err) => {
                eprintln!("Warning: could not create log dir {}: {err}", dir.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .ok();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags_map_to_directives() {
        assert_eq!(default_directives(0, true), "error");
        assert_eq!(default_directives(3, true), "error");
        assert_eq!(default_directives(0, false), "newtube_shorts=info,fetch_shorts=info,warn");
        assert_eq!(default_directives(1, false), "newtube_shorts=debug,fetch_shorts=debug,info");
        assert_eq!(default_directives(2, false), "newtube_shorts=trace,fetch_shorts=trace,debug");
        assert_eq!(default_directives(5, false), "trace");
    }

    #[test]
    fn binary_target_is_enabled_at_default_verbosity() {
        for verbose in 0..3 {
            let directives = default_directives(verbose, false);
            assert!(directives.contains("fetch_shorts="), "{directives}");
            assert!(EnvFilter::try_new(directives).is_ok());
        }
    }
}
