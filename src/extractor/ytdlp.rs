#![forbid(unsafe_code)]

//! yt-dlp subprocess backend.
//!
//! Listings use `--flat-playlist --dump-single-json` so nothing is
//! downloaded; fetches ask yt-dlp to print the final file path once the file
//! has been moved into place.

use super::{Extractor, ListQuery, Listing, ListingEntry};
use crate::error::ExtractorError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

pub const DEFAULT_PROGRAM: &str = "yt-dlp";
const EXT_PLACEHOLDER: &str = ".%(ext)s";

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    cookies: Option<PathBuf>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies: None,
        }
    }

    /// Cookies are only passed along when the file exists at call time.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<(), ExtractorError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| self.spawn_error(source))?;

        if status.success() {
            Ok(())
        } else {
            Err(ExtractorError::Failed {
                target: "--version".into(),
                status: status.to_string(),
                stderr: format!("{} is installed but returned a failure status", self.program.display()),
            })
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("--no-warnings");
        if let Some(cookies) = &self.cookies
            && cookies.exists()
        {
            command.arg("--cookies").arg(cookies);
        }
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> ExtractorError {
        ExtractorError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    fn run(&self, mut command: Command, target: &str) -> Result<Output, ExtractorError> {
        debug!(program = %self.program.display(), target, "invoking extractor");
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| self.spawn_error(source))?;

        if !output.status.success() {
            return Err(ExtractorError::Failed {
                target: target.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Extractor for YtDlp {
    fn list(&self, query: &ListQuery) -> Result<Listing, ExtractorError> {
        let mut command = self.command();
        command
            .arg("--flat-playlist")
            .arg("--dump-single-json")
            .arg("--ignore-errors");
        if let Some((start, end)) = query.window {
            command.arg("--playlist-items").arg(format!("{start}:{end}"));
        }
        command.arg(&query.target);

        let output = self.run(command, &query.target)?;
        parse_listing(&query.target, &output.stdout)
    }

    fn fetch(&self, item_url: &str, output_template: &Path) -> Result<PathBuf, ExtractorError> {
        let mut command = self.command();
        command
            .arg("--format")
            .arg("best")
            .arg("--no-playlist")
            .arg("--no-progress")
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--output")
            .arg(output_template)
            .arg(item_url);

        let output = self.run(command, item_url)?;

        let printed = String::from_utf8_lossy(&output.stdout);
        if let Some(path) = printed
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            && path.is_file()
        {
            return Ok(path);
        }

        find_written_file(output_template).ok_or_else(|| ExtractorError::MissingOutput {
            target: item_url.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct RawListing {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    entries: Option<Vec<Option<RawEntry>>>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Parses `--dump-single-json` output. Entries yt-dlp could not resolve come
/// back as `null` or without an id and are dropped.
fn parse_listing(target: &str, stdout: &[u8]) -> Result<Listing, ExtractorError> {
    let raw: RawListing =
        serde_json::from_slice(stdout).map_err(|source| ExtractorError::Parse {
            target: target.to_string(),
            source,
        })?;

    let entries = raw
        .entries
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let id = entry.id?.trim().to_string();
            (!id.is_empty()).then_some(ListingEntry {
                id,
                url: entry.url,
                title: entry.title,
            })
        })
        .collect();

    Ok(Listing {
        title: raw.title,
        uploader: raw.uploader,
        channel: raw.channel,
        entries,
    })
}

/// Falls back to scanning the output directory for `<stem>.<ext>` when yt-dlp
/// did not print a usable path.
fn find_written_file(output_template: &Path) -> Option<PathBuf> {
    let template = output_template.to_string_lossy();
    let stem_path = PathBuf::from(template.strip_suffix(EXT_PLACEHOLDER)?);
    let dir = stem_path.parent()?;
    let stem = stem_path.file_name()?.to_string_lossy().into_owned();

    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter(|entry| entry.metadata().is_ok_and(|meta| meta.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let ext = name.strip_prefix(&stem)?.strip_prefix('.')?;
            // Partial downloads and sidecars are not the artifact.
            (!ext.is_empty() && !ext.contains('.') && ext != "part").then(|| entry.path())
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn install_stub(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("yt-dlp");
        fs::write(&path, script).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    const LISTING_STUB: &str = r#"#!/usr/bin/env bash
set -eu
printf '%s\n' "$@" > "$(dirname "$0")/args.txt"
cat <<'JSON'
{"title": "Chan - Shorts", "uploader": "Chan", "entries": [
  {"id": "a1", "url": "https://www.youtube.com/shorts/a1"},
  null,
  {"url": "https://www.youtube.com/shorts/noid"},
  {"id": "b2", "url": "https://www.youtube.com/shorts/b2"}
]}
JSON
"#;

    #[test]
    fn list_passes_window_and_parses_entries() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), LISTING_STUB);
        let cookies = dir.path().join("cookies.txt");
        fs::write(&cookies, "# Netscape HTTP Cookie File").unwrap();
        let ytdlp = YtDlp::new(stub).with_cookies(Some(cookies.clone()));

        let listing = ytdlp
            .list(&ListQuery::window("https://www.youtube.com/@Chan/shorts", 51, 100))
            .unwrap();
        assert_eq!(listing.display_name(), Some("Chan"));
        let ids: Vec<_> = listing.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        let args: Vec<_> = args.lines().collect();
        assert!(args.contains(&"--flat-playlist"));
        assert!(args.contains(&"51:100"));
        assert!(args.contains(&cookies.to_str().unwrap()));
        assert_eq!(args.last(), Some(&"https://www.youtube.com/@Chan/shorts"));
    }

    #[test]
    fn list_skips_missing_cookie_file() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), LISTING_STUB);
        let ytdlp = YtDlp::new(stub).with_cookies(Some(dir.path().join("absent.txt")));
        ytdlp.list(&ListQuery::whole("ytsearch5:cats shorts")).unwrap();
        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(!args.contains("--cookies"));
        assert!(!args.contains("--playlist-items"));
    }

    #[test]
    fn list_reports_failed_status_with_stderr() {
        let dir = tempdir().unwrap();
        let stub = install_stub(
            dir.path(),
            "#!/usr/bin/env bash\necho 'ERROR: channel not found' >&2\nexit 1\n",
        );
        let err = YtDlp::new(stub)
            .list(&ListQuery::whole("https://www.youtube.com/@nope"))
            .unwrap_err();
        match err {
            ExtractorError::Failed { stderr, .. } => assert!(stderr.contains("channel not found")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_rejects_garbage_output() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), "#!/usr/bin/env bash\necho 'not json'\n");
        let err = YtDlp::new(stub)
            .list(&ListQuery::whole("ytsearch1:x"))
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Parse { .. }));
    }

    #[test]
    fn fetch_returns_printed_path() {
        let dir = tempdir().unwrap();
        let stub = install_stub(
            dir.path(),
            r#"#!/usr/bin/env bash
set -eu
output=""
while [[ $# -gt 0 ]]; do
  case "$1" in
    --output) shift; output="$1" ;;
  esac
  shift
done
target="$(printf '%s' "$output" | sed 's/%(ext)s/webm/')"
echo "video" > "$target"
echo "$target"
"#,
        );
        let template = dir.path().join("1_abc_combined.%(ext)s");
        let written = YtDlp::new(stub)
            .fetch("https://www.youtube.com/shorts/abc", &template)
            .unwrap();
        assert_eq!(written, dir.path().join("1_abc_combined.webm"));
    }

    #[test]
    fn fetch_falls_back_to_directory_scan() {
        let dir = tempdir().unwrap();
        let stub = install_stub(
            dir.path(),
            r#"#!/usr/bin/env bash
set -eu
output=""
while [[ $# -gt 0 ]]; do
  case "$1" in
    --output) shift; output="$1" ;;
  esac
  shift
done
stem="$(printf '%s' "$output" | sed 's/\.%(ext)s$//')"
echo "partial" > "$stem.mp4.part"
echo "video" > "$stem.mp4"
"#,
        );
        let template = dir.path().join("2_xyz_combined.%(ext)s");
        let written = YtDlp::new(stub)
            .fetch("https://www.youtube.com/shorts/xyz", &template)
            .unwrap();
        assert_eq!(written, dir.path().join("2_xyz_combined.mp4"));
    }

    #[test]
    fn fetch_without_output_is_missing() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), "#!/usr/bin/env bash\nexit 0\n");
        let template = dir.path().join("3_none_combined.%(ext)s");
        let err = YtDlp::new(stub)
            .fetch("https://www.youtube.com/shorts/none", &template)
            .unwrap_err();
        assert!(matches!(err, ExtractorError::MissingOutput { .. }));
    }

    #[test]
    fn ensure_available_detects_missing_binary() {
        let dir = tempdir().unwrap();
        let err = YtDlp::new(dir.path().join("nope"))
            .ensure_available()
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Spawn { .. }));

        let stub = install_stub(dir.path(), "#!/usr/bin/env bash\necho 2024.01.01\n");
        assert!(YtDlp::new(stub).ensure_available().is_ok());
    }
}
