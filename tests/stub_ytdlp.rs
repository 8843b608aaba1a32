#![cfg(unix)]

use newtube_shorts::layout::{DEFAULT_PUBLIC_PREFIX, StorageLayout};
use newtube_shorts::pipeline::PipelineSettings;
use newtube_shorts::{Ledger, Pipeline, PipelineError, SearchRequest, YtDlp};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Fake yt-dlp: `ytsearchN:` lists the first N of k1..k4, `.../shorts`
/// windows into c1..c3 for "Stub Channel", and downloads write a small file
/// (except k2, which always fails). Every invocation is appended to
/// `calls.log` next to the script.
const STUB: &str = r#"#!/usr/bin/env bash
set -eu
echo "$*" >> "$(dirname "$0")/calls.log"

mode=fetch
output=""
items=""
target=""
while [[ $# -gt 0 ]]; do
  case "$1" in
    --version) echo "2024.01.01"; exit 0 ;;
    --dump-single-json) mode=list ;;
    --playlist-items) shift; items="$1" ;;
    --output) shift; output="$1" ;;
    --cookies|--format|--print) shift ;;
    --*) ;;
    *) target="$1" ;;
  esac
  shift
done

emit() {
  local name="$1"; shift
  local sep=""
  printf '{"uploader": "%s", "entries": [' "$name"
  for id in "$@"; do
    printf '%s{"id": "%s", "url": "https://www.youtube.com/shorts/%s"}' "$sep" "$id" "$id"
    sep=","
  done
  printf ']}\n'
}

if [[ "$mode" == list ]]; then
  case "$target" in
    ytsearch*)
      count="${target#ytsearch}"
      count="${count%%:*}"
      ids=(k1 k2 k3 k4)
      emit "" "${ids[@]:0:count}"
      ;;
    */shorts)
      ids=(c1 c2 c3)
      start="${items%%:*}"
      end="${items##*:}"
      emit "Stub Channel" "${ids[@]:start-1:end-start+1}"
      ;;
    *)
      emit "Stub Channel"
      ;;
  esac
  exit 0
fi

case "$target" in
  */k2) echo "ERROR: [youtube] k2: Video unavailable" >&2; exit 1 ;;
esac
file="$(printf '%s' "$output" | sed 's/%(ext)s/mp4/')"
echo "video" > "$file"
echo "$file"
"#;

fn install_stub(dir: &Path) -> PathBuf {
    let path = dir.join("yt-dlp");
    fs::write(&path, STUB).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn pipeline(dir: &TempDir, page_size: usize) -> Pipeline<YtDlp> {
    let stub = install_stub(dir.path());
    let extractor = YtDlp::new(stub);
    extractor.ensure_available().unwrap();

    let mut settings = PipelineSettings::new(
        StorageLayout::new(dir.path().join("videos"), DEFAULT_PUBLIC_PREFIX),
        dir.path().join("downloaded_ids.json"),
    );
    settings.page_size = page_size;
    Pipeline::new(extractor, settings)
}

fn calls(dir: &TempDir) -> Vec<String> {
    fs::read_to_string(dir.path().join("calls.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn keyword_run_skips_failed_item_and_records_the_rest() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline(&dir, 50);

    let report = pipeline
        .run(&SearchRequest::keyword("cats", 3).unwrap())
        .unwrap();

    assert_eq!(
        report.video_urls(),
        vec!["/videosList/1_k1_combined.mp4", "/videosList/3_k3_combined.mp4"]
    );
    assert!(dir.path().join("videos/1_k1_combined.mp4").is_file());
    assert!(!dir.path().join("videos/2_k2_combined.mp4").exists());
    assert_eq!(report.failed(), 1);

    let ledger = Ledger::load(&dir.path().join("downloaded_ids.json")).unwrap();
    assert!(ledger.contains("k1"));
    assert!(!ledger.contains("k2"));
    assert!(ledger.contains("k3"));

    assert!(
        calls(&dir)
            .iter()
            .any(|call| call.ends_with("ytsearch50:cats shorts"))
    );
}

#[test]
fn channel_run_pages_through_shorts_tab() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline(&dir, 2);

    let report = pipeline
        .run(&SearchRequest::channel("https://www.youtube.com/@stub", 3).unwrap())
        .unwrap();

    assert_eq!(report.channel_name.as_deref(), Some("Stub_Channel"));
    assert_eq!(
        report.video_urls(),
        vec![
            "/videosList/Stub_Channel/1_c1_combined.mp4",
            "/videosList/Stub_Channel/2_c2_combined.mp4",
            "/videosList/Stub_Channel/3_c3_combined.mp4",
        ]
    );

    let calls = calls(&dir);
    assert!(
        calls
            .iter()
            .any(|call| call.contains("--playlist-items 1:2") && call.ends_with("/@stub/shorts"))
    );
    assert!(calls.iter().any(|call| call.contains("--playlist-items 3:4")));
}

#[test]
fn rerun_after_everything_was_downloaded_is_empty_success() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline(&dir, 2);
    let request = SearchRequest::channel("@stub", 5).unwrap();

    assert_eq!(pipeline.run(&request).unwrap().video_urls().len(), 3);
    let second = pipeline.run(&request).unwrap();
    assert!(second.video_urls().is_empty());
}

#[test]
fn every_failure_is_batch_failed() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("downloaded_ids.json"),
        r#"["k1","k3","k4"]"#,
    )
    .unwrap();
    let pipeline = pipeline(&dir, 50);

    let err = pipeline
        .run(&SearchRequest::keyword("cats", 1).unwrap())
        .unwrap_err();
    assert!(matches!(err, PipelineError::BatchFailed { attempted: 1 }));
}
