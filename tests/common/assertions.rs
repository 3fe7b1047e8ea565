//! Custom test assertions for integration tests

use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use vault_dl::Event;

/// Relative paths of every file under `root`, sorted
pub fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Collect events until `RunComplete` (inclusive) or the timeout
pub async fn collect_events_until_complete(
    mut events: broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = matches!(event, Event::RunComplete(_));
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    collected
}

/// Lines of a text file, or nothing if it does not exist
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
