use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::AppState;

pub async fn run_cleanup_worker(state: Arc<AppState>) {
    let dir = state.config.video_dir();
    let max_age = state.config.video_cache_max_age();
    let interval = Duration::from_secs(state.config.cleanup_interval);
    info!(
        "video cleanup worker started for {} (max age {}h)",
        dir.display(),
        state.config.video_cache_max_age_hours
    );

    loop {
        match remove_stale_videos(&dir, max_age).await {
            Ok(0) => debug!("no stale videos"),
            Ok(n) => info!("removed {} stale video(s)", n),
            Err(e) => error!("video cleanup failed: {:?}", e),
        }

        sleep(interval).await;
    }
}

/// Deletes `video_*` files in `dir` last modified more than `max_age` ago.
pub async fn remove_stale_videos(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("video_") {
            continue;
        }

        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();

        if age > max_age {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backdate(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[tokio::test]
    async fn test_removes_only_stale_videos() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("video_old_1.mp4");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&old, b"old").unwrap();
        std::fs::write(&notes, b"keep").unwrap();
        std::fs::write(dir.path().join("video_new_2.mp4"), b"new").unwrap();
        backdate(&old, Duration::from_secs(7200));
        backdate(&notes, Duration::from_secs(7200));

        let removed = remove_stale_videos(dir.path(), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(dir.path().join("video_new_2.mp4").exists());
        assert!(notes.exists());
    }

    #[tokio::test]
    async fn test_missing_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let removed = remove_stale_videos(&dir.path().join("absent"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_fresh_videos_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video_a_1.mp4"), b"data").unwrap();

        let removed = remove_stale_videos(dir.path(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}
