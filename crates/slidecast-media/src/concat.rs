//! Concat-demuxer manifests and stream-copy joins.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the contents of an FFmpeg concat manifest.
///
/// Each line is `file '<absolute path>'`, with embedded single quotes escaped
/// the way the concat demuxer expects.
pub fn build_manifest(paths: &[PathBuf]) -> MediaResult<String> {
    let mut manifest = String::new();
    for path in paths {
        let absolute = absolutize(path)?;
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{}'\n", escaped));
    }
    Ok(manifest)
}

/// Write a manifest for `paths` to `manifest_path`.
pub async fn write_manifest(paths: &[PathBuf], manifest_path: &Path) -> MediaResult<()> {
    let manifest = build_manifest(paths)?;
    tokio::fs::write(manifest_path, manifest).await?;
    Ok(())
}

/// Join the videos listed in `manifest` by stream copy.
pub async fn stream_copy_join(
    runner: &FfmpegRunner,
    manifest: &Path,
    output: &Path,
) -> MediaResult<()> {
    if !manifest.exists() {
        return Err(MediaError::FileNotFound(manifest.to_path_buf()));
    }

    info!(
        "Stream-copy join {} -> {}",
        manifest.display(),
        output.display()
    );

    let cmd = FfmpegCommand::new(output)
        .input_with(["-f", "concat", "-safe", "0"], manifest.to_string_lossy())
        .codec_copy();

    runner.run(&cmd).await
}

fn absolutize(path: &Path) -> MediaResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lists_paths_in_order() {
        let manifest = build_manifest(&[
            PathBuf::from("/tmp/chunk_0.mp4"),
            PathBuf::from("/tmp/chunk_1.mp4"),
            PathBuf::from("/tmp/chunk_2.mp4"),
        ])
        .unwrap();

        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(
            lines,
            vec![
                "file '/tmp/chunk_0.mp4'",
                "file '/tmp/chunk_1.mp4'",
                "file '/tmp/chunk_2.mp4'"
            ]
        );
    }

    #[test]
    fn test_manifest_makes_relative_paths_absolute() {
        let manifest = build_manifest(&[PathBuf::from("rel/chunk.mp4")]).unwrap();
        let path = manifest.trim().trim_start_matches("file '").trim_end_matches('\'');
        assert!(Path::new(path).is_absolute());
        assert!(path.ends_with("rel/chunk.mp4"));
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        let manifest = build_manifest(&[PathBuf::from("/tmp/bob's deck.mp4")]).unwrap();
        assert_eq!(manifest, "file '/tmp/bob'\\''s deck.mp4'\n");
    }

    #[tokio::test]
    async fn test_write_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest_path = dir.path().join("concat.txt");
        write_manifest(&[dir.path().join("a.mp4")], &manifest_path)
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&manifest_path).await.unwrap();
        assert!(contents.starts_with("file '"));
        assert!(contents.contains("a.mp4"));
    }

    #[tokio::test]
    async fn test_stream_copy_requires_manifest() {
        let result = stream_copy_join(
            &FfmpegRunner::new(),
            Path::new("/no/such/manifest.txt"),
            Path::new("/tmp/out.mp4"),
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
