//! Final video assembly from chunk videos.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_media::{move_file, write_manifest, MediaBackend};
use slidecast_models::EncodingProfile;
use tracing::{info, warn};

use crate::cleanup::TempRegistry;
use crate::error::{PipelineError, PipelineResult};
use crate::pool::ToolPool;

/// Joins chunk videos in index order.
///
/// Two or more chunks are first joined by stream copy through a concat
/// manifest; if that fails every chunk is re-encoded with the chunk profile.
pub struct Concatenator {
    media: Arc<dyn MediaBackend>,
    pool: ToolPool,
    profile: EncodingProfile,
}

impl Concatenator {
    pub fn new(media: Arc<dyn MediaBackend>, pool: ToolPool, profile: EncodingProfile) -> Self {
        Self {
            media,
            pool,
            profile,
        }
    }

    /// Join `chunks` into `output`. Returns `None` when there is nothing to join.
    ///
    /// The manifest is written to `scratch` and registered for cleanup.
    pub async fn join(
        &self,
        chunks: &[PathBuf],
        output: &Path,
        scratch: &Path,
        registry: &TempRegistry,
    ) -> PipelineResult<Option<PathBuf>> {
        match chunks {
            [] => {
                info!("No chunk videos to join");
                Ok(None)
            }
            [single] => {
                info!("Single chunk, moving {} -> {}", single.display(), output.display());
                move_file(single, output)
                    .await
                    .map_err(|e| PipelineError::Finalize(e.to_string()))?;
                Ok(Some(output.to_path_buf()))
            }
            _ => {
                self.join_many(chunks, output, scratch, registry).await?;
                Ok(Some(output.to_path_buf()))
            }
        }
    }

    async fn join_many(
        &self,
        chunks: &[PathBuf],
        output: &Path,
        scratch: &Path,
        registry: &TempRegistry,
    ) -> PipelineResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let manifest = scratch.join("concat_list.txt");
        registry.register(&manifest);
        write_manifest(chunks, &manifest).await?;

        let stream_copy = self
            .pool
            .run(self.media.concat_stream_copy(&manifest, output))
            .await?;

        let stream_copy_err = match stream_copy {
            Ok(()) => {
                info!("Joined {} chunks by stream copy", chunks.len());
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(
            "Stream-copy join failed, re-encoding {} chunks: {}",
            chunks.len(),
            stream_copy_err
        );
        metrics::counter!("slidecast_concat_fallbacks_total").increment(1);

        let reencode = self
            .pool
            .run(self.media.concat_reencode(chunks, output, &self.profile))
            .await?;

        match reencode {
            Ok(()) => {
                info!("Joined {} chunks by re-encode", chunks.len());
                Ok(())
            }
            Err(reencode_err) => {
                // Never leave a half-written final video behind.
                if let Err(e) = tokio::fs::remove_file(output).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial output {}: {}", output.display(), e);
                    }
                }
                Err(PipelineError::ConcatFailed {
                    stream_copy: stream_copy_err.to_string(),
                    reencode: reencode_err.to_string(),
                })
            }
        }
    }
}
