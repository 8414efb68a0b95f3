use crate::media::MediaSlot;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One uploaded file persisted to the request spool.
///
/// Plain descriptor: the owning [`RequestSpool`] deletes the backing file,
/// so a descriptor never outlives its request.
#[derive(Debug)]
pub struct SpooledUpload {
    pub slot: MediaSlot,
    pub path: PathBuf,
    /// Byte count as received from the transport.
    pub size: usize,
    /// Content type declared by the client. Untrusted; log-only.
    pub declared_type: Option<String>,
    /// Filename declared by the client. Untrusted; log-only.
    pub declared_name: Option<String>,
}

/// Per-request temporary storage rooted in its own directory.
///
/// Every upload the decoder produces lands in here, and the directory is
/// removed exactly once: eagerly via [`close`](Self::close) on ordinary
/// paths, or by `Drop` when the handler unwinds or is cancelled.
pub struct RequestSpool {
    dir: tempfile::TempDir,
}

impl RequestSpool {
    pub fn create(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("mediarelay-")
            .tempdir_in(root)
            .with_context(|| format!("failed to create spool dir under {}", root.display()))?;
        Ok(Self { dir })
    }

    /// Write one upload's bytes into the spool and hand back its descriptor.
    pub async fn save(
        &self,
        slot: MediaSlot,
        bytes: &[u8],
        declared_type: Option<String>,
        declared_name: Option<String>,
    ) -> Result<SpooledUpload> {
        let path = self.dir.path().join(slot.field_name());
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to spool {} upload", slot))?;
        debug!("spooled {} ({} bytes) to {}", slot, bytes.len(), path.display());
        Ok(SpooledUpload {
            slot,
            path,
            size: bytes.len(),
            declared_type,
            declared_name,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the spool directory and everything in it. Failures are logged
    /// and swallowed; the request's outcome is already decided when this
    /// runs and a cleanup error must not change it.
    pub fn close(self) {
        if let Err(e) = self.dir.close() {
            warn!("failed to remove request spool: {}", e);
        }
    }
}
