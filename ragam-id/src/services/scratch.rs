//! Request-scoped scratch storage for uploaded audio
//!
//! Each upload lands in the scratch directory under a fresh 128-bit random
//! hex name. The returned [`ScratchFile`] owns that file: `discard()` removes
//! it, and dropping the guard without discarding removes it synchronously.

use rand::RngCore;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Shared scratch directory. Requests only ever touch their own file.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if missing
    pub async fn ensure_exists(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Persist an upload under a new random name
    pub async fn store(
        &self,
        bytes: &[u8],
        content_type: Option<String>,
        original_name: Option<String>,
    ) -> io::Result<ScratchFile> {
        let id = generate_token();
        let path = self.root.join(&id);

        // create_new: never clobber another request's file
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let guard = ScratchFile {
            id,
            path,
            content_type,
            original_name,
            len: bytes.len(),
            removed: false,
        };

        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(scratch_id = %guard.id, bytes = guard.len, "Upload written to scratch");
        Ok(guard)
    }
}

/// 16 random bytes, lowercase hex
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One request's uploaded audio on disk
#[derive(Debug)]
pub struct ScratchFile {
    id: String,
    path: PathBuf,
    content_type: Option<String>,
    original_name: Option<String>,
    len: usize,
    removed: bool,
}

impl ScratchFile {
    /// Random token, also the file name
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content type declared by the client, if any
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File name declared by the client, if any
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Remove the file. Already-missing counts as success.
    pub async fn discard(mut self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.removed = true;
        debug!(scratch_id = %self.id, "Scratch file removed");
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(scratch_id = %self.id, "Scratch file removed on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(scratch_id = %self.id, error = %e, "Failed to remove scratch file"),
        }
    }
}
