use std::fs;
use std::path::{Path, PathBuf};

use eyre::Result;

const SCROLL_OFFSET_FILE: &str = "chat_scroll_position";

/// Scratch state that lives for one launch-to-launch hop: written on exit,
/// consumed on the next start.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("lingxi-chat");
        Self { dir }
    }

    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn save_scroll_offset(&self, offset: u64) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(SCROLL_OFFSET_FILE), offset.to_string())?;
        Ok(())
    }

    /// Read the saved offset and remove it.
    pub fn take_scroll_offset(&self) -> Option<u64> {
        let path = self.dir.join(SCROLL_OFFSET_FILE);
        let raw = fs::read_to_string(&path).ok()?;
        if let Err(e) = fs::remove_file(&path) {
            tracing::debug!("Failed to remove {}: {}", path.display(), e);
        }
        raw.trim().parse().ok()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
