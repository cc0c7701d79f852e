//! Durable persistence for the active wallet session, so a reload can
//! restore the connection without re-pairing.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::wallet::types::{WalletError, WalletSession};

pub trait SessionStore: Send + Sync {
	fn load(&self) -> Result<Option<WalletSession>, WalletError>;
	fn save(&self, session: &WalletSession) -> Result<(), WalletError>;
	fn clear(&self) -> Result<(), WalletError>;
}

/// JSON file on disk. A corrupt file is treated as no session rather than an
/// error, since the session will be revalidated against the provider anyway.
pub struct FileSessionStore {
	path: PathBuf,
}

impl FileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl SessionStore for FileSessionStore {
	fn load(&self) -> Result<Option<WalletSession>, WalletError> {
		if !self.path.exists() {
			return Ok(None);
		}

		let contents = fs::read_to_string(&self.path)
			.map_err(|e| WalletError::Store(format!("failed to read session file: {e}")))?;

		match serde_json::from_str(&contents) {
			Ok(session) => Ok(Some(session)),
			Err(e) => {
				warn!("discarding unreadable session file: {e}");
				Ok(None)
			}
		}
	}

	fn save(&self, session: &WalletSession) -> Result<(), WalletError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)
					.map_err(|e| WalletError::Store(format!("failed to create {parent:?}: {e}")))?;
			}
		}

		let contents = serde_json::to_string_pretty(session)
			.map_err(|e| WalletError::Store(format!("failed to encode session: {e}")))?;
		fs::write(&self.path, contents)
			.map_err(|e| WalletError::Store(format!("failed to write session file: {e}")))?;

		debug!(path = ?self.path, "session persisted");
		Ok(())
	}

	fn clear(&self) -> Result<(), WalletError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(WalletError::Store(format!(
				"failed to remove session file: {e}"
			))),
		}
	}
}
