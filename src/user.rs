//! Per-machine user identity.
//!
//! A UUID v4 is generated on first launch and persisted under the data
//! directory; later launches reuse it. A real login flow will replace
//! this.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use uuid::Uuid;

pub struct UserManager {
    user_id: String,
}

impl UserManager {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("user_id.txt");

        if path.exists() {
            let stored = fs::read_to_string(&path)
                .with_context(|| format!("failed to read user id from {}", path.display()))?;
            let stored = stored.trim();
            if !stored.is_empty() {
                return Ok(Self {
                    user_id: stored.to_string(),
                });
            }
        }

        let user_id = Uuid::new_v4().to_string();
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        fs::write(&path, &user_id)
            .with_context(|| format!("failed to write user id to {}", path.display()))?;
        info!("Generated new user id: {user_id}");

        Ok(Self { user_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir()
            .join("focusd-tests")
            .join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn id_is_stable_across_loads() {
        let dir = temp_dir();

        let first = UserManager::load_or_create(&dir).unwrap();
        let second = UserManager::load_or_create(&dir).unwrap();

        assert_eq!(first.user_id(), second.user_id());
        assert!(!first.user_id().is_empty());
    }

    #[test]
    fn empty_id_file_is_regenerated() {
        let dir = temp_dir();
        fs::write(dir.join("user_id.txt"), "  \n").unwrap();

        let manager = UserManager::load_or_create(&dir).unwrap();
        assert!(!manager.user_id().is_empty());
    }
}
