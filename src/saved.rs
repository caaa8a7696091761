use std::path::{Path, PathBuf};

use eyre::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-authored system prompt kept on the client side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// Key-value storage for saved prompts
pub trait PromptStore {
    fn list(&self) -> Result<Vec<SavedPrompt>>;
    fn add(&self, name: &str, content: &str) -> Result<SavedPrompt>;
    /// Returns whether anything was removed
    fn remove(&self, id: &str) -> Result<bool>;

    /// Look up by exact id, then by name
    fn find(&self, name_or_id: &str) -> Result<Option<SavedPrompt>> {
        let prompts = self.list()?;
        Ok(prompts
            .iter()
            .find(|p| p.id == name_or_id)
            .or_else(|| prompts.iter().find(|p| p.name == name_or_id))
            .cloned())
    }
}

pub fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytgen")
        .join("prompts.json")
}

/// Prompts stored as a JSON array in a single file
pub struct FilePromptStore {
    path: PathBuf,
}

impl FilePromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, prompts: &[SavedPrompt]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(prompts)?;
        std::fs::write(&self.path, data)?;
        debug!("Saved {} prompts to {}", prompts.len(), self.path.display());
        Ok(())
    }
}

impl PromptStore for FilePromptStore {
    fn list(&self) -> Result<Vec<SavedPrompt>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let prompts = serde_json::from_str(&data)?;
        Ok(prompts)
    }

    fn add(&self, name: &str, content: &str) -> Result<SavedPrompt> {
        let name = name.trim();
        if name.is_empty() || content.trim().is_empty() {
            bail!("prompt name and content must not be empty");
        }

        let mut prompts = self.list()?;
        if prompts.iter().any(|p| p.name == name) {
            bail!("a prompt named '{name}' already exists");
        }

        let prompt = SavedPrompt {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            content: content.to_string(),
        };
        prompts.push(prompt.clone());
        self.write(&prompts)?;
        Ok(prompt)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut prompts = self.list()?;
        let before = prompts.len();
        prompts.retain(|p| p.id != id);
        if prompts.len() == before {
            return Ok(false);
        }
        self.write(&prompts)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FilePromptStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePromptStore::new(dir.path().join("nested").join("prompts.json"));
        (dir, store)
    }

    #[test]
    fn test_empty_when_missing() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());
        assert!(store.find("anything").unwrap().is_none());
    }

    #[test]
    fn test_add_find_remove() {
        let (_dir, store) = store();
        let saved = store.add("丁寧", "丁寧語で要約してください").unwrap();
        assert_eq!(saved.id.len(), 36);

        assert_eq!(store.find("丁寧").unwrap().unwrap().content, "丁寧語で要約してください");
        assert_eq!(store.find(&saved.id).unwrap().unwrap().name, "丁寧");

        assert!(store.remove(&saved.id).unwrap());
        assert!(!store.remove(&saved.id).unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_blanks() {
        let (_dir, store) = store();
        store.add("a", "x").unwrap();
        assert!(store.add("a", "y").is_err());
        assert!(store.add(" ", "y").is_err());
        assert!(store.add("b", "  ").is_err());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_persists_across_instances() {
        let (_dir, store) = store();
        store.add("keep", "content").unwrap();
        let reopened = FilePromptStore::new(store.path());
        assert_eq!(reopened.list().unwrap().len(), 1);
    }
}
