use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::conversation::{normalize, Conversation, StoredConversation};

use super::{HistoryStore, PersistenceError};

/// One JSON history document per user under a data directory.
///
/// Legacy documents (bare prompt strings among the entries) are migrated to
/// the structured shape at load time.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_stem(user_id)))
    }
}

/// Restrict a user id to filesystem-safe characters.
fn safe_stem(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn load(&self, user_id: &str) -> Result<Vec<Conversation>, PersistenceError> {
        let path = self.path_for(user_id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let stored: Vec<StoredConversation> = serde_json::from_slice(&data)?;
        Ok(normalize(stored))
    }

    async fn save(
        &self,
        user_id: &str,
        conversations: &[Conversation],
    ) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let payload = serde_json::to_vec_pretty(conversations)?;
        fs::write(self.path_for(user_id), payload)?;
        Ok(())
    }
}
