use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::json_file::read_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Lessons,
    Challenges,
}

impl CatalogKind {
    /// Field each catalog entry is keyed by.
    pub fn id_field(self) -> &'static str {
        match self {
            CatalogKind::Lessons => "lesson_id",
            CatalogKind::Challenges => "challenge_id",
        }
    }
}

/// Read-only lesson and challenge catalogs, re-read on every request.
pub struct CatalogStore {
    lessons_path: PathBuf,
    challenges_path: PathBuf,
}

impl CatalogStore {
    pub fn new(lessons_path: impl Into<PathBuf>, challenges_path: impl Into<PathBuf>) -> Self {
        Self {
            lessons_path: lessons_path.into(),
            challenges_path: challenges_path.into(),
        }
    }

    fn path(&self, kind: CatalogKind) -> &Path {
        match kind {
            CatalogKind::Lessons => &self.lessons_path,
            CatalogKind::Challenges => &self.challenges_path,
        }
    }

    /// Load a catalog indexed by id. A missing or malformed catalog is empty.
    ///
    /// Unlike the profile store, which turns read errors other than not-found
    /// into a 500, every read error here is logged and served as an empty
    /// catalog: catalogs are read-only content and nothing is written back.
    pub async fn load(&self, kind: CatalogKind) -> Map<String, Value> {
        let path = self.path(kind);
        let entries = match read_json::<Value>(path).await {
            Ok(Some(Value::Array(entries))) => entries,
            Ok(Some(_)) => {
                tracing::warn!("Catalog {} is not a list; serving it empty", path.display());
                return Map::new();
            }
            Ok(None) => return Map::new(),
            Err(e) => {
                tracing::error!("Catalog unavailable, serving it empty: {}", e);
                return Map::new();
            }
        };

        index_by_id(entries, kind.id_field())
    }
}

fn index_by_id(entries: Vec<Value>, id_field: &str) -> Map<String, Value> {
    let mut by_id = Map::new();
    for entry in entries {
        let key = match entry.get(id_field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        by_id.insert(key, entry);
    }
    by_id
}
