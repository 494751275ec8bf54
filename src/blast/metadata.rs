use crate::TaedError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-hit metadata: hit key -> field name -> value (e.g. a gene tree URL)
pub type HitMetadata = BTreeMap<String, BTreeMap<String, String>>;

/// Supplies the metadata filters consult when preparing a result
pub trait MetadataSource: Send + Sync {
    fn load(&self) -> Result<HitMetadata, TaedError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyMetadata;

impl MetadataSource for EmptyMetadata {
    fn load(&self) -> Result<HitMetadata, TaedError> {
        Ok(HitMetadata::new())
    }
}

/// Metadata kept in a JSON object of objects on disk
#[derive(Debug, Clone)]
pub struct JsonFileMetadata {
    path: PathBuf,
}

impl JsonFileMetadata {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MetadataSource for JsonFileMetadata {
    fn load(&self) -> Result<HitMetadata, TaedError> {
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            TaedError::Parse(format!("Invalid metadata file {}: {}", self.path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_metadata_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, r#"{"NP_001": {"tree_url": "http://host/tree.nhx"}}"#).unwrap();

        let metadata = JsonFileMetadata::new(&path).load().unwrap();
        assert_eq!(metadata["NP_001"]["tree_url"], "http://host/tree.nhx");
        assert!(EmptyMetadata.load().unwrap().is_empty());
    }

    #[test]
    fn test_bad_metadata_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(JsonFileMetadata::new(&path).load(), Err(TaedError::Parse(_))));
    }
}
