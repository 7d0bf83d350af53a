//! Filesystem source-data loader

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use chargen_domain::{BuilderKey, SourceData};

use crate::ports::{SourceLoadError, SourceLoaderPort};

/// Reads one JSON rules document per builder key from a content directory:
/// `<content_dir>/<builder_key>.json`.
#[derive(Debug, Clone)]
pub struct FsSourceLoader {
    content_dir: PathBuf,
}

impl FsSourceLoader {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    fn path_for(&self, builder_key: &BuilderKey) -> PathBuf {
        self.content_dir.join(format!("{builder_key}.json"))
    }
}

#[async_trait]
impl SourceLoaderPort for FsSourceLoader {
    async fn fetch(&self, builder_key: &BuilderKey) -> Result<SourceData, SourceLoadError> {
        let path = self.path_for(builder_key);
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceLoadError::NotFound(builder_key.to_string()),
            _ => SourceLoadError::Io(e.to_string()),
        })?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| SourceLoadError::Parse(e.to_string()))?;
        debug!(builder = %builder_key, path = %path.display(), "loaded rules content");
        Ok(SourceData::new(value))
    }
}
