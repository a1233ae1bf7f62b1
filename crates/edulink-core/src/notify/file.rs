use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifyError};
use crate::report::Document;
use crate::utils::sanitize_file_name;

/// Writes each document to `<dir>/<file_stem>.report.html`. The stem is
/// sanitised, so it always names a file directly inside `dir`.
#[derive(Debug, Clone)]
pub struct FileNotifier {
    dir: PathBuf,
}

impl FileNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, document: &Document) -> PathBuf {
        self.dir
            .join(format!("{}.report.html", sanitize_file_name(&document.file_stem)))
    }

    fn io_error(path: &Path, source: std::io::Error) -> NotifyError {
        NotifyError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    async fn notify(&self, document: &Document, _recipients: &[String]) -> Result<(), NotifyError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.path_for(document);
        std::fs::write(&path, &document.html).map_err(|e| Self::io_error(&path, e))?;
        info!(path = %path.display(), "Wrote report");
        Ok(())
    }
}
