use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

pub trait FileStorage: Send + Sync {
    /// Persists `bytes` under `filename` and returns the path recipes store.
    fn save(&self, bytes: &[u8], filename: &str) -> ServiceResult<String>;

    /// Deletes a file previously returned by [`FileStorage::save`]. A file
    /// that is already gone is not an error.
    fn remove(&self, stored_path: &str) -> ServiceResult<()>;
}

/// Writes uploads into a directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStorage {
    /// Files land in `root`; stored paths are `<public_prefix>/<filename>`.
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_owned(),
        }
    }
}

impl FileStorage for LocalFileStorage {
    fn save(&self, bytes: &[u8], filename: &str) -> ServiceResult<String> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(filename), bytes)?;

        debug!(filename, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{filename}", self.public_prefix))
    }

    fn remove(&self, stored_path: &str) -> ServiceResult<()> {
        let filename = stored_path
            .strip_prefix(&self.public_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(stored_path);

        match fs::remove_file(self.root.join(secure_filename(filename))) {
            Ok(()) => {
                debug!(stored_path, "Removed upload");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

pub fn allowed_file(filename: &str, allowed_extensions: &[String]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| {
            let extension = extension.to_ascii_lowercase();
            allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        })
        .unwrap_or(false)
}

/// Keeps the last path component and drops characters outside
/// `[A-Za-z0-9._-]`. Leading dots are removed so no hidden file is created.
pub fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
        })
        .collect();

    cleaned.trim_start_matches('.').to_owned()
}

/// Validates an uploaded image name and stores it, returning the stored path.
pub fn store_image(
    storage: &dyn FileStorage,
    allowed_extensions: &[String],
    bytes: &[u8],
    filename: &str,
) -> ServiceResult<String> {
    let filename = secure_filename(filename);

    if !allowed_file(&filename, allowed_extensions) {
        return Err(ServiceError::validation(
            "image",
            format!(
                "Only {} images are accepted.",
                allowed_extensions.join(", ")
            ),
        ));
    }

    storage.save(bytes, &filename)
}
