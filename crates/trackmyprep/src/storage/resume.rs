use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::StorageError;

/// Longest original extension carried over to a stored filename.
const MAX_EXTENSION_LEN: usize = 16;

/// Upper bound on `_n` suffixes tried when names collide.
const MAX_COLLISION_ATTEMPTS: u32 = 1000;

/// A resume written to disk and the public URL it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResume {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
}

/// Durable storage for uploaded resumes.
///
/// Files land flat in one directory and are named `{epoch-millis}{.ext}`.
/// Each file is created exclusively, so two uploads in the same millisecond
/// get `{millis}.pdf` and `{millis}_2.pdf` instead of overwriting each other.
pub struct ResumeStorage {
    directory: PathBuf,
    public_base_url: String,
    allowed_extensions: Vec<String>,
}

impl ResumeStorage {
    pub fn new<P: AsRef<Path>>(
        directory: P,
        public_base_url: &str,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn ensure_directory(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.directory).map_err(|e| StorageError::CreateDirectory {
            path: self.directory.clone(),
            source: e,
        })
    }

    /// Returns the sanitized extension of `original_name` (without the dot),
    /// or an error when an allow-list is configured and the extension is not
    /// on it.
    pub fn check_extension(&self, original_name: &str) -> Result<Option<String>, StorageError> {
        let ext = sanitized_extension(original_name);
        if self.allowed_extensions.is_empty() {
            return Ok(ext);
        }
        match ext {
            Some(e) if self.allowed_extensions.contains(&e.to_ascii_lowercase()) => Ok(Some(e)),
            other => Err(StorageError::ExtensionNotAllowed(
                other.unwrap_or_default(),
            )),
        }
    }

    /// Writes `content` under a fresh time-derived name.
    pub fn store(&self, original_name: &str, content: &[u8]) -> Result<StoredResume, StorageError> {
        self.store_at(original_name, content, Utc::now().timestamp_millis())
    }

    fn store_at(
        &self,
        original_name: &str,
        content: &[u8],
        millis: i64,
    ) -> Result<StoredResume, StorageError> {
        let ext = self.check_extension(original_name)?;
        self.ensure_directory()?;

        let base = millis.to_string();
        let (path, filename) = self.create_exclusive(&base, ext.as_deref(), content)?;

        log::info!("Stored resume {} ({} bytes)", filename, content.len());

        Ok(StoredResume {
            url: self.url_for(&filename),
            filename,
            path,
        })
    }

    /// Tries `{base}.{ext}`, then `{base}_2.{ext}`, ... using create-new
    /// semantics so that an existing file is never replaced.
    fn create_exclusive(
        &self,
        base: &str,
        ext: Option<&str>,
        content: &[u8],
    ) -> Result<(PathBuf, String), StorageError> {
        use std::io::Write;

        for counter in 1..=MAX_COLLISION_ATTEMPTS {
            let stem = if counter == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, counter)
            };
            let filename = match ext {
                Some(ext) => format!("{}.{}", stem, ext),
                None => stem,
            };
            let path = self.directory.join(&filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
                        // Do not leave a truncated file behind.
                        let _ = std::fs::remove_file(&path);
                        return Err(StorageError::WriteFile { path, source: e });
                    }
                    return Ok((path, filename));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }

        Err(StorageError::FileExists(self.directory.join(base)))
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_base_url, filename)
    }

    /// Maps a requested filename to its on-disk path. Returns `None` for
    /// anything that is not a plain stored filename.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        is_stored_filename(filename).then(|| self.directory.join(filename))
    }

    /// Removes the file behind a URL previously produced by [`url_for`].
    /// URLs pointing elsewhere are left alone. Returns whether a file was
    /// removed.
    ///
    /// [`url_for`]: ResumeStorage::url_for
    pub fn remove_by_url(&self, url: &str) -> Result<bool, StorageError> {
        let Some(filename) = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(false);
        };
        let path = self
            .resolve(filename)
            .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))?;

        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Removed resume {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }
}

/// The extension of `original_name` if it is a short ASCII-alphanumeric run.
fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_string())
}

fn is_stored_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
