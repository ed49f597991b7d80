use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use uuid::Uuid;

use super::upload::UploadedFile;
use super::IngestionError;

pub const DEFAULT_SESSION_PREFIX: &str = "estate_session";

/// Extensions accepted by default (lowercase, with dot).
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".pdf"];

/// `<prefix>_<YYYYMMDD_HHMMSS>_<8 hex chars>`, timestamp in UTC.
pub fn generate_session_id(prefix: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    let session_id = format!("{prefix}_{timestamp}_{}", &unique[..8]);
    tracing::info!(session_id = %session_id, "Generated session ID");
    session_id
}

/// A directory grouping the files of one analysis or comparison request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    path: PathBuf,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates session directories under a data root and stores uploads in them.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
    allowed_extensions: Vec<String>,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// Replace the accepted extensions. A leading dot is optional.
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .collect();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_allowed(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.allowed_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// Create (or reopen) a session directory. Idempotent.
    pub fn create_session(&self, session_id: Option<&str>) -> Result<Session, IngestionError> {
        let id = match session_id {
            Some(id) => {
                validate_session_id(id)?;
                id.to_string()
            }
            None => generate_session_id(DEFAULT_SESSION_PREFIX),
        };
        let path = self.data_dir.join(&id);

        std::fs::create_dir_all(&path).map_err(|source| {
            tracing::error!(session_id = %id, error = %source, "Failed to create session directory");
            IngestionError::Io {
                session_id: id.clone(),
                path: path.clone(),
                source,
            }
        })?;

        tracing::info!(session_id = %id, session_path = %path.display(), "Session ready");
        Ok(Session { id, path })
    }

    /// Store an upload in the session. Only the base name of the upload is used.
    pub fn save_file(
        &self,
        session: &Session,
        upload: &dyn UploadedFile,
    ) -> Result<PathBuf, IngestionError> {
        let file_name = base_name(upload.name())
            .ok_or_else(|| IngestionError::InvalidFileName(upload.name().to_string()))?;

        if !self.is_allowed(&file_name) {
            tracing::error!(
                session_id = %session.id,
                file = %file_name,
                "Rejected upload with unsupported extension"
            );
            return Err(IngestionError::InvalidFileType {
                file_name,
                allowed: self.allowed_extensions.join(", "),
            });
        }

        let bytes = upload.bytes().map_err(|source| IngestionError::UploadRead {
            file_name: file_name.clone(),
            source,
        })?;

        let io_err = |path: &Path, source: std::io::Error| {
            tracing::error!(session_id = %session.id, error = %source, "Failed to save upload");
            IngestionError::Io {
                session_id: session.id.clone(),
                path: path.to_path_buf(),
                source,
            }
        };

        std::fs::create_dir_all(&session.path).map_err(|e| io_err(&session.path, e))?;
        let save_path = session.path.join(&file_name);
        std::fs::write(&save_path, bytes.as_ref()).map_err(|e| io_err(&save_path, e))?;

        tracing::info!(
            session_id = %session.id,
            file = %file_name,
            save_path = %save_path.display(),
            size = bytes.len(),
            "Upload saved"
        );
        Ok(save_path)
    }

    /// Store several uploads in order. Stops at the first failure.
    ///
    /// Uploads whose base names collide (case-insensitively) are rejected
    /// before anything is written, since one would overwrite the other.
    pub fn save_files(
        &self,
        session: &Session,
        uploads: &[&dyn UploadedFile],
    ) -> Result<Vec<PathBuf>, IngestionError> {
        let mut seen = HashSet::new();
        for upload in uploads {
            let Some(file_name) = base_name(upload.name()) else {
                continue;
            };
            if !seen.insert(file_name.to_lowercase()) {
                tracing::error!(
                    session_id = %session.id,
                    file = %file_name,
                    "Rejected upload batch with duplicate file names"
                );
                return Err(IngestionError::DuplicateFileName(file_name));
            }
        }

        uploads
            .iter()
            .map(|upload| self.save_file(session, *upload))
            .collect()
    }

    /// Stored files with an allowed extension, in lexicographic name order.
    pub fn list_files(&self, session: &Session) -> Result<Vec<PathBuf>, IngestionError> {
        let entries = std::fs::read_dir(&session.path).map_err(|source| IngestionError::Io {
            session_id: session.id.clone(),
            path: session.path.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IngestionError::Io {
                session_id: session.id.clone(),
                path: session.path.clone(),
                source,
            })?;
            let path = entry.path();
            let allowed = path.is_file()
                && path
                    .file_name()
                    .map(|n| self.is_allowed(&n.to_string_lossy()))
                    .unwrap_or(false);
            if allowed {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Keep the newest `keep_latest` session directories and delete the rest.
    ///
    /// Newest means most recently modified, ties broken by descending
    /// session id (generated ids embed their UTC creation time). Must not
    /// run concurrently with a read of a session it may delete.
    pub fn clean_old_sessions(&self, keep_latest: usize) -> Result<Vec<PathBuf>, IngestionError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let root_err = |source| IngestionError::Io {
            session_id: String::new(),
            path: self.data_dir.clone(),
            source,
        };

        let mut sessions: Vec<(SystemTime, String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir).map_err(root_err)? {
            let entry = entry.map_err(root_err)?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name().to_string_lossy().into_owned();
            sessions.push((modified, name, path));
        }

        sessions.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let mut removed = Vec::new();
        for (_, name, path) in sessions.into_iter().skip(keep_latest) {
            std::fs::remove_dir_all(&path).map_err(|source| {
                tracing::error!(session_id = %name, error = %source, "Failed to delete old session");
                IngestionError::Io {
                    session_id: name.clone(),
                    path: path.clone(),
                    source,
                }
            })?;
            tracing::info!(session_id = %name, "Old session deleted");
            removed.push(path);
        }
        Ok(removed)
    }
}

fn validate_session_id(id: &str) -> Result<(), IngestionError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(IngestionError::InvalidSessionId(id.to_string()))
    }
}

/// Strip any directory components from an uploaded file name.
fn base_name(name: &str) -> Option<String> {
    let trimmed = name.rsplit(['/', '\\']).next()?.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        None
    } else {
        Some(trimmed.to_string())
    }
}
