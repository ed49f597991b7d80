use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// A file handed to the session store: a name plus its content.
pub trait UploadedFile {
    /// Original file name as provided by the uploader.
    fn name(&self) -> &str;

    fn bytes(&self) -> std::io::Result<Cow<'_, [u8]>>;
}

/// Upload whose content is already in memory.
#[derive(Debug, Clone)]
pub struct MemoryUpload {
    name: String,
    data: Vec<u8>,
}

impl MemoryUpload {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl UploadedFile for MemoryUpload {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.data))
    }
}

/// Upload backed by a file on disk, read lazily.
#[derive(Debug, Clone)]
pub struct PathUpload {
    path: PathBuf,
    name: String,
}

impl PathUpload {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Store the file under `name` instead of its own file name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UploadedFile for PathUpload {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        std::fs::read(&self.path).map(Cow::Owned)
    }
}
