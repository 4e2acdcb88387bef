use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
enum Origin {
    Memory(Arc<[u8]>),
    /// Read lazily; the file may disappear between selection and upload.
    Disk(PathBuf),
}

/// A file picked for upload.
///
/// Cloning is cheap: in-memory contents are shared, on-disk files are only a
/// path. Size and media type are captured at selection time so admission can
/// run without touching the contents.
#[derive(Clone)]
pub struct SourceFile {
    name: String,
    media_type: String,
    size: u64,
    origin: Origin,
}

impl SourceFile {
    /// Wrap contents that are already in memory.
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: data.len() as u64,
            origin: Origin::Memory(data),
        }
    }

    /// Describe a file on disk. The media type is guessed from the extension.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let metadata = tokio::fs::metadata(path).await.or_raise(|| ErrorKind::Read(path.display().to_string()))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::Read(path.display().to_string()));
        }
        Ok(Self {
            media_type: media_type_for(path),
            size: metadata.len(),
            origin: Origin::Disk(path.to_path_buf()),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercased extension of the file name, if there is one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name).extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Load the file contents.
    pub async fn read(&self) -> Result<Arc<[u8]>> {
        match &self.origin {
            Origin::Memory(data) => Ok(Arc::clone(data)),
            Origin::Disk(path) => {
                let data = tokio::fs::read(path).await.or_raise(|| ErrorKind::Read(self.name.clone()))?;
                Ok(Arc::from(data))
            },
        }
    }
}

impl fmt::Debug for SourceFile {
    // Contents are never printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::Memory(_) => "memory".to_string(),
            Origin::Disk(path) => path.display().to_string(),
        };
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .field("origin", &origin)
            .finish()
    }
}

/// Best-effort media type from a file extension. Anything unknown is
/// `application/octet-stream`, which no [`MediaKind`](crate::policy::MediaKind) accepts.
pub(crate) fn media_type_for(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}
