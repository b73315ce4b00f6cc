use super::Session;
use std::{
    fmt::Debug,
    fs::{self, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

/// Somewhere a [`Session`] can be kept between runs.
///
/// Implementations must write and remove the session as a single unit. A
/// reader should never be able to observe a token without its user id.
pub trait SessionStorage: Debug + Send + Sync {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Errors from a [`SessionStorage`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unable to access the session file at \"{}\"", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        inner: io::Error,
    },
    #[error("The session file at \"{}\" is corrupt", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        inner: serde_json::Error,
    },
    #[error("Unable to serialize the session")]
    Serialize(#[source] serde_json::Error),
}

/// Keeps the session in memory, forgetting it when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn new() -> Self { MemoryStorage::default() }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let session =
            self.session.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(session.clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Persists the session as a small JSON document with the `user_id`,
/// `email`, and `token` keys.
///
/// On unix the file is only readable and writable by its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn io_error(&self, inner: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            inner,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_slice(&raw).map(Some).map_err(|inner| {
            StorageError::Corrupt {
                path: self.path.clone(),
                inner,
            }
        })
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let raw = serde_json::to_vec_pretty(session)
            .map_err(StorageError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        // write everything to the side, then swap it in so readers see
        // either the old session or the new one
        let temp = self.temp_path();
        write_private(&temp, &raw).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;

        log::trace!("Saved the session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Write `contents` to a brand new file which only the current user can
/// access.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    // the mode only applies when the file is created, so never reuse a
    // leftover temp file
    match fs::remove_file(path) {
        Ok(()) => {},
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
