//! Unit state kept as one file per key in a local directory.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use mongo_store::Store;
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::trace;

/// Suffix of the scratch file a value is written to before being renamed
/// into place.
const TMP_SUFFIX: &str = ".tmp";

/// Store using files on disk. Survives process restarts.
#[derive(Clone, Debug)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Creates a new `FsStore` rooted at the specified directory. The
    /// directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, Error> {
        if key.is_empty()
            || key.starts_with('.')
            || key.ends_with(TMP_SUFFIX)
            || key.contains(['/', '\\'])
        {
            return Err(Error::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl Store for FsStore {
    type Error = Error;

    async fn del<K: Into<String> + Send>(&self, key: K) -> Result<(), Self::Error> {
        let path = self.file_path(&key.into())?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io("error deleting file", e)),
        }
    }

    async fn get<K: Into<String> + Send>(&self, key: K) -> Result<Option<Bytes>, Self::Error> {
        let path = self.file_path(&key.into())?;
        match fs::read(path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io("error reading file", e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, Self::Error> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io("error reading directory", e)),
        };
        let mut keys = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Io("error reading directory entry", e))?
        {
            if let Some(key) = entry.file_name().to_str() {
                if !key.ends_with(TMP_SUFFIX) {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();

        Ok(keys)
    }

    async fn put<K: Into<String> + Send>(&self, key: K, bytes: Bytes) -> Result<(), Self::Error> {
        let key = key.into();
        let path = self.file_path(&key)?;
        let tmp_path = self.dir.join(format!("{key}{TMP_SUFFIX}"));

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Io("error creating directory", e))?;

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| Error::Io("error creating file", e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Error::Io("error writing file", e))?;
        file.sync_all()
            .await
            .map_err(|e| Error::Io("error syncing file", e))?;

        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::Io("error renaming file", e))?;

        trace!("stored {} bytes under {}", bytes.len(), key);

        Ok(())
    }
}
