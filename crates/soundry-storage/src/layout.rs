//! Upload, output, and scratch areas on disk.
//!
//! # Design
//! - Paths are built from [`FileIdentity`] only; client filenames never reach
//!   the filesystem.
//! - Uploads are created with create-new semantics so a file is never
//!   overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::identity::{FileIdentity, parse_artifact_name};

/// Persisted client upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Token and extension of the upload.
    pub identity: FileIdentity,
    /// Location inside the upload area.
    pub path: PathBuf,
    /// Filesystem modification time after the write completed.
    pub created_at: DateTime<Utc>,
    /// Payload size in bytes.
    pub size: u64,
}

/// Backend result located in the output area.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    /// Token and extension of the artifact.
    pub identity: FileIdentity,
    /// Location inside the output area.
    pub path: PathBuf,
    /// Filesystem modification time.
    pub created_at: DateTime<Utc>,
}

impl OutputArtifact {
    /// Name handed to clients and used for downloads.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.identity.file_name()
    }

    /// Content type served for this artifact.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.identity.extension.content_type()
    }
}

/// The three directories the service writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl StorageLayout {
    /// Describe a layout; nothing is created until [`Self::ensure_directories`].
    #[must_use]
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Upload area.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Output area.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scratch area for external tools.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Create every directory that does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when a directory cannot be created.
    pub fn ensure_directories(&self) -> StorageResult<()> {
        for dir in [&self.upload_dir, &self.output_dir, &self.scratch_dir] {
            fs::create_dir_all(dir)
                .map_err(|source| StorageError::io("layout.create_dir", dir, source))?;
        }
        Ok(())
    }

    /// Path an upload with `identity` is stored at.
    #[must_use]
    pub fn upload_path(&self, identity: &FileIdentity) -> PathBuf {
        self.upload_dir.join(identity.file_name())
    }

    /// Path an artifact with `identity` is stored at.
    #[must_use]
    pub fn output_path(&self, identity: &FileIdentity) -> PathBuf {
        self.output_dir.join(identity.file_name())
    }

    /// Write `payload` verbatim to a new file in the upload area.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the file already exists or cannot be
    /// written. A partially written file is removed before returning.
    pub async fn persist_upload(
        &self,
        identity: FileIdentity,
        payload: &[u8],
    ) -> StorageResult<Upload> {
        let path = self.upload_path(&identity);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StorageError::io("upload.create", &path, source))?;

        let written = async {
            file.write_all(payload).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        if let Err(source) = written {
            discard(&path).await;
            return Err(StorageError::io("upload.write", &path, source));
        }

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| StorageError::io("upload.metadata", &path, source))?;
        debug!(path = %path.display(), bytes = metadata.len(), "upload persisted");
        Ok(Upload {
            identity,
            created_at: modified_at(&metadata),
            size: metadata.len(),
            path,
        })
    }

    /// Look up a produced artifact by the name clients were given.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ArtifactNotFound`] when the name is malformed
    /// or no regular file exists under it, and [`StorageError::Io`] for other
    /// filesystem failures.
    pub async fn resolve_artifact(&self, name: &str) -> StorageResult<OutputArtifact> {
        let not_found = || StorageError::ArtifactNotFound {
            name: name.to_string(),
        };
        let identity = parse_artifact_name(name).ok_or_else(not_found)?;
        let path = self.output_path(&identity);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(source) => return Err(StorageError::io("artifact.metadata", &path, source)),
        };
        if !metadata.is_file() {
            return Err(not_found());
        }
        Ok(OutputArtifact {
            identity,
            created_at: modified_at(&metadata),
            path,
        })
    }

    /// Read the bytes of a resolved artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ArtifactNotFound`] if the file vanished since it
    /// was resolved, [`StorageError::Io`] otherwise.
    pub async fn read_artifact(&self, artifact: &OutputArtifact) -> StorageResult<Vec<u8>> {
        tokio::fs::read(&artifact.path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::ArtifactNotFound {
                    name: artifact.file_name(),
                }
            } else {
                StorageError::io("artifact.read", &artifact.path, source)
            }
        })
    }

    /// Confirm a backend left a regular file at the artifact path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ArtifactNotFound`] when nothing usable exists.
    pub async fn confirm_output(&self, identity: FileIdentity) -> StorageResult<OutputArtifact> {
        self.resolve_artifact(&identity.file_name()).await
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial upload"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, path = %path.display(), "failed to remove partial upload"),
    }
}

fn modified_at(metadata: &fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AudioExtension;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn layout_in(root: &Path) -> StorageLayout {
        StorageLayout::new(root.join("uploads"), root.join("outputs"), root.join("separated"))
    }

    #[test]
    fn ensure_directories_creates_all_areas() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;
        layout.ensure_directories()?;
        assert!(layout.upload_dir().is_dir());
        assert!(layout.output_dir().is_dir());
        assert!(layout.scratch_dir().is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn persist_upload_writes_payload_under_token_name() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;

        let identity = FileIdentity::new_upload(AudioExtension::Ogg);
        let upload = layout.persist_upload(identity, b"OggS-payload").await?;

        assert_eq!(upload.path, layout.upload_dir().join(identity.file_name()));
        assert_eq!(upload.size, 12);
        assert_eq!(fs::read(&upload.path)?, b"OggS-payload");
        Ok(())
    }

    #[tokio::test]
    async fn persist_upload_never_overwrites() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;

        let identity = FileIdentity::new_upload(AudioExtension::Wav);
        layout.persist_upload(identity, b"first").await?;
        let err = layout.persist_upload(identity, b"second").await;

        assert!(matches!(
            err,
            Err(StorageError::Io {
                operation: "upload.create",
                ..
            })
        ));
        assert_eq!(fs::read(layout.upload_path(&identity))?, b"first");
        Ok(())
    }

    #[tokio::test]
    async fn resolve_artifact_finds_written_output() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;

        let identity = FileIdentity::new_upload(AudioExtension::Wav);
        fs::write(layout.output_path(&identity), b"RIFF")?;

        let artifact = layout.resolve_artifact(&identity.file_name()).await?;
        assert_eq!(artifact.content_type(), "audio/wav");
        assert_eq!(layout.read_artifact(&artifact).await?, b"RIFF");
        Ok(())
    }

    #[tokio::test]
    async fn resolve_artifact_reports_missing_and_malformed_names() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;

        let never_written = FileIdentity::new_upload(AudioExtension::Wav).file_name();
        for name in [never_written.as_str(), "../secrets.wav", "nothing"] {
            assert!(matches!(
                layout.resolve_artifact(name).await,
                Err(StorageError::ArtifactNotFound { .. })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn directory_under_artifact_name_is_not_served() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout_in(temp.path());
        layout.ensure_directories()?;

        let identity = FileIdentity::new_upload(AudioExtension::Mp3);
        fs::create_dir(layout.output_path(&identity))?;
        assert!(matches!(
            layout.confirm_output(identity).await,
            Err(StorageError::ArtifactNotFound { .. })
        ));
        Ok(())
    }
}
