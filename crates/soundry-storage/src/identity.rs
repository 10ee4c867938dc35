//! File identities: the accepted audio extensions, upload tokens, and the
//! `<token>.<extension>` artifact names derived from them.

use std::fmt;
use std::path::Path;

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Audio container extensions accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioExtension {
    /// RIFF/WAVE.
    Wav,
    /// MPEG-1 layer III.
    Mp3,
    /// Ogg container.
    Ogg,
    /// MPEG-4 audio.
    M4a,
}

impl AudioExtension {
    /// Every accepted extension.
    pub const ALL: [Self; 4] = [Self::Wav, Self::Mp3, Self::Ogg, Self::M4a];

    /// Lowercase extension without the leading dot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
        }
    }

    /// Match `value` against the allow-list, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str().eq_ignore_ascii_case(value))
    }

    /// Extract and check the extension of a client-supplied filename.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedFileType`] when the filename has no
    /// extension or one outside the allow-list.
    pub fn from_filename(filename: &str) -> StorageResult<Self> {
        let raw = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str());
        raw.and_then(Self::parse)
            .ok_or_else(|| StorageError::UnsupportedFileType {
                value: raw.map(str::to_string),
            })
    }

    /// Content type served for artifacts with this extension.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 | Self::Ogg | Self::M4a => "audio/mpeg",
        }
    }
}

impl fmt::Display for AudioExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random identifier assigned to an upload and reused by its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadToken(Uuid);

impl UploadToken {
    /// Generate a fresh v4 token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the 32 lowercase hex digit rendering produced by [`Display`](fmt::Display).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == 32
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return None;
        }
        Uuid::try_parse(value).ok().map(Self)
    }
}

impl fmt::Display for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Token plus extension; the only thing that determines an on-disk name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    /// Request-unique token.
    pub token: UploadToken,
    /// Container extension.
    pub extension: AudioExtension,
}

impl FileIdentity {
    /// Identity for a new upload with a freshly generated token.
    #[must_use]
    pub fn new_upload(extension: AudioExtension) -> Self {
        Self {
            token: UploadToken::generate(),
            extension,
        }
    }

    /// Same token, different container.
    #[must_use]
    pub const fn with_extension(self, extension: AudioExtension) -> Self {
        Self {
            token: self.token,
            extension,
        }
    }

    /// `<token>.<extension>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.token, self.extension)
    }
}

/// Parse an artifact name as handed out to clients.
///
/// Only the exact `<32 lowercase hex>.<lowercase extension>` form is
/// accepted, so the result always maps back to the same name.
#[must_use]
pub fn parse_artifact_name(name: &str) -> Option<FileIdentity> {
    let (token, extension) = name.split_once('.')?;
    let identity = FileIdentity {
        token: UploadToken::parse(token)?,
        extension: AudioExtension::parse(extension)?,
    };
    (identity.file_name() == name).then_some(identity)
}
