//! Attachment model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for an attachment, using UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    /// Create a new unique attachment ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttachmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Ephemeral reference to locally held file bytes, valid until released.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(format!("preview:{}", Uuid::now_v7()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an attachment's bytes currently live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentLocation {
    /// Uploaded object in remote storage
    Remote { path: String, url: String },
    /// Not yet uploaded; bytes are only reachable through the preview handle
    LocalPreview { handle: PreviewHandle },
}

/// Attachment metadata carried on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: AttachmentId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub location: AttachmentLocation,
}

impl Attachment {
    /// Attachment pointing at an uploaded remote object.
    #[must_use]
    pub fn from_ref(reference: AttachmentRef) -> Self {
        Self {
            id: AttachmentId::new(),
            name: reference.name,
            mime_type: reference.mime_type,
            size_bytes: reference.size_bytes,
            location: AttachmentLocation::Remote {
                path: reference.path,
                url: reference.url,
            },
        }
    }

    /// Attachment shown while `file` is still local.
    #[must_use]
    pub fn local_preview(file: &LocalFile, handle: PreviewHandle) -> Self {
        Self {
            id: AttachmentId::new(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes(),
            location: AttachmentLocation::LocalPreview { handle },
        }
    }

    #[must_use]
    pub const fn is_local_preview(&self) -> bool {
        matches!(self.location, AttachmentLocation::LocalPreview { .. })
    }

    /// Remote storage path, if uploaded
    #[must_use]
    pub fn remote_path(&self) -> Option<&str> {
        match &self.location {
            AttachmentLocation::Remote { path, .. } => Some(path),
            AttachmentLocation::LocalPreview { .. } => None,
        }
    }

    /// Reference form used by the attach/detach calls, if uploaded
    #[must_use]
    pub fn to_ref(&self) -> Option<AttachmentRef> {
        match &self.location {
            AttachmentLocation::Remote { path, url } => Some(AttachmentRef {
                path: path.clone(),
                url: url.clone(),
                name: self.name.clone(),
                mime_type: self.mime_type.clone(),
                size_bytes: self.size_bytes,
            }),
            AttachmentLocation::LocalPreview { .. } => None,
        }
    }
}

/// Result of uploading a file: where it landed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub path: String,
    pub url: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// A file picked on this device, not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl LocalFile {
    /// Create a local file, validating its name and MIME type.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();

        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment filename cannot be empty".to_string(),
            ));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment mime_type cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            mime_type,
            bytes: bytes.into(),
        })
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}
