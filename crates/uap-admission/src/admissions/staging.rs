use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use super::domain::{AttachedFiles, FileSlot, StagedFile};

/// Upload rejected for one slot; other staged slots are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("file too large for {} ({size} bytes, max {limit})", .slot.label())]
    TooLarge { slot: FileSlot, size: u64, limit: u64 },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} content is not valid base64: {source}", .slot.label())]
    Encoding {
        slot: FileSlot,
        #[source]
        source: base64::DecodeError,
    },
    #[error("{} has an invalid media type '{value}'", .slot.label())]
    MediaType { slot: FileSlot, value: String },
}

/// Collects documents for a submission, one per slot; re-staging a slot replaces it.
#[derive(Debug, Default, Clone)]
pub struct FileStager {
    files: AttachedFiles,
}

impl FileStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_bytes(
        &mut self,
        slot: FileSlot,
        name: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<&StagedFile, StagingError> {
        let file = encode(slot, name, media_type, bytes)?;
        Ok(self.files.slot_mut(slot).insert(file))
    }

    /// Read a file from disk; the media type is guessed from its extension.
    pub fn stage_path(&mut self, slot: FileSlot, path: &Path) -> Result<&StagedFile, StagingError> {
        let bytes = std::fs::read(path).map_err(|source| StagingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let media_type = mime_guess::from_path(path).first_or_octet_stream();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| slot.label().to_string());
        self.stage_bytes(slot, &name, media_type.essence_str(), &bytes)
    }

    /// Accept a client-encoded upload after checking its decoded size.
    pub fn stage_encoded(
        &mut self,
        slot: FileSlot,
        upload: StagedFile,
    ) -> Result<&StagedFile, StagingError> {
        let bytes = upload.decode_for(slot)?;
        self.stage_bytes(slot, &upload.name, &upload.media_type, &bytes)
    }

    /// Re-validate every upload in a submitted file set.
    pub fn stage_all(&mut self, uploads: AttachedFiles) -> Result<(), StagingError> {
        let AttachedFiles {
            photo,
            signature,
            transcript,
        } = uploads;
        for (slot, upload) in [
            (FileSlot::Photo, photo),
            (FileSlot::Signature, signature),
            (FileSlot::Transcript, transcript),
        ] {
            if let Some(upload) = upload {
                self.stage_encoded(slot, upload)?;
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.files = AttachedFiles::default();
    }

    pub fn files(&self) -> &AttachedFiles {
        &self.files
    }

    pub fn into_files(self) -> AttachedFiles {
        self.files
    }
}

fn encode(
    slot: FileSlot,
    name: &str,
    media_type: &str,
    bytes: &[u8],
) -> Result<StagedFile, StagingError> {
    let size = bytes.len() as u64;
    if size > slot.max_size() {
        return Err(StagingError::TooLarge {
            slot,
            size,
            limit: slot.max_size(),
        });
    }

    let media_type = media_type
        .parse::<mime::Mime>()
        .map_err(|_| StagingError::MediaType {
            slot,
            value: media_type.to_string(),
        })?;

    debug!(slot = slot.label(), name, size, "file staged");
    Ok(StagedFile {
        name: name.to_string(),
        size,
        media_type: media_type.essence_str().to_string(),
        content: STANDARD.encode(bytes),
    })
}

impl StagedFile {
    /// Raw bytes of the document.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.content.as_bytes())
    }

    fn decode_for(&self, slot: FileSlot) -> Result<Vec<u8>, StagingError> {
        self.decode()
            .map_err(|source| StagingError::Encoding { slot, source })
    }
}
