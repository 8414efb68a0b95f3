use crate::errors::{RelayError, RelayResult};
use crate::spool::SpooledUpload;
use anyhow::Context;
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Number of leading bytes inspected when classifying an upload.
pub const SNIFF_PREFIX_LEN: usize = 16;

pub const PHOTO_MAX_BYTES: usize = 20 * 1024 * 1024; // 20 MiB
pub const AUDIO_MAX_BYTES: usize = 50 * 1024 * 1024; // 50 MiB

/// One of the two accepted media roles, each with its own allowed type set
/// and size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    Photo,
    Audio,
}

impl MediaSlot {
    /// Multipart field name on both the inbound and outbound requests.
    pub fn field_name(self) -> &'static str {
        match self {
            MediaSlot::Photo => "photo",
            MediaSlot::Audio => "audio",
        }
    }

    /// Filename attached to the outbound part, regardless of what the client
    /// called the file.
    pub fn canonical_filename(self) -> &'static str {
        match self {
            MediaSlot::Photo => "photo.jpg",
            MediaSlot::Audio => "audio.wav",
        }
    }

    /// Bot API method that sends this slot.
    pub fn api_method(self) -> &'static str {
        match self {
            MediaSlot::Photo => "sendPhoto",
            MediaSlot::Audio => "sendAudio",
        }
    }

    pub fn max_bytes(self) -> usize {
        match self {
            MediaSlot::Photo => PHOTO_MAX_BYTES,
            MediaSlot::Audio => AUDIO_MAX_BYTES,
        }
    }

    pub fn limit_mib(self) -> usize {
        self.max_bytes() / (1024 * 1024)
    }

    /// Sniffed content types acceptable in this slot.
    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            MediaSlot::Photo => &["image/jpeg", "image/png"],
            MediaSlot::Audio => &["audio/mpeg", "audio/wav"],
        }
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// An upload whose bytes passed sniffing and the slot's size ceiling.
///
/// Only `validate_upload` constructs this; the content type it carries comes
/// from the bytes themselves, never from client-declared metadata.
#[derive(Debug)]
pub struct ValidatedMedia {
    pub upload: SpooledUpload,
    pub content_type: &'static str,
}

/// Classify leading bytes by magic signature.
///
/// Recognizes more than the relay accepts so that rejects can be logged with
/// the real type instead of "unknown".
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }
    // PNG: 89 50 4E 47
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF8") {
        return Some("image/gif");
    }
    // RIFF containers: WEBP images and WAVE audio
    if data.starts_with(b"RIFF") {
        if data.len() >= 12 && &data[8..12] == b"WEBP" {
            return Some("image/webp");
        }
        if data.len() >= 12 && &data[8..12] == b"WAVE" {
            return Some("audio/wav");
        }
        return None;
    }
    // MP3 with a leading ID3v2 tag
    if data.starts_with(b"ID3") {
        return Some("audio/mpeg");
    }
    // Bare MPEG audio frame sync: FF with the next three bits set
    if data[0] == 0xFF && data[1] & 0xE0 == 0xE0 {
        return Some("audio/mpeg");
    }
    if data.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if data.starts_with(b"fLaC") {
        return Some("audio/flac");
    }
    None
}

/// Check an upload against its slot: sniff the true content type from the
/// file's leading bytes, require it in the slot's allow-list, then enforce
/// the size ceiling. Declared metadata is never consulted.
pub async fn validate_upload(upload: SpooledUpload) -> RelayResult<ValidatedMedia> {
    let slot = upload.slot;
    let prefix = read_prefix(&upload.path)
        .await
        .with_context(|| format!("failed to read spooled {} upload", slot))?;

    let sniffed = sniff_content_type(&prefix);
    let Some(content_type) = sniffed.filter(|t| slot.allowed_types().contains(t)) else {
        warn!(
            "rejecting {}: sniffed as {}, declared as {}",
            slot,
            sniffed.unwrap_or("unknown"),
            upload.declared_type.as_deref().unwrap_or("unset"),
        );
        return Err(RelayError::InvalidType { slot });
    };

    if upload.size > slot.max_bytes() {
        warn!("rejecting {}: {} bytes over the ceiling", slot, upload.size);
        return Err(RelayError::TooLarge {
            slot,
            limit_mib: slot.limit_mib(),
        });
    }

    Ok(ValidatedMedia {
        upload,
        content_type,
    })
}

async fn read_prefix(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; SNIFF_PREFIX_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
