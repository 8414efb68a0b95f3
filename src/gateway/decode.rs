use crate::config::PolicyConfig;
use crate::errors::{RelayError, RelayResult};
use crate::media::MediaSlot;
use crate::spool::{RequestSpool, SpooledUpload};
use axum::extract::multipart::{Field, Multipart};
use regex::Regex;
use std::sync::LazyLock;

/// Decoded and field-checked inbound form.
#[derive(Debug)]
pub struct MediaSubmission {
    pub chat_id: String,
    pub photo: Option<SpooledUpload>,
    pub audio: Option<SpooledUpload>,
}

impl MediaSubmission {
    pub fn is_empty(&self) -> bool {
        self.photo.is_none() && self.audio.is_none()
    }
}

fn chat_id_pattern() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^-?\d+$").expect("Failed to compile chat_id regex"));
    &RE
}

/// Parse the multipart body into a submission, spooling file parts as they
/// arrive. Enforces the field allow-list (`chat_id`/`caption` scalars,
/// `photo`/`audio` files), rejects repeated names, validates `chat_id`, and
/// compares any client-sent caption against the fixed one.
pub async fn decode_submission(
    mut multipart: Multipart,
    spool: &RequestSpool,
    policy: &PolicyConfig,
) -> RelayResult<MediaSubmission> {
    let mut chat_id: Option<String> = None;
    let mut caption: Option<String> = None;
    let mut photo: Option<SpooledUpload> = None;
    let mut audio: Option<SpooledUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::ParseForm(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            return Err(RelayError::UnexpectedField("(unnamed)".to_string()));
        };
        match name.as_str() {
            "chat_id" => read_text(field, &mut chat_id, "chat_id").await?,
            "caption" => read_text(field, &mut caption, "caption").await?,
            "photo" => save_file(field, MediaSlot::Photo, spool, &mut photo).await?,
            "audio" => save_file(field, MediaSlot::Audio, spool, &mut audio).await?,
            _ => return Err(RelayError::UnexpectedField(name)),
        }
    }

    let Some(chat_id) = chat_id else {
        return Err(RelayError::ChatIdMissing);
    };
    if !chat_id_pattern().is_match(&chat_id) {
        return Err(RelayError::ChatIdInvalid);
    }
    if let Some(caption) = caption {
        if caption != policy.caption {
            return Err(RelayError::CaptionMismatch);
        }
    }

    Ok(MediaSubmission {
        chat_id,
        photo,
        audio,
    })
}

async fn read_text(
    field: Field<'_>,
    target: &mut Option<String>,
    name: &'static str,
) -> RelayResult<()> {
    if target.is_some() {
        return Err(RelayError::DuplicateField(name.to_string()));
    }
    let value = field
        .text()
        .await
        .map_err(|e| RelayError::ParseForm(e.to_string()))?;
    *target = Some(value);
    Ok(())
}

async fn save_file(
    field: Field<'_>,
    slot: MediaSlot,
    spool: &RequestSpool,
    target: &mut Option<SpooledUpload>,
) -> RelayResult<()> {
    if target.is_some() {
        return Err(RelayError::DuplicateField(slot.field_name().to_string()));
    }
    let declared_name = field.file_name().map(str::to_string);
    let declared_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| RelayError::ParseForm(e.to_string()))?;
    let upload = spool.save(slot, &bytes, declared_type, declared_name).await?;
    *target = Some(upload);
    Ok(())
}
