//! Text input selection, decoding and bounds checks.
//!
//! # Payload Flow
//!
//! ```text
//! RawInput { text_input?, file? }
//!        │
//!        ▼
//! ┌──────────────────────────────────┐
//! │ 1. Pick the source               │
//! │    - non-blank inline text wins  │
//! │    - otherwise a real file       │
//! ├──────────────────────────────────┤
//! │ 2. File checks (file only)       │
//! │    - extension allowlist         │
//! │    - byte size limit             │
//! │    - UTF-8 decode, BOM strip     │
//! ├──────────────────────────────────┤
//! │ 3. Text checks                   │
//! │    - NUL bytes                   │
//! │    - trim, emptiness             │
//! │    - character limit             │
//! └──────────────────────────────────┘
//!        │
//!        ▼
//! TextPayload { source, encoding, canonical_text }
//! ```
//!
//! When the caller sends both inline text and a file, the inline text is used
//! and the file is not inspected at all: an oversize or wrongly typed file next
//! to valid inline text does not fail the request.
use crate::config::IngestConfig;
use crate::error::ValidationError;
use crate::types::{RawInput, TextEncoding, TextPayload, TextSource, UploadedFile};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Resolves the caller's input into a single canonical text payload.
///
/// # Errors
///
/// - [`ValidationError::EmptyInput`] - no usable source, or the source is blank
/// - [`ValidationError::UnsupportedFileType`] - file extension not allowed
/// - [`ValidationError::FileTooLarge`] - file exceeds `max_file_bytes`
/// - [`ValidationError::Decode`] - file is not UTF-8, or text contains NUL bytes
/// - [`ValidationError::TextTooLong`] - canonical text exceeds `max_text_chars`
pub fn normalize_input(raw: RawInput, cfg: &IngestConfig) -> Result<TextPayload, ValidationError> {
    let RawInput { text_input, file } = raw;

    if let Some(text) = text_input.filter(|t| !t.trim().is_empty()) {
        return finish_text(TextSource::Body, TextEncoding::Utf8, &text, cfg);
    }

    match file.filter(|f| !f.is_placeholder()) {
        Some(file) => normalize_file(file, cfg),
        None => Err(ValidationError::EmptyInput),
    }
}

fn normalize_file(file: UploadedFile, cfg: &IngestConfig) -> Result<TextPayload, ValidationError> {
    if !cfg.is_extension_allowed(&file.filename) {
        return Err(ValidationError::UnsupportedFileType {
            filename: file.filename,
            allowed: cfg.allowed_extensions.join(", "),
        });
    }

    if file.bytes.len() > cfg.max_file_bytes {
        return Err(ValidationError::FileTooLarge {
            size: file.bytes.len(),
            limit: cfg.max_file_bytes,
        });
    }

    let (encoding, body) = match file.bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (TextEncoding::Utf8Bom, rest),
        None => (TextEncoding::Utf8, file.bytes.as_slice()),
    };
    let text = std::str::from_utf8(body).map_err(|err| ValidationError::Decode(err.to_string()))?;

    finish_text(TextSource::File, encoding, text, cfg)
}

fn finish_text(
    source: TextSource,
    encoding: TextEncoding,
    text: &str,
    cfg: &IngestConfig,
) -> Result<TextPayload, ValidationError> {
    if text.contains('\0') {
        return Err(ValidationError::Decode("text contains NUL bytes".into()));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    // Count lazily so a huge input stops at limit + 1.
    let chars = trimmed.chars().take(cfg.max_text_chars + 1).count();
    if chars > cfg.max_text_chars {
        return Err(ValidationError::TextTooLong {
            chars: trimmed.chars().count(),
            limit: cfg.max_text_chars,
        });
    }

    Ok(TextPayload {
        source,
        encoding,
        canonical_text: trimmed.to_string(),
    })
}
