//! Input format detection.

use std::borrow::Cow;
use std::path::Path;

use infer::MatcherType;

use crate::error::{InvexError, Result};
use crate::models::document::DocumentFormat;

const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

impl DocumentFormat {
    /// Format from the extension, checked against the file's leading bytes.
    ///
    /// The extension decides the format. Content sniffing only rejects a
    /// file whose bytes contradict it, such as a `.pdf` that is really a PNG.
    pub fn detect(path: &Path, head: &[u8]) -> Result<Self> {
        let format = Self::from_path(path).ok_or_else(|| {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "no extension".to_string());
            InvexError::UnsupportedFormat(format!("{} ({})", path.display(), ext))
        })?;

        if head.is_empty() {
            return Err(InvexError::UnsupportedFormat(format!("{} is empty", path.display())));
        }

        if content_matches(format, head) {
            Ok(format)
        } else {
            let seen = infer::get(head)
                .map(|k| k.mime_type().to_string())
                .unwrap_or_else(|| "unrecognized content".to_string());
            Err(InvexError::UnsupportedFormat(format!(
                "{} is not a valid {} file ({})",
                path.display(),
                format,
                seen
            )))
        }
    }
}

fn content_matches(format: DocumentFormat, head: &[u8]) -> bool {
    match format {
        DocumentFormat::Pdf => {
            infer::get(head).is_some_and(|k| k.mime_type() == "application/pdf")
                // Some writers put junk before the header
                || head.windows(5).take(1024).any(|w| w == b"%PDF-")
        }
        DocumentFormat::Docx | DocumentFormat::Xlsx | DocumentFormat::Ods => head.starts_with(ZIP_MAGIC),
        DocumentFormat::Doc | DocumentFormat::Xls => head.starts_with(OLE_MAGIC),
        DocumentFormat::Text => {
            // UTF-16 text is full of NULs; a byte order mark vouches for it
            if [UTF8_BOM, UTF16_LE_BOM, UTF16_BE_BOM].iter().any(|bom| head.starts_with(bom)) {
                return true;
            }
            let binary = infer::get(head).is_some_and(|k| k.matcher_type() != MatcherType::Text);
            !binary && !head.contains(&0)
        }
    }
}

/// Decode a text file: UTF-16 when it carries a byte order mark, UTF-8
/// otherwise. Invalid sequences become U+FFFD.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return Cow::Owned(decode_utf16(rest, u16::from_le_bytes));
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return Cow::Owned(decode_utf16(rest, u16::from_be_bytes));
    }
    String::from_utf8_lossy(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
