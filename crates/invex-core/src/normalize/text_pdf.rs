//! Plain text to PDF rendering.
//!
//! Lines are drawn in 8pt Courier on US-letter pages so column alignment in
//! the source survives text extraction. Blank lines are dropped and a new
//! page starts when the next baseline would fall below the bottom margin.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::ConversionError;
use crate::models::config::ConverterConfig;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;

/// Renders text files to PDF with lopdf.
#[derive(Debug, Clone)]
pub struct TextPdfWriter {
    font_size: f32,
    line_height: f32,
    margin: f32,
}

impl TextPdfWriter {
    pub fn new() -> Self {
        Self::from_config(&ConverterConfig::default())
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            font_size: config.font_size,
            line_height: config.line_height.max(1.0),
            margin: config.margin,
        }
    }

    /// Lines that fit on one page.
    fn lines_per_page(&self) -> usize {
        let usable = (PAGE_HEIGHT - 2.0 * self.margin).max(0.0);
        (usable / self.line_height).floor() as usize + 1
    }

    pub fn render(&self, text: &str) -> Result<Vec<u8>, ConversionError> {
        let lines: Vec<String> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().replace('\t', "    "))
            .collect();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        let chunks: Vec<&[String]> = if lines.is_empty() {
            // Still emit one blank page so the result is a valid document
            vec![&lines[..]]
        } else {
            lines.chunks(self.lines_per_page()).collect()
        };

        for chunk in chunks {
            let page_id = self.add_page(&mut doc, pages_id, chunk)?;
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ConversionError::Render(e.to_string()))?;

        debug!("Rendered {} text lines to {} PDF pages", lines.len(), page_count);
        Ok(bytes)
    }

    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        lines: &[String],
    ) -> Result<ObjectId, ConversionError> {
        let top = PAGE_HEIGHT - self.margin;
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), self.font_size.into()]),
            Operation::new("TL", vec![self.line_height.into()]),
            Operation::new("Td", vec![self.margin.into(), top.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(line))]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations }
            .encode()
            .map_err(|e| ConversionError::Render(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        Ok(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }))
    }
}

impl Default for TextPdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode for the WinAnsi font encoding; unmapped characters become '?'.
fn win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
