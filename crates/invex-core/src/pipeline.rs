//! The processing chain: normalize, read, extract, refine, export.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ExtractionWarning, InvexError, Result, Stage};
use crate::export::{flatten, ExportResult};
use crate::invoice::{HeuristicParser, InvoiceParser};
use crate::models::config::{InvexConfig, PipelineOptions};
use crate::models::document::{DocumentFormat, NormalizedContent, PageContent};
use crate::models::record::{ExtractedRecord, InvoiceField};
use crate::normalize::{DocumentConverter, FormatNormalizer, TextPdfWriter};
use crate::ocr::{OcrEngine, TesseractEngine};
use crate::pdf::{PageRasterizer, PageReader, PopplerRasterizer};
use crate::refine::{RefinementStatus, RefinementUnavailable, Refiner};
use crate::tabular::TabularExtractor;

/// Everything known about one processed file.
///
/// Always produced, whatever went wrong: on a fatal error `record` is empty,
/// `failure` says which stage failed and `export` still holds the aligned
/// empty row.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub source: PathBuf,
    pub format: Option<DocumentFormat>,
    pub record: ExtractedRecord,
    pub export: ExportResult,
    pub warnings: Vec<ExtractionWarning>,
    pub refinement: RefinementStatus,
    pub failure: Option<InvexError>,
    pub processing_time_ms: u64,
}

impl ProcessOutcome {
    fn new(source: &Path, refinement: RefinementStatus) -> Self {
        Self {
            source: source.to_path_buf(),
            format: None,
            record: ExtractedRecord::empty(),
            export: ExportResult {
                rows: Vec::new(),
                csv: String::new(),
                json: None,
            },
            warnings: Vec::new(),
            refinement,
            failure: None,
            processing_time_ms: 0,
        }
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    pub fn item_count(&self) -> usize {
        self.record.line_items.len()
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// "<stage> stage failed: <error>", when the file could not be processed.
    pub fn failure_message(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|e| format!("{} stage failed: {}", e.stage(), e))
    }

    /// One-line summary for front-ends.
    pub fn status_line(&self) -> String {
        if let Some(message) = self.failure_message() {
            return format!("{}: {}", self.file_name(), message);
        }
        match self.item_count() {
            0 if self.record.is_empty() => format!("No data extracted from {}", self.file_name()),
            0 => format!("No items extracted from {}", self.file_name()),
            1 => format!("Extracted 1 item from {}", self.file_name()),
            n => format!("Extracted {} items from {}", n, self.file_name()),
        }
    }
}

/// Runs files through every stage with the collaborators it was built with.
///
/// Holds no per-file state; one pipeline can serve concurrent requests.
#[derive(Clone)]
pub struct InvoicePipeline {
    config: InvexConfig,
    options: PipelineOptions,
    normalizer: FormatNormalizer,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    parser: HeuristicParser,
    tabular: TabularExtractor,
    refiner: std::result::Result<Refiner, RefinementUnavailable>,
}

impl InvoicePipeline {
    /// Pipeline with the external tools named in the configuration.
    pub fn new(config: InvexConfig, options: PipelineOptions) -> Self {
        let refiner = if options.llm_enabled {
            Refiner::from_config(&config.llm).map(|r| r.with_day_first(config.extraction.day_first))
        } else if config.llm.enabled && !config.llm.has_credential() {
            Err(RefinementUnavailable::MissingCredential)
        } else {
            Err(RefinementUnavailable::Disabled)
        };
        if let Err(reason) = &refiner {
            info!("Refinement off: {}", reason);
        }

        Self {
            normalizer: FormatNormalizer::from_config(&config.converter),
            rasterizer: Arc::new(PopplerRasterizer::from_config(&config.ocr)),
            ocr: Arc::new(TesseractEngine::from_config(&config.ocr)),
            parser: HeuristicParser::from_config(&config.extraction),
            tabular: TabularExtractor::from_config(&config.extraction),
            refiner,
            config,
            options,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.normalizer = FormatNormalizer::new(converter, TextPdfWriter::from_config(&self.config.converter));
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Use this refiner regardless of the resolved options.
    pub fn with_refiner(mut self, refiner: Refiner) -> Self {
        self.refiner = Ok(refiner);
        self
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn config(&self) -> &InvexConfig {
        &self.config
    }

    /// Whether a refiner will be called.
    pub fn refinement_active(&self) -> bool {
        self.refiner.is_ok()
    }

    fn page_reader(&self) -> PageReader {
        PageReader::new(self.config.pdf.clone(), self.rasterizer.clone(), self.ocr.clone())
    }

    /// Process one file. Never fails; see [`ProcessOutcome`].
    pub async fn process(&self, path: &Path) -> ProcessOutcome {
        self.process_with(path, self.refiner.as_ref().ok()).await
    }

    /// Process one file without calling the refiner.
    pub async fn process_heuristic(&self, path: &Path) -> ProcessOutcome {
        self.process_with(path, None).await
    }

    async fn process_with(&self, path: &Path, refiner: Option<&Refiner>) -> ProcessOutcome {
        let start = Instant::now();
        info!("Processing {}", path.display());

        let initial = self
            .refiner
            .as_ref()
            .err()
            .cloned()
            .unwrap_or(RefinementUnavailable::Disabled);
        let mut outcome = ProcessOutcome::new(path, RefinementStatus::unavailable(initial));

        if let Err(e) = self.run(path, refiner, &mut outcome).await {
            warn!("{}: {} stage failed: {}", path.display(), e.stage(), e);
            outcome.record = ExtractedRecord::empty();
            outcome.failure = Some(e);
        }

        outcome.export = match ExportResult::from_record(&outcome.record, self.options.include_json) {
            Ok(export) => export,
            Err(e) => {
                warn!("Export failed for {}: {}", path.display(), e);
                let rows = flatten(&outcome.record);
                outcome.failure.get_or_insert(e);
                ExportResult {
                    rows,
                    csv: String::new(),
                    json: None,
                }
            }
        };

        outcome.processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{} done in {}ms with {} warnings",
            path.display(),
            outcome.processing_time_ms,
            outcome.warnings.len()
        );
        outcome
    }

    async fn run(&self, path: &Path, refiner: Option<&Refiner>, outcome: &mut ProcessOutcome) -> Result<()> {
        let document = self.normalizer.normalize(path).await?;
        outcome.format = Some(document.format);

        let (extraction, text, pages) = match document.content {
            NormalizedContent::Worksheet(sheet) => {
                let text = sheet.to_text();
                (self.tabular.extract(&sheet), text, Vec::new())
            }
            NormalizedContent::Pdf(bytes) => {
                let read = self.page_reader().read(&bytes).await?;
                outcome.warnings.extend(read.warnings);

                let text = PageContent::join_text(&read.pages);
                if text.trim().is_empty() {
                    outcome.warnings.push(ExtractionWarning::new(
                        Stage::Read,
                        "document",
                        "no text found on any page",
                    ));
                }
                (self.parser.parse(&text), text, read.pages)
            }
        };

        let mut record = extraction.record;
        let mut extract_warnings = extraction.warnings;

        if let Some(refiner) = refiner {
            let refinement = refiner.refine(&record, &text, &pages).await;
            record = refinement.record;
            outcome.refinement = refinement.status;
            extract_warnings.retain(|w| still_missing(w, &record));
            extract_warnings.extend(refinement.warnings);
        }

        outcome.warnings.extend(extract_warnings);
        outcome.record = record;
        Ok(())
    }

    /// Process files one after another. A failing file never stops the rest.
    pub async fn process_many(&self, paths: &[PathBuf]) -> Vec<ProcessOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            outcomes.push(self.process(path).await);
        }
        outcomes
    }
}

/// Whether an extraction warning still applies to the final record.
fn still_missing(warning: &ExtractionWarning, record: &ExtractedRecord) -> bool {
    if warning.stage != Stage::Extract {
        return true;
    }
    if warning.subject == "line_items" {
        return record.line_items.is_empty();
    }
    InvoiceField::ALL
        .iter()
        .find(|f| f.name() == warning.subject)
        .map_or(true, |f| !record.has(*f))
}
