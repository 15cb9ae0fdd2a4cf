//! Spreadsheet converter: one workbook in, one document per non-empty sheet
//! out.
//!
//! ## Flow
//!
//! 1. The workbook is parsed once with `calamine` on the blocking pool. A
//!    workbook that cannot be opened is a [`CollectorError::ReadError`]; a
//!    single sheet that cannot be read only fails that sheet.
//! 2. Each sheet becomes a job. Jobs run through `buffer_unordered` capped at
//!    `config.concurrency`, and each job does its CPU work (render, count,
//!    write) inside `spawn_blocking`, so a tall sheet never stalls the async
//!    workers serving other requests.
//! 3. Results are fanned back in and ordered by workbook position.
//!
//! ## Modes
//!
//! * **Persist**: every non-empty sheet is written as
//!   `sheet-<slug>.json` into a fresh `<slug(basename)>-<4 hex>` folder under
//!   the documents root. A record is on disk as soon as its job finishes.
//! * **Preview**: nothing is written. The non-empty sheets are combined into
//!   one document whose content is `Sheet: <name>\n<csv>` sections separated
//!   by a blank line.
//!
//! A sheet is empty when its rendered text is empty; a row of blank cells
//! still renders its delimiters and counts as content.
//!
//! A sheet that is empty, fails or is cancelled is skipped and reported
//! through the progress callback. Only when no sheet produced anything does
//! the conversion fail, with [`CollectorError::NoValidUnits`].

use crate::config::CollectorConfig;
use crate::error::{CollectorError, UnitError};
use crate::output::{word_count, CanonicalDocument};
use crate::pipeline::cleanup::TransientSource;
use crate::pipeline::file_timestamp;
use crate::pipeline::render::{render_grid, CellValue, Sheet};
use crate::pipeline::writer::{slugify, write_document, WriteTarget};
use crate::progress::ProgressCallback;
use crate::request::{ConversionRequest, DocumentOverrides};
use crate::tokens::estimate_tokens;
use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const XLSX_SOURCE: &str = "an xlsx file uploaded by the user.";

/// Sheets taller than this get a warning before rendering.
const LARGE_SHEET_ROWS: usize = 10_000;

/// Short-suffix attempts before the output folder falls back to a full uuid.
const FOLDER_ATTEMPTS: usize = 8;

/// A parsed sheet, or the reason it could not be read.
pub type ParsedSheet = Result<Sheet, UnitError>;

/// Convert a claimed workbook into documents.
///
/// The source is deleted when this returns, after every sheet has been
/// attempted.
pub async fn convert_spreadsheet(
    source: TransientSource,
    request: &ConversionRequest,
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> Result<Vec<CanonicalDocument>, CollectorError> {
    let start = Instant::now();
    let name = request.target_name.clone();
    let path = source.path().to_path_buf();

    info!("Parsing workbook {}", name);
    let parse_path = path.clone();
    let parse_name = name.clone();
    let (published, sheets) = tokio::task::spawn_blocking(move || {
        read_workbook(&parse_path, &parse_name).map(|sheets| (file_timestamp(&parse_path), sheets))
    })
    .await
    .map_err(|e| CollectorError::Internal(format!("Workbook parse task panicked: {}", e)))??;
    info!(
        "Parsed {} in {}ms: {} sheet(s)",
        name,
        start.elapsed().as_millis(),
        sheets.len()
    );

    let out_folder = if request.options.parse_only {
        None
    } else {
        Some(create_output_folder(&config.documents_root, base_name(&name)).await?)
    };

    let ctx = Arc::new(SheetContext {
        original_name: name.clone(),
        source_url: format!("file://{}", path.display()),
        metadata: request.metadata.clone(),
        published,
        out_folder,
        preview_dir: config.custom_documents_dir(),
        progress: config.progress_callback.clone(),
    });

    let result = convert_sheets(sheets, ctx, config.concurrency, cancel).await;
    drop(source);

    match &result {
        Ok(docs) => info!(
            "[SUCCESS]: {} fully processed in {}ms. Created {} document(s).",
            name,
            start.elapsed().as_millis(),
            docs.len()
        ),
        Err(e) => warn!("{} failed after {}ms: {}", name, start.elapsed().as_millis(), e),
    }
    result
}

/// Open the workbook and read every sheet into memory, in workbook order.
fn read_workbook(path: &Path, name: &str) -> Result<Vec<ParsedSheet>, CollectorError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| CollectorError::ReadError {
        name: name.to_string(),
        detail: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheets = sheet_names
        .into_iter()
        .map(|sheet_name| match workbook.worksheet_range(&sheet_name) {
            Ok(range) => {
                let grid: Vec<Vec<CellValue>> = range
                    .rows()
                    .map(|row| row.iter().map(CellValue::from).collect())
                    .collect();
                debug!(
                    "Sheet \"{}\": {} rows x {} cols",
                    sheet_name,
                    grid.len(),
                    range.width()
                );
                Ok(Sheet::new(sheet_name, grid))
            }
            Err(e) => Err(UnitError::Failed {
                sheet: sheet_name,
                detail: e.to_string(),
            }),
        })
        .collect();
    Ok(sheets)
}

/// `<slug(basename)>-<4 hex>` under `root`, created exclusively so two
/// requests for the same file name never share a folder.
async fn create_output_folder(root: &Path, basename: &str) -> Result<PathBuf, CollectorError> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| CollectorError::WriteFailed {
            path: root.to_path_buf(),
            source: e,
        })?;

    let base = slugify(basename);
    let mut attempt = 0;
    loop {
        let id = Uuid::new_v4().simple().to_string();
        let suffix = if attempt < FOLDER_ATTEMPTS { &id[..4] } else { id.as_str() };
        let folder = root.join(format!("{}-{}", base, suffix));
        match tokio::fs::create_dir(&folder).await {
            Ok(()) => {
                debug!("Output folder {}", folder.display());
                return Ok(folder);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("{} taken, retrying", folder.display());
                attempt += 1;
            }
            Err(e) => {
                return Err(CollectorError::WriteFailed {
                    path: folder,
                    source: e,
                })
            }
        }
    }
}

fn base_name(target: &str) -> &str {
    Path::new(target)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(target)
}

/// State shared by every sheet job of one request.
struct SheetContext {
    original_name: String,
    source_url: String,
    metadata: DocumentOverrides,
    published: DateTime<Utc>,
    /// `Some` in persist mode.
    out_folder: Option<PathBuf>,
    /// Destination hint for the combined preview document (never written).
    preview_dir: PathBuf,
    progress: Option<ProgressCallback>,
}

/// What a successful sheet job hands back.
#[derive(Debug)]
enum SheetOutput {
    Preview {
        name: String,
        content: String,
        words: usize,
    },
    Persisted(CanonicalDocument),
}

impl SheetOutput {
    fn word_count(&self) -> usize {
        match self {
            SheetOutput::Preview { words, .. } => *words,
            SheetOutput::Persisted(doc) => doc.word_count,
        }
    }
}

impl SheetContext {
    /// Render and, in persist mode, write one sheet. Blocking.
    fn process(&self, sheet: Sheet, cancel: &CancellationToken) -> Result<SheetOutput, UnitError> {
        if sheet.row_count() > LARGE_SHEET_ROWS {
            warn!(
                "Sheet \"{}\" has {} rows - processing may take longer",
                sheet.name,
                sheet.row_count()
            );
        }
        let content = match render_grid(&sheet.grid, cancel) {
            Ok(c) => c,
            Err(_) => return Err(UnitError::Cancelled { sheet: sheet.name }),
        };
        if content.is_empty() {
            return Err(UnitError::Empty { sheet: sheet.name });
        }

        let Some(folder) = &self.out_folder else {
            let words = word_count(&content);
            return Ok(SheetOutput::Preview {
                name: sheet.name,
                content,
                words,
            });
        };

        let doc = self.sheet_document(&sheet.name, folder, content);
        let target = WriteTarget::new(folder, format!("sheet-{}", slugify(&sheet.name)));
        write_document(doc, &target, false)
            .map(SheetOutput::Persisted)
            .map_err(|e| UnitError::Failed {
                sheet: sheet.name,
                detail: e.to_string(),
            })
    }

    fn sheet_document(&self, sheet: &str, folder: &Path, content: String) -> CanonicalDocument {
        let csv_path = folder.join(format!("{}.csv", slugify(sheet)));
        CanonicalDocument {
            id: Uuid::new_v4(),
            url: format!("file://{}", csv_path.display()),
            title: self
                .metadata
                .title_or(format!("{} - Sheet:{}", self.original_name, sheet)),
            doc_author: self.metadata.doc_author_or("Unknown"),
            description: self
                .metadata
                .description_or(format!("Spreadsheet data from sheet: {}", sheet)),
            doc_source: self.metadata.doc_source_or(XLSX_SOURCE),
            chunk_source: self.metadata.chunk_source_or(""),
            published: self.published,
            word_count: word_count(&content),
            token_count_estimate: estimate_tokens(&content),
            page_content: content,
            location: None,
        }
    }

    /// Fold preview sections (already in workbook order) into one document.
    fn combined_document(&self, outputs: &[SheetOutput]) -> Result<CanonicalDocument, CollectorError> {
        let mut names = Vec::new();
        let mut sections = Vec::new();
        for output in outputs {
            if let SheetOutput::Preview { name, content, .. } = output {
                sections.push(format!("Sheet: {}\n{}", name, content));
                names.push(name.as_str());
            }
        }
        let content = sections.join("\n\n");

        let doc = CanonicalDocument {
            id: Uuid::new_v4(),
            url: self.source_url.clone(),
            title: self.metadata.title_or(self.original_name.as_str()),
            doc_author: self.metadata.doc_author_or("Unknown"),
            description: self
                .metadata
                .description_or(format!("Spreadsheet data from sheets: {}", names.join(", "))),
            doc_source: self.metadata.doc_source_or(XLSX_SOURCE),
            chunk_source: self.metadata.chunk_source_or(""),
            published: self.published,
            word_count: word_count(&content),
            token_count_estimate: estimate_tokens(&content),
            page_content: content,
            location: None,
        };
        let target = WriteTarget::new(
            &self.preview_dir,
            format!("{}-{}", slugify(&self.original_name), doc.id),
        );
        write_document(doc, &target, true)
    }
}

/// Fan the sheets out, fan the results back in, and assemble the documents.
async fn convert_sheets(
    sheets: Vec<ParsedSheet>,
    ctx: Arc<SheetContext>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<CanonicalDocument>, CollectorError> {
    let total = sheets.len();
    if let Some(ref cb) = ctx.progress {
        cb.on_conversion_start(total);
    }

    let mut outcomes: Vec<(usize, Result<SheetOutput, UnitError>)> =
        stream::iter(sheets.into_iter().enumerate().map(|(index, parsed)| {
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            async move {
                let name = match &parsed {
                    Ok(sheet) => sheet.name.clone(),
                    Err(e) => e.sheet().to_string(),
                };
                if let Some(ref cb) = ctx.progress {
                    cb.on_unit_start(index, total, &name);
                }
                let outcome = match parsed {
                    Ok(sheet) => run_sheet(index, total, sheet, Arc::clone(&ctx), cancel).await,
                    Err(e) => {
                        warn!("{}", e);
                        Err(e)
                    }
                };
                if let Some(ref cb) = ctx.progress {
                    match &outcome {
                        Ok(out) => cb.on_unit_complete(index, total, &name, out.word_count()),
                        Err(e) => cb.on_unit_skipped(index, total, &name, &e.to_string()),
                    }
                }
                (index, outcome)
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    let produced: Vec<SheetOutput> = outcomes
        .into_iter()
        .filter_map(|(_, outcome)| outcome.ok())
        .collect();

    if let Some(ref cb) = ctx.progress {
        cb.on_conversion_complete(total, produced.len());
    }

    if produced.is_empty() {
        if let Some(ref folder) = ctx.out_folder {
            if let Err(e) = tokio::fs::remove_dir(folder).await {
                debug!("Could not remove empty folder {}: {}", folder.display(), e);
            }
        }
        return Err(CollectorError::NoValidUnits {
            name: ctx.original_name.clone(),
            total,
        });
    }

    if ctx.out_folder.is_some() {
        return Ok(produced
            .into_iter()
            .filter_map(|output| match output {
                SheetOutput::Persisted(doc) => Some(doc),
                SheetOutput::Preview { .. } => None,
            })
            .collect());
    }

    let combine_ctx = Arc::clone(&ctx);
    let doc = tokio::task::spawn_blocking(move || combine_ctx.combined_document(&produced))
        .await
        .map_err(|e| CollectorError::Internal(format!("Preview assembly task panicked: {}", e)))??;
    Ok(vec![doc])
}

/// Run one sheet on the blocking pool. A panic inside the job fails only
/// this sheet.
async fn run_sheet(
    index: usize,
    total: usize,
    sheet: Sheet,
    ctx: Arc<SheetContext>,
    cancel: CancellationToken,
) -> Result<SheetOutput, UnitError> {
    let name = sheet.name.clone();
    if cancel.is_cancelled() {
        return Err(UnitError::Cancelled { sheet: name });
    }

    debug!("Processing sheet {}/{}: \"{}\"", index + 1, total, name);
    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || ctx.process(sheet, &cancel))
        .await
        .unwrap_or_else(|e| {
            Err(UnitError::Failed {
                sheet: name.clone(),
                detail: format!("sheet task panicked: {}", e),
            })
        });

    let ms = start.elapsed().as_millis();
    match &result {
        Ok(out) => info!(
            "Sheet \"{}\" processed in {}ms - {} words",
            name,
            ms,
            out.word_count()
        ),
        Err(UnitError::Empty { .. }) => info!("Sheet \"{}\" is empty, skipped", name),
        Err(e) => warn!("{} (after {}ms)", e, ms),
    }
    result
}
