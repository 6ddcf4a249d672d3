use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::batch;
use super::duplicates::detect_duplicates;
use super::error::ImportError;
use super::hooks::ImportHooks;
use super::matcher::match_columns;
use super::parser::parse_sheet;
use super::reader::{self, check_file_size};
use super::types::*;
use super::validator::validate_all;
use crate::config::ImportConfig;

/// Lifecycle of one import dialog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Upload,
    Parsing,
    Preview,
    Submitting,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Upload => "upload",
            SessionState::Parsing => "parsing",
            SessionState::Preview => "preview",
            SessionState::Submitting => "submitting",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-session choices made by the host page
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionOptions {
    pub duplicate_key: Option<String>,
    /// Treat duplicates as hard errors at confirm time
    #[serde(default)]
    pub duplicates_block: bool,
}

impl SessionOptions {
    pub fn with_duplicate_key(key: impl Into<String>) -> Self {
        SessionOptions {
            duplicate_key: Some(key.into()),
            duplicates_block: false,
        }
    }
}

/// How the confirm gate treats duplicates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMode {
    /// First confirmation; duplicates stop the import with a warning
    Initial,
    /// Second confirmation after the duplicate warning was shown
    AllowDuplicates,
}

/// Identifies one upload; results for an older ticket are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    generation: u64,
}

/// Counts shown above the preview table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub warning_rows: usize,
    pub error_rows: usize,
    pub duplicate_rows: usize,
    pub unmatched_columns: Vec<String>,
    pub over_soft_limit: bool,
}

/// Serializable view of the session for a UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub source: Option<SourceInfo>,
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
    pub rows: Vec<PreviewRow>,
    pub report: ValidationReport,
    pub duplicates: DuplicateSet,
    pub summary: ImportSummary,
    pub last_error: Option<ImportError>,
}

/// One import dialog session: upload -> parse -> preview/edit -> confirm -> submit
pub struct ImportSession {
    id: String,
    config: ImportConfig,
    descriptors: Vec<ColumnDescriptor>,
    options: SessionOptions,
    hooks: ImportHooks,

    state: SessionState,
    generation: u64,
    sheet: Option<RawSheet>,
    mapping: ColumnMapping,
    rows: Vec<PreviewRow>,
    report: ValidationReport,
    duplicates: DuplicateSet,
    last_error: Option<ImportError>,
}

impl ImportSession {
    /// Start a session; descriptors must have unique, non-empty keys
    pub fn new(
        descriptors: Vec<ColumnDescriptor>,
        options: SessionOptions,
        hooks: ImportHooks,
        config: ImportConfig,
    ) -> Result<Self, ImportError> {
        validate_descriptors(&descriptors, &options)?;

        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            "import session {}: opened with {} columns",
            id,
            descriptors.len()
        );

        Ok(ImportSession {
            id,
            config,
            descriptors,
            options,
            hooks,
            state: SessionState::Upload,
            generation: 0,
            sheet: None,
            mapping: ColumnMapping::default(),
            rows: Vec::new(),
            report: ValidationReport::default(),
            duplicates: DuplicateSet::new(),
            last_error: None,
        })
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn sheet(&self) -> Option<&RawSheet> {
        self.sheet.as_ref()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn rows(&self) -> &[PreviewRow] {
        &self.rows
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn duplicates(&self) -> &DuplicateSet {
        &self.duplicates
    }

    /// Most recent failure, for the error dialog
    pub fn last_error(&self) -> Option<&ImportError> {
        self.last_error.as_ref()
    }

    pub fn row(&self, id: RowId) -> Option<&PreviewRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    // ==================== Upload & Parse ====================

    /// Begin an upload from Upload or Preview (re-upload resets the preview)
    pub fn begin_upload(&mut self, size_bytes: u64) -> Result<UploadTicket, ImportError> {
        match self.state {
            SessionState::Upload | SessionState::Preview => {}
            // A newer selection supersedes a read still in flight
            SessionState::Parsing => {}
            state => return Err(ImportError::invalid_state("upload a file", state)),
        }

        self.reset_preview();
        self.state = SessionState::Upload;

        if let Err(e) = check_file_size(size_bytes, &self.config) {
            return Err(self.fail(e));
        }

        self.generation += 1;
        self.state = SessionState::Parsing;
        self.last_error = None;

        Ok(UploadTicket {
            generation: self.generation,
        })
    }

    /// Deliver a read result. Returns `Ok(false)` when the ticket is stale
    /// or the session closed in the meantime.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<RawSheet, ImportError>,
    ) -> Result<bool, ImportError> {
        if self.state != SessionState::Parsing || ticket.generation != self.generation {
            tracing::warn!(
                "import session {}: ignoring stale read (ticket {}, current {}, state {})",
                self.id,
                ticket.generation,
                self.generation,
                self.state
            );
            return Ok(false);
        }

        let sheet = match result {
            Ok(sheet) => sheet,
            Err(e) => {
                self.state = SessionState::Upload;
                return Err(self.fail(e));
            }
        };

        let mapping = match_columns(&sheet.headers, &self.descriptors, &self.config);
        let rows = match parse_sheet(
            &sheet,
            &self.descriptors,
            &mapping,
            self.hooks.transformer(),
            &self.config,
        ) {
            Ok(rows) => rows,
            Err(e) => {
                self.state = SessionState::Upload;
                return Err(self.fail(e));
            }
        };

        tracing::info!(
            "import session {}: parsed {} ({} rows, {} of {} columns matched)",
            self.id,
            sheet.source.file_name,
            rows.len(),
            mapping.indices.len(),
            self.descriptors.len()
        );

        self.sheet = Some(sheet);
        self.mapping = mapping;
        self.rows = rows;
        self.state = SessionState::Preview;
        self.revalidate();

        Ok(true)
    }

    /// Parse an in-memory upload (drag-drop or file picker contents)
    pub fn load_bytes(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<(), ImportError> {
        let ticket = self.begin_upload(bytes.len() as u64)?;
        let result = reader::read_bytes(file_name, bytes, &self.config);
        self.complete_upload(ticket, result).map(|_| ())
    }

    /// Read and parse a file on a blocking worker
    pub async fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), ImportError> {
        let path = path.as_ref().to_path_buf();

        let size_bytes = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::debug!("import session {}: cannot stat {}: {}", self.id, path.display(), e);
                return Err(self.fail(ImportError::invalid_format()));
            }
        };

        let ticket = self.begin_upload(size_bytes)?;
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || reader::read_file(&path, &config))
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("import read task failed: {}", e);
                Err(ImportError::invalid_format())
            });

        self.complete_upload(ticket, result).map(|_| ())
    }

    // ==================== Derived State ====================

    /// Recompute validation and duplicates from scratch
    pub fn revalidate(&mut self) {
        self.report = validate_all(&self.rows, &self.descriptors, self.hooks.validator());
        self.duplicates = match &self.options.duplicate_key {
            Some(key) => detect_duplicates(&self.rows, key),
            None => DuplicateSet::new(),
        };
    }

    pub fn row_status(&self, id: RowId) -> Option<RowStatus> {
        self.row(id).map(|row| self.status_of(row))
    }

    fn status_of(&self, row: &PreviewRow) -> RowStatus {
        RowStatus {
            has_errors: self.report.is_blocking(row.id),
            has_warnings: !self.report.warnings_for(row.id).is_empty(),
            is_duplicate: self.duplicates.contains(&row.id),
        }
    }

    /// Rows matching a status filter, in order
    pub fn rows_filtered(&self, filter: RowFilter) -> Vec<&PreviewRow> {
        self.rows
            .iter()
            .filter(|row| self.status_of(row).matches(filter))
            .collect()
    }

    pub fn summary(&self) -> ImportSummary {
        let mut summary = ImportSummary {
            total_rows: self.rows.len(),
            unmatched_columns: self
                .mapping
                .unmatched(&self.descriptors)
                .into_iter()
                .map(String::from)
                .collect(),
            over_soft_limit: self.rows.len() > self.config.soft_row_limit,
            ..Default::default()
        };

        for row in &self.rows {
            let status = self.status_of(row);
            if status.is_valid() {
                summary.valid_rows += 1;
            }
            if status.matches(RowFilter::Warning) {
                summary.warning_rows += 1;
            }
            if status.has_errors {
                summary.error_rows += 1;
            }
            if status.is_duplicate {
                summary.duplicate_rows += 1;
            }
        }

        summary
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            state: self.state,
            source: self.sheet.as_ref().map(|s| s.source.clone()),
            headers: self
                .sheet
                .as_ref()
                .map(|s| s.headers.clone())
                .unwrap_or_default(),
            mapping: self.mapping.clone(),
            rows: self.rows.clone(),
            report: self.report.clone(),
            duplicates: self.duplicates.clone(),
            summary: self.summary(),
            last_error: self.last_error.clone(),
        }
    }

    // ==================== Editing ====================

    pub fn update_cell(&mut self, id: RowId, column_key: &str, value: &str) -> Result<bool, ImportError> {
        self.ensure_editable("edit a cell")?;
        self.ensure_column(column_key)?;
        let updated = batch::update_cell(&mut self.rows, id, column_key, value);
        self.revalidate();
        Ok(updated)
    }

    pub fn find_replace(&mut self, column_key: &str, find: &str, replace: &str) -> Result<usize, ImportError> {
        self.ensure_editable("find and replace")?;
        self.ensure_column(column_key)?;
        let changed = batch::find_replace(&mut self.rows, column_key, find, replace);
        self.revalidate();
        Ok(changed)
    }

    pub fn apply_to_empty(&mut self, column_key: &str, value: &str) -> Result<usize, ImportError> {
        self.ensure_editable("fill empty cells")?;
        self.ensure_column(column_key)?;
        let changed = batch::apply_to_empty(&mut self.rows, column_key, value);
        self.revalidate();
        Ok(changed)
    }

    pub fn transform_column(&mut self, column_key: &str, mode: TransformMode) -> Result<usize, ImportError> {
        self.ensure_editable("transform a column")?;
        self.ensure_column(column_key)?;
        let changed = batch::transform_column(&mut self.rows, column_key, mode);
        self.revalidate();
        Ok(changed)
    }

    /// Drop all but the first row per duplicate key value
    pub fn remove_duplicates(&mut self) -> Result<usize, ImportError> {
        self.ensure_editable("remove duplicates")?;
        let Some(key) = self.options.duplicate_key.clone() else {
            return Ok(0);
        };
        let removed = batch::remove_duplicates(&mut self.rows, &key);
        self.revalidate();
        if removed > 0 {
            tracing::info!("import session {}: removed {} duplicate rows", self.id, removed);
        }
        Ok(removed)
    }

    pub fn delete_row(&mut self, id: RowId) -> Result<bool, ImportError> {
        self.ensure_editable("delete a row")?;
        let deleted = batch::delete_row(&mut self.rows, id);
        self.revalidate();
        Ok(deleted)
    }

    // ==================== Confirm & Submit ====================

    /// Gate before submission: errors always block, duplicates need a second confirmation
    pub fn confirm(&mut self, mode: ConfirmMode) -> Result<(), ImportError> {
        self.ensure_editable("confirm the import")?;
        self.revalidate();

        if self.report.has_errors() {
            let rows = self.report.blocking_rows();
            tracing::info!(
                "import session {}: confirm blocked by {} rows with errors",
                self.id,
                rows.len()
            );
            return Err(self.fail(ImportError::ValidationBlocked { rows }));
        }

        if !self.duplicates.is_empty() {
            let count = self.duplicates.len();
            if self.options.duplicates_block {
                let rows = self.duplicates.iter().copied().collect();
                return Err(self.fail(ImportError::ValidationBlocked { rows }));
            }
            if mode == ConfirmMode::Initial {
                return Err(self.fail(ImportError::DuplicatesPending { count }));
            }
            tracing::info!(
                "import session {}: importing with {} duplicate rows",
                self.id,
                count
            );
        }

        Ok(())
    }

    /// Confirm, then hand the rows to the submitter.
    ///
    /// A rejected submission returns to Preview with all rows intact. A
    /// successful one closes the session and triggers the host refresh.
    pub async fn submit(&mut self, mode: ConfirmMode) -> Result<ImportReceipt, ImportError> {
        self.confirm(mode)?;

        let submitter = self.hooks.submitter.clone();
        let records: Vec<ImportRecord> = self.rows.iter().map(PreviewRow::to_record).collect();
        tracing::info!("import session {}: submitting {} rows", self.id, records.len());

        let in_flight = SubmitGuard::enter(&mut self.state);
        let outcome = submitter.submit(&records).await;
        in_flight.complete();

        match outcome {
            Ok(receipt) => {
                tracing::info!(
                    "import session {}: submitted {} rows (succeeded: {:?}, failed: {:?})",
                    self.id,
                    receipt.submitted,
                    receipt.succeeded,
                    receipt.failed
                );
                self.close();
                submitter.refresh().await;
                Ok(receipt)
            }
            Err(message) => {
                tracing::warn!("import session {}: submission failed: {}", self.id, message);
                self.state = SessionState::Preview;
                Err(self.fail(ImportError::submit(message)))
            }
        }
    }

    /// Close without importing; all preview state is discarded
    pub fn cancel(&mut self) {
        if self.state != SessionState::Closed {
            tracing::info!("import session {}: cancelled", self.id);
        }
        self.close();
    }

    // ==================== Internals ====================

    fn close(&mut self) {
        self.reset_preview();
        self.last_error = None;
        self.state = SessionState::Closed;
    }

    fn reset_preview(&mut self) {
        self.sheet = None;
        self.mapping = ColumnMapping::default();
        self.rows.clear();
        self.report = ValidationReport::default();
        self.duplicates.clear();
    }

    fn fail(&mut self, error: ImportError) -> ImportError {
        self.last_error = Some(error.clone());
        error
    }

    fn ensure_editable(&self, action: &str) -> Result<(), ImportError> {
        if self.state != SessionState::Preview {
            return Err(ImportError::invalid_state(action, self.state));
        }
        Ok(())
    }

    fn ensure_column(&self, column_key: &str) -> Result<(), ImportError> {
        if !self.descriptors.iter().any(|d| d.key == column_key) {
            return Err(ImportError::invalid_descriptor(format!(
                "unknown column '{}'",
                column_key
            )));
        }
        Ok(())
    }
}

/// Holds the session in Submitting; a dropped submission falls back to Preview
struct SubmitGuard<'a> {
    state: &'a mut SessionState,
    armed: bool,
}

impl<'a> SubmitGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::Submitting;
        SubmitGuard { state, armed: true }
    }

    /// The submitter answered; the caller decides the next state
    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("import submission abandoned before completion; back to preview");
            *self.state = SessionState::Preview;
        }
    }
}

fn validate_descriptors(
    descriptors: &[ColumnDescriptor],
    options: &SessionOptions,
) -> Result<(), ImportError> {
    if descriptors.is_empty() {
        return Err(ImportError::invalid_descriptor("no columns defined"));
    }

    let mut keys = HashSet::new();
    for descriptor in descriptors {
        if descriptor.key.trim().is_empty() {
            return Err(ImportError::invalid_descriptor("column key cannot be empty"));
        }
        if !keys.insert(descriptor.key.as_str()) {
            return Err(ImportError::invalid_descriptor(format!(
                "duplicate column key '{}'",
                descriptor.key
            )));
        }
    }

    if let Some(key) = &options.duplicate_key {
        if !keys.contains(key.as_str()) {
            return Err(ImportError::invalid_descriptor(format!(
                "duplicate key '{}' is not a column",
                key
            )));
        }
    }

    Ok(())
}
