//! Spreadsheet import and reconciliation for the Libris library manager.
//!
//! An [`ImportSession`] takes an uploaded CSV or Excel file through column
//! matching, parsing, validation and duplicate detection into an editable
//! preview, then hands the confirmed records to an [`ImportSubmitter`].

pub mod config;
pub mod import;
pub mod presets;
pub mod submit;

pub use config::{DateOrder, ImportConfig, MatchStrategy, SubmitConfig};
pub use import::{
    ColumnDescriptor, ColumnType, ConfirmMode, ImportError, ImportHooks, ImportReceipt,
    ImportRecord, ImportSession, ImportSubmitter, PreviewRow, RowFilter, RowTransformer,
    RowValidator, SessionOptions, SessionState,
};
pub use submit::HttpSubmitter;
