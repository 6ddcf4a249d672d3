//! Bulk import of spreadsheet rows into typed records.
//!
//! This module provides:
//! - Reading CSV and Excel uploads into a raw header/row grid
//! - Fuzzy header-to-column matching and date normalisation
//! - Row validation, duplicate detection and batch editing
//! - A session state machine from upload to confirmed submission
//! - Template and preview export

pub mod types;
pub mod error;
pub mod normalize;
pub mod matcher;
pub mod reader;
pub mod parser;
pub mod validator;
pub mod duplicates;
pub mod batch;
pub mod hooks;
pub mod session;
pub mod writer;

// Re-export commonly used types and functions
pub use types::*;
pub use error::{ImportError, ImportErrorType};
pub use hooks::{ImportHooks, ImportSubmitter, RowTransformer, RowValidator, ValidatorChain};
pub use matcher::match_columns;
pub use normalize::normalize_date;
pub use parser::parse_sheet;
pub use reader::{compute_checksum, read_bytes, read_file};
pub use session::{
    ConfirmMode, ImportSession, ImportSummary, SessionOptions, SessionSnapshot, SessionState,
    UploadTicket,
};
pub use validator::validate_all;
pub use writer::{export_rows_csv, export_rows_xlsx, write_template};
