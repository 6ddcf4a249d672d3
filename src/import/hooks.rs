use futures::future::BoxFuture;
use std::sync::Arc;

use super::types::{ImportReceipt, ImportRecord, PreviewRow, RowValues};

/// Extra domain checks for a row; each returned string is a blocking error
pub trait RowValidator: Send + Sync {
    fn validate(&self, row: &PreviewRow) -> Vec<String>;
}

impl<F> RowValidator for F
where
    F: Fn(&PreviewRow) -> Vec<String> + Send + Sync,
{
    fn validate(&self, row: &PreviewRow) -> Vec<String> {
        self(row)
    }
}

/// Cross-field derivation applied to each freshly parsed record
pub trait RowTransformer: Send + Sync {
    fn transform(&self, values: RowValues) -> RowValues;
}

impl<F> RowTransformer for F
where
    F: Fn(RowValues) -> RowValues + Send + Sync,
{
    fn transform(&self, values: RowValues) -> RowValues {
        self(values)
    }
}

/// Hands confirmed records to the host; an `Err` carries the message to show
pub trait ImportSubmitter: Send + Sync {
    fn submit<'a>(&'a self, records: &'a [ImportRecord]) -> BoxFuture<'a, Result<ImportReceipt, String>>;

    /// Called once after a successful submission
    fn refresh(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Caller capabilities supplied when a session starts
#[derive(Clone)]
pub struct ImportHooks {
    pub validator: Option<Arc<dyn RowValidator>>,
    pub transformer: Option<Arc<dyn RowTransformer>>,
    pub submitter: Arc<dyn ImportSubmitter>,
}

impl ImportHooks {
    pub fn new(submitter: Arc<dyn ImportSubmitter>) -> Self {
        ImportHooks {
            validator: None,
            transformer: None,
            submitter,
        }
    }

    pub fn with_validator(mut self, validator: impl RowValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_transformer(mut self, transformer: impl RowTransformer + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn validator(&self) -> Option<&dyn RowValidator> {
        self.validator.as_deref()
    }

    pub fn transformer(&self) -> Option<&dyn RowTransformer> {
        self.transformer.as_deref()
    }
}

impl std::fmt::Debug for ImportHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportHooks")
            .field("validator", &self.validator.is_some())
            .field("transformer", &self.transformer.is_some())
            .finish_non_exhaustive()
    }
}

/// Chains several validators, concatenating their errors in order
#[derive(Default, Clone)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn RowValidator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl RowValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }
}

impl RowValidator for ValidatorChain {
    fn validate(&self, row: &PreviewRow) -> Vec<String> {
        self.validators
            .iter()
            .flat_map(|v| v.validate(row))
            .collect()
    }
}
