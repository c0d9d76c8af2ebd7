use thiserror::Error;

/// Failures that stop the pipeline before any metric is computed.
///
/// Everything past loading resolves to defined fallback values instead of an
/// error, so this enum only describes problems with the two source tables.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing {source_name} data at '{path}': {reason}")]
    MissingData {
        source_name: &'static str,
        path: String,
        reason: String,
    },
    #[error("{source_name} is missing required column(s): {}", .columns.join(", "))]
    MissingColumns {
        source_name: &'static str,
        columns: Vec<String>,
    },
    #[error("failed to read {source_name}: {source}")]
    Csv {
        source_name: &'static str,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
