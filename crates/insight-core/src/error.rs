use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the insight engine.
#[derive(Error, Debug)]
pub enum InsightError {
    /// A source document could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook decoder rejected the input buffer.
    #[error("Failed to decode workbook: {0}")]
    WorkbookDecode(String),

    /// The workbook decoded but contains no sheets at all.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// The background worker could not be started.
    #[error("Background worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The background worker faulted while processing a run.
    #[error("Background worker fault: {0}")]
    WorkerFault(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the insight crates.
pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = InsightError::FileRead {
            path: PathBuf::from("/data/online_retail.xlsx"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/online_retail.xlsx"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_workbook_decode() {
        let err = InsightError::WorkbookDecode("invalid zip header".to_string());
        assert_eq!(err.to_string(), "Failed to decode workbook: invalid zip header");
    }

    #[test]
    fn test_error_display_no_sheets() {
        assert_eq!(InsightError::NoSheets.to_string(), "Workbook has no sheets");
    }

    #[test]
    fn test_error_display_worker_fault() {
        let err = InsightError::WorkerFault("panicked".to_string());
        assert_eq!(err.to_string(), "Background worker fault: panicked");
    }

    #[test]
    fn test_error_display_config() {
        let err = InsightError::Config("unknown timezone".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown timezone");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: InsightError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: InsightError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }
}
