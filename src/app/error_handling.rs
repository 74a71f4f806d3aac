//! Error handling utilities

use tracing::error;

use crate::error::QualityError;

/// Exit code for errors that carry no code of their own
const GENERAL_ERROR: i32 = 1;

/// Print `error` for the user and pick the process exit code.
///
/// - `verbose = 0`: user-friendly messages only
/// - `verbose >= 1`: includes the developer message with the error chain
pub fn report_error(error: &anyhow::Error, verbose: u8) -> i32 {
    error!("Fatal error: {}", error);

    if let Some(quality_err) = error.downcast_ref::<QualityError>() {
        eprintln!("{}", quality_err.user_message());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", quality_err.developer_message());
        }
        return quality_err.exit_code();
    }

    eprintln!("Error: {error}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }
    GENERAL_ERROR
}

/// Handle fatal errors and exit with the appropriate status code
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    let code = report_error(&error, verbose);
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_exit_code_from_quality_error() {
        let err = anyhow::Error::new(QualityError::config_with_code(
            ErrorCode::CONFIG_UNKNOWN_METRIC,
            "Metric 'x' is not configured",
        ));
        assert_eq!(report_error(&err, 0), 2);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(report_error(&err, 1), GENERAL_ERROR);
    }
}
