/// Error code registry for the quality collector
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Collection errors
/// - 5000-5999: Measurement log errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_UNKNOWN_METRIC: u16 = 1006;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_CONFLICT: u16 = 3005;
    pub const STORAGE_CORRUPTED: u16 = 3006;
    pub const STORAGE_LOCK_FAILED: u16 = 3007;
    pub const STORAGE_LOCK_BUSY: u16 = 3008;
    pub const STORAGE_TEMPORARY: u16 = 3009;
    pub const STORAGE_BACKEND_ERROR: u16 = 3010;
    pub const STORAGE_SERIALIZATION_ERROR: u16 = 3011;

    // Collection errors (4000-4999)
    pub const COLLECT_GENERIC: u16 = 4000;

    // Measurement log errors (5000-5999)
    pub const LOG_GENERIC: u16 = 5000;
    pub const LOG_CONTENTION: u16 = 5001;
    pub const LOG_NO_HEAD: u16 = 5002;
    pub const LOG_UNKNOWN_SOURCE: u16 = 5003;
    pub const LOG_UNKNOWN_ENTITY: u16 = 5004;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_INVALID_INPUT: u16 = 7008;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1003 => "Invalid JSON syntax in configuration",
        1004 => "Required configuration field is missing",
        1005 => "Invalid value in configuration",
        1006 => "Metric is not configured",

        // Storage errors
        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3005 => "Stored head changed concurrently",
        3006 => "Storage data is corrupted",
        3007 => "Failed to acquire storage lock",
        3008 => "Storage lock is busy",
        3009 => "Temporary storage error",
        3010 => "Storage backend error",
        3011 => "Storage serialization error",

        // Collection errors
        4000 => "Generic collection error",

        // Measurement log errors
        5000 => "Generic measurement log error",
        5001 => "Measurement log kept changing during the update",
        5002 => "Metric has no measurements yet",
        5003 => "Source is not part of the measurement",
        5004 => "Entity is not part of the source",

        // Validation errors
        7000 => "Generic validation error",
        7008 => "Invalid input",

        // Other errors
        9000 => "Generic error",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_ranges() {
        assert!(ErrorCode::CONFIG_GENERIC >= 1000 && ErrorCode::CONFIG_GENERIC < 2000);
        assert!(ErrorCode::STORAGE_GENERIC >= 3000 && ErrorCode::STORAGE_GENERIC < 4000);
        assert!(ErrorCode::COLLECT_GENERIC >= 4000 && ErrorCode::COLLECT_GENERIC < 5000);
        assert!(ErrorCode::LOG_GENERIC >= 5000 && ErrorCode::LOG_GENERIC < 6000);
        assert!(ErrorCode::VALIDATION_GENERIC >= 7000 && ErrorCode::VALIDATION_GENERIC < 8000);
        assert!(ErrorCode::OTHER_GENERIC >= 9000 && ErrorCode::OTHER_GENERIC < 10000);
    }

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(describe_error_code(1001), "Configuration file not found");
        assert_eq!(
            describe_error_code(ErrorCode::LOG_CONTENTION),
            "Measurement log kept changing during the update"
        );
        assert_eq!(describe_error_code(65535), "Unknown error code");
    }
}
