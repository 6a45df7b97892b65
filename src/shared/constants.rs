// =============================================================================
// PRODUCT CODES
// =============================================================================

/// Product (and product code) used when a ticket names no product
pub const DEFAULT_PRODUCT_ID: &str = "DEFAULT";

/// Length of generated product codes
pub const PRODUCT_CODE_LENGTH: usize = 7;

/// Retries after the first code insert collides with an existing code
pub const PRODUCT_CODE_MAX_RETRIES: u32 = 5;

/// Delay before the first retry; doubles on each subsequent retry
pub const PRODUCT_CODE_BACKOFF_BASE_MS: u64 = 100;

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Maximum attachment size (8 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 8 * 1024 * 1024;

/// Lowercase file extensions accepted for comment attachments
pub const ALLOWED_ATTACHMENT_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png", ".zip", ".txt", ".pdf"];

// =============================================================================
// ASSIGNMENT
// =============================================================================

/// Namespace for per-category advisory locks taken during auto-assignment
pub const ASSIGNMENT_LOCK_NAMESPACE: i32 = 0x4844_4b41; // "HDKA"
