/// Quotation statuses
///
/// A quotation moves through DRAFT/SENT/NEGOTIATION while it is still open,
/// and lands in WON or INVOICED once the customer commits (at which point it
/// counts as an order for target purposes).
pub const QUOTATION_STATUS_DRAFT: &str = "DRAFT";

pub const QUOTATION_STATUS_SENT: &str = "SENT";

pub const QUOTATION_STATUS_NEGOTIATION: &str = "NEGOTIATION";

pub const QUOTATION_STATUS_WON: &str = "WON";

pub const QUOTATION_STATUS_INVOICED: &str = "INVOICED";

/// Statuses of quotations still counted against the quotations target
pub const OPEN_QUOTATION_STATUSES: [&str; 3] = [
    QUOTATION_STATUS_DRAFT,
    QUOTATION_STATUS_SENT,
    QUOTATION_STATUS_NEGOTIATION,
];

/// Statuses of quotations counted against the orders component of sales
pub const ORDER_QUOTATION_STATUSES: [&str; 2] =
    [QUOTATION_STATUS_WON, QUOTATION_STATUS_INVOICED];

/// Decimal precision for stored monetary values
pub const DECIMAL_PRECISION: u32 = 6;

/// Sanity ceiling for monetary counters and hours, parsed to Decimal
pub const MONETARY_SANITY_CEILING: &str = "10000000";

/// Sanity ceiling for count counters
pub const COUNT_SANITY_CEILING: i32 = 1_000_000;

/// Tolerance when checking the derived sales sum, parsed to Decimal
pub const SALES_SUM_TOLERANCE: &str = "0.01";

/// Maximum lock-acquisition attempts for an external update
pub const MAX_LOCK_RETRIES: u32 = 3;

/// Base delay for the exponential lock-retry backoff, in milliseconds
pub const LOCK_RETRY_BASE_DELAY_MS: u64 = 100;

/// Lifetime of an external-update idempotency receipt, in hours
pub const RECEIPT_TTL_HOURS: i64 = 48;

/// Source label recorded when an external update does not name one
pub const UNKNOWN_SOURCE: &str = "UNKNOWN_SOURCE";

/// Minimum movement, in percentage points of the target, for a
/// contribution-progress notification
pub const MATERIAL_PROGRESS_POINTS: &str = "1.0";

/// Outbound event names
pub const EVENT_TARGET_UPDATED: &str = "target.updated";

pub const EVENT_TARGET_ACHIEVED: &str = "target.achieved";

pub const EVENT_TARGET_CONTRIBUTION_PROGRESS: &str = "target.contribution.progress";

pub const EVENT_EXTERNAL_UPDATE_COMPLETED: &str = "target.external.update.completed";

pub const EVENT_EXTERNAL_UPDATE_FAILED: &str = "target.external.update.failed";

/// Log target carrying the structured audit trail
pub const AUDIT_LOG_TARGET: &str = "audit";
