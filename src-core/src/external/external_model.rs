use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::constants::{
    LOCK_RETRY_BASE_DELAY_MS, MAX_LOCK_RETRIES, RECEIPT_TTL_HOURS, UNKNOWN_SOURCE,
};
use crate::targets::{CurrentValues, TargetField};

/// Update semantics for an external mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateMode {
    Increment,
    Decrement,
    Replace,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Increment => "INCREMENT",
            UpdateMode::Decrement => "DECREMENT",
            UpdateMode::Replace => "REPLACE",
        }
    }
}

/// Sparse set of field values carried by an external update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetFieldUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sales_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_quotations_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_orders_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_hours_worked: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_new_clients: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_new_leads: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_check_ins: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_calls: Option<Decimal>,
}

impl TargetFieldUpdates {
    /// The updatable (field, value) pairs actually supplied. Sales is
    /// excluded; it is derived and validated separately.
    pub fn supplied(&self) -> Vec<(TargetField, Decimal)> {
        let mut fields = Vec::new();
        if let Some(value) = self.current_quotations_amount {
            fields.push((TargetField::QuotationsAmount, value));
        }
        if let Some(value) = self.current_orders_amount {
            fields.push((TargetField::OrdersAmount, value));
        }
        if let Some(value) = self.current_hours_worked {
            fields.push((TargetField::HoursWorked, value));
        }
        if let Some(value) = self.current_new_clients {
            fields.push((TargetField::NewClients, value));
        }
        if let Some(value) = self.current_new_leads {
            fields.push((TargetField::NewLeads, value));
        }
        if let Some(value) = self.current_check_ins {
            fields.push((TargetField::CheckIns, value));
        }
        if let Some(value) = self.current_calls {
            fields.push((TargetField::Calls, value));
        }
        fields
    }

    pub fn names_sales_amount(&self) -> bool {
        self.current_sales_amount.is_some()
    }
}

/// An update request pushed by an external system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUpdateRequest {
    pub update_mode: UpdateMode,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub updates: TargetFieldUpdates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ExternalUpdateRequest {
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }
}

/// Conflict descriptor returned when the retry budget is exhausted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetails {
    pub retry_count: u32,
    pub retry_after_ms: u64,
}

/// Three-way outcome of an external update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExternalUpdateOutcome {
    /// The mutation was applied and committed
    Applied { values: CurrentValues },
    /// The request violated the update-mode rules; nothing was applied
    Invalid { errors: Vec<String> },
    /// Lock contention exhausted every retry; the whole request is safe to
    /// retry shortly
    Conflict { details: ConflictDetails },
}

/// Pacing of the exclusive-lock retry loop
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: MAX_LOCK_RETRIES,
            base_delay: StdDuration::from_millis(LOCK_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff slept before retry `retry` (1-based): base * 2^(retry - 1)
    pub fn delay_before_retry(&self, retry: u32) -> StdDuration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Movement of one field inside one mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDelta {
    pub field: String,
    pub previous: Decimal,
    #[serde(rename = "new")]
    pub new_value: Decimal,
    pub delta: Decimal,
}

/// One entry of the contribution summary computed for INCREMENT updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldContribution {
    pub field: String,
    pub previous: Decimal,
    #[serde(rename = "new")]
    pub new_value: Decimal,
    pub delta: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_of_target: Option<Decimal>,
}

/// Structured audit record written for every committed external mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub user_id: String,
    pub transaction_id: String,
    pub source: String,
    pub update_mode: UpdateMode,
    pub before: CurrentValues,
    pub after: CurrentValues,
    pub deltas: Vec<FieldDelta>,
    pub applied_at: NaiveDateTime,
}

/// Durable idempotency receipt for an applied external update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReceipt {
    pub transaction_id: String,
    pub user_id: String,
    pub source: String,
    pub outcome: ExternalUpdateOutcome,
    pub applied_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl UpdateReceipt {
    pub fn new(
        transaction_id: &str,
        user_id: &str,
        source: &str,
        outcome: ExternalUpdateOutcome,
        applied_at: NaiveDateTime,
    ) -> Self {
        UpdateReceipt {
            transaction_id: transaction_id.to_string(),
            user_id: user_id.to_string(),
            source: source.to_string(),
            outcome,
            applied_at,
            expires_at: applied_at + Duration::hours(RECEIPT_TTL_HOURS),
        }
    }
}

// --- DB Representation ---

#[derive(Queryable, Identifiable, Insertable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::external_update_receipts)]
#[diesel(primary_key(transaction_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct UpdateReceiptDB {
    pub transaction_id: String,
    pub user_id: String,
    pub source: String,
    // Outcome stored as JSON
    pub outcome: String,
    pub applied_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl From<UpdateReceipt> for UpdateReceiptDB {
    fn from(domain: UpdateReceipt) -> Self {
        UpdateReceiptDB {
            transaction_id: domain.transaction_id,
            user_id: domain.user_id,
            source: domain.source,
            outcome: serde_json::to_string(&domain.outcome).unwrap_or_else(|_| "{}".to_string()),
            applied_at: domain.applied_at,
            expires_at: domain.expires_at,
        }
    }
}

impl From<UpdateReceiptDB> for UpdateReceipt {
    fn from(db: UpdateReceiptDB) -> Self {
        let outcome = serde_json::from_str(&db.outcome).unwrap_or_else(|e| {
            log::error!(
                "Failed to parse recorded outcome for transaction {}: {}",
                db.transaction_id,
                e
            );
            ExternalUpdateOutcome::Invalid {
                errors: vec!["recorded outcome is unreadable".to_string()],
            }
        });
        UpdateReceipt {
            transaction_id: db.transaction_id,
            user_id: db.user_id,
            source: db.source,
            outcome,
            applied_at: db.applied_at,
            expires_at: db.expires_at,
        }
    }
}
