use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::DECIMAL_PRECISION;
use crate::targets::targets_errors::{Result, TargetError};

/// The tracked current-value fields of a user target aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetField {
    SalesAmount,
    QuotationsAmount,
    OrdersAmount,
    HoursWorked,
    NewClients,
    NewLeads,
    CheckIns,
    Calls,
}

impl TargetField {
    /// Fields an external system may target directly. Sales is derived from
    /// quotations + orders and cannot be set on its own.
    pub const UPDATABLE: [TargetField; 7] = [
        TargetField::QuotationsAmount,
        TargetField::OrdersAmount,
        TargetField::HoursWorked,
        TargetField::NewClients,
        TargetField::NewLeads,
        TargetField::CheckIns,
        TargetField::Calls,
    ];

    /// Metrics a human sets a goal for. Orders have no standalone goal; they
    /// roll up into the sales target.
    pub const TARGETED: [TargetField; 7] = [
        TargetField::SalesAmount,
        TargetField::QuotationsAmount,
        TargetField::HoursWorked,
        TargetField::NewClients,
        TargetField::NewLeads,
        TargetField::CheckIns,
        TargetField::Calls,
    ];

    /// Monetary-or-fractional fields, bounded by the monetary sanity ceiling
    pub const MONETARY: [TargetField; 4] = [
        TargetField::SalesAmount,
        TargetField::QuotationsAmount,
        TargetField::OrdersAmount,
        TargetField::HoursWorked,
    ];

    /// Count fields, bounded by the count sanity ceiling
    pub const COUNTS: [TargetField; 4] = [
        TargetField::NewClients,
        TargetField::NewLeads,
        TargetField::CheckIns,
        TargetField::Calls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::SalesAmount => "currentSalesAmount",
            TargetField::QuotationsAmount => "currentQuotationsAmount",
            TargetField::OrdersAmount => "currentOrdersAmount",
            TargetField::HoursWorked => "currentHoursWorked",
            TargetField::NewClients => "currentNewClients",
            TargetField::NewLeads => "currentNewLeads",
            TargetField::CheckIns => "currentCheckIns",
            TargetField::Calls => "currentCalls",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(
            self,
            TargetField::NewClients
                | TargetField::NewLeads
                | TargetField::CheckIns
                | TargetField::Calls
        )
    }
}

/// Per-user performance target aggregate. Target values are set by humans;
/// current values are mutated only by the incremental calculator and the
/// external sync protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTarget {
    pub id: String,
    pub user_id: String,
    pub currency: String,

    pub target_sales_amount: Decimal,
    pub target_quotations_amount: Decimal,
    pub target_hours_worked: Decimal,
    pub target_new_clients: i32,
    pub target_new_leads: i32,
    pub target_check_ins: i32,
    pub target_calls: i32,

    pub current_sales_amount: Decimal,
    pub current_quotations_amount: Decimal,
    pub current_orders_amount: Decimal,
    pub current_hours_worked: Decimal,
    pub current_new_clients: i32,
    pub current_new_leads: i32,
    pub current_check_ins: i32,
    pub current_calls: i32,

    pub period_start_date: NaiveDate,
    pub period_end_date: NaiveDate,

    /// Watermark: end of the last successfully processed scan window
    pub last_calculated_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl UserTarget {
    /// Start of the next scan window; falls back to the period start when no
    /// calculation has run yet
    pub fn scan_start(&self) -> NaiveDateTime {
        self.last_calculated_at
            .unwrap_or_else(|| self.period_start_date.and_hms_opt(0, 0, 0).unwrap())
    }

    /// Re-derive the sales amount from its components
    pub fn recompute_sales(&mut self) {
        self.current_sales_amount = self.current_quotations_amount + self.current_orders_amount;
    }

    pub fn current_of(&self, field: TargetField) -> Decimal {
        match field {
            TargetField::SalesAmount => self.current_sales_amount,
            TargetField::QuotationsAmount => self.current_quotations_amount,
            TargetField::OrdersAmount => self.current_orders_amount,
            TargetField::HoursWorked => self.current_hours_worked,
            TargetField::NewClients => Decimal::from(self.current_new_clients),
            TargetField::NewLeads => Decimal::from(self.current_new_leads),
            TargetField::CheckIns => Decimal::from(self.current_check_ins),
            TargetField::Calls => Decimal::from(self.current_calls),
        }
    }

    pub fn target_of(&self, field: TargetField) -> Decimal {
        match field {
            TargetField::SalesAmount => self.target_sales_amount,
            TargetField::QuotationsAmount => self.target_quotations_amount,
            TargetField::OrdersAmount => Decimal::ZERO,
            TargetField::HoursWorked => self.target_hours_worked,
            TargetField::NewClients => Decimal::from(self.target_new_clients),
            TargetField::NewLeads => Decimal::from(self.target_new_leads),
            TargetField::CheckIns => Decimal::from(self.target_check_ins),
            TargetField::Calls => Decimal::from(self.target_calls),
        }
    }

    pub fn set_current(&mut self, field: TargetField, value: Decimal) {
        match field {
            TargetField::SalesAmount => self.current_sales_amount = value,
            TargetField::QuotationsAmount => self.current_quotations_amount = value,
            TargetField::OrdersAmount => self.current_orders_amount = value,
            TargetField::HoursWorked => self.current_hours_worked = value,
            TargetField::NewClients => self.current_new_clients = clamp_count(value),
            TargetField::NewLeads => self.current_new_leads = clamp_count(value),
            TargetField::CheckIns => self.current_check_ins = clamp_count(value),
            TargetField::Calls => self.current_calls = clamp_count(value),
        }
    }

    pub fn current_values(&self) -> CurrentValues {
        CurrentValues::from(self)
    }

    /// Per-metric progress against the configured goals
    pub fn progress(&self) -> Vec<MetricProgress> {
        TargetField::TARGETED
            .iter()
            .map(|field| {
                let target = self.target_of(*field);
                let current = self.current_of(*field);
                MetricProgress {
                    field: field.as_str().to_string(),
                    current,
                    target,
                    ratio: if target > Decimal::ZERO {
                        Some(current / target)
                    } else {
                        None
                    },
                }
            })
            .collect()
    }

    /// Move the aggregate onto a new period: counters restart from zero and
    /// the watermark is cleared so the next calculation scans from the new
    /// period start.
    pub fn rebaseline_period(&mut self, start: NaiveDate, end: NaiveDate) {
        self.period_start_date = start;
        self.period_end_date = end;
        self.current_sales_amount = Decimal::ZERO;
        self.current_quotations_amount = Decimal::ZERO;
        self.current_orders_amount = Decimal::ZERO;
        self.current_hours_worked = Decimal::ZERO;
        self.current_new_clients = 0;
        self.current_new_leads = 0;
        self.current_check_ins = 0;
        self.current_calls = 0;
        self.last_calculated_at = None;
    }
}

// Counts stay i32 in storage; out-of-range values saturate so the sanity
// ceiling check can flag them instead of wrapping.
fn clamp_count(value: Decimal) -> i32 {
    value.to_i32().unwrap_or(if value.is_sign_negative() {
        i32::MIN
    } else {
        i32::MAX
    })
}

/// Metrics that crossed their goal with this mutation (were below the target
/// before, at or above it after)
pub fn newly_achieved(before: &UserTarget, after: &UserTarget) -> Vec<TargetField> {
    TargetField::TARGETED
        .iter()
        .copied()
        .filter(|field| {
            let target = after.target_of(*field);
            target > Decimal::ZERO
                && before.current_of(*field) < target
                && after.current_of(*field) >= target
        })
        .collect()
}

/// The engine-mutated counters of an aggregate, as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentValues {
    pub current_sales_amount: Decimal,
    pub current_quotations_amount: Decimal,
    pub current_orders_amount: Decimal,
    pub current_hours_worked: Decimal,
    pub current_new_clients: i32,
    pub current_new_leads: i32,
    pub current_check_ins: i32,
    pub current_calls: i32,
}

impl From<&UserTarget> for CurrentValues {
    fn from(target: &UserTarget) -> Self {
        CurrentValues {
            current_sales_amount: target.current_sales_amount,
            current_quotations_amount: target.current_quotations_amount,
            current_orders_amount: target.current_orders_amount,
            current_hours_worked: target.current_hours_worked,
            current_new_clients: target.current_new_clients,
            current_new_leads: target.current_new_leads,
            current_check_ins: target.current_check_ins,
            current_calls: target.current_calls,
        }
    }
}

/// Progress of one metric against its goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricProgress {
    pub field: String,
    pub current: Decimal,
    pub target: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<Decimal>,
}

/// Model for creating a new target aggregate
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUserTarget {
    pub user_id: String,
    pub currency: String,
    pub target_sales_amount: Decimal,
    pub target_quotations_amount: Decimal,
    pub target_hours_worked: Decimal,
    pub target_new_clients: i32,
    pub target_new_leads: i32,
    pub target_check_ins: i32,
    pub target_calls: i32,
    pub period_start_date: NaiveDate,
    pub period_end_date: NaiveDate,
}

impl NewUserTarget {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(TargetError::InvalidData("userId must not be empty".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(TargetError::InvalidData("currency must not be empty".to_string()));
        }
        if self.target_sales_amount < Decimal::ZERO
            || self.target_quotations_amount < Decimal::ZERO
            || self.target_hours_worked < Decimal::ZERO
            || self.target_new_clients < 0
            || self.target_new_leads < 0
            || self.target_check_ins < 0
            || self.target_calls < 0
        {
            return Err(TargetError::InvalidData(
                "target values must not be negative".to_string(),
            ));
        }
        if self.period_start_date > self.period_end_date {
            return Err(TargetError::InvalidData(
                "periodStartDate must be before or equal to periodEndDate".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<NewUserTarget> for UserTarget {
    fn from(new_target: NewUserTarget) -> Self {
        let now = Utc::now().naive_utc();
        UserTarget {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new_target.user_id,
            currency: new_target.currency,
            target_sales_amount: new_target.target_sales_amount,
            target_quotations_amount: new_target.target_quotations_amount,
            target_hours_worked: new_target.target_hours_worked,
            target_new_clients: new_target.target_new_clients,
            target_new_leads: new_target.target_new_leads,
            target_check_ins: new_target.target_check_ins,
            target_calls: new_target.target_calls,
            current_sales_amount: Decimal::ZERO,
            current_quotations_amount: Decimal::ZERO,
            current_orders_amount: Decimal::ZERO,
            current_hours_worked: Decimal::ZERO,
            current_new_clients: 0,
            current_new_leads: 0,
            current_check_ins: 0,
            current_calls: 0,
            period_start_date: new_target.period_start_date,
            period_end_date: new_target.period_end_date,
            last_calculated_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// --- DB Representation ---

#[derive(
    Queryable,
    Identifiable,
    AsChangeset,
    Selectable,
    Insertable,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::user_targets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
// A cleared watermark must reach the database as NULL, not be skipped
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct UserTargetDB {
    pub id: String,
    pub user_id: String,
    pub currency: String,

    // Decimals stored as TEXT
    pub target_sales_amount: String,
    pub target_quotations_amount: String,
    pub target_hours_worked: String,
    pub target_new_clients: i32,
    pub target_new_leads: i32,
    pub target_check_ins: i32,
    pub target_calls: i32,

    pub current_sales_amount: String,
    pub current_quotations_amount: String,
    pub current_orders_amount: String,
    pub current_hours_worked: String,
    pub current_new_clients: i32,
    pub current_new_leads: i32,
    pub current_check_ins: i32,
    pub current_calls: i32,

    pub period_start_date: NaiveDate,
    pub period_end_date: NaiveDate,
    pub last_calculated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// Conversion from DB model to Domain model
impl From<UserTargetDB> for UserTarget {
    fn from(db: UserTargetDB) -> Self {
        UserTarget {
            id: db.id,
            user_id: db.user_id,
            currency: db.currency,
            target_sales_amount: Decimal::from_str(&db.target_sales_amount).unwrap_or_default(),
            target_quotations_amount: Decimal::from_str(&db.target_quotations_amount)
                .unwrap_or_default(),
            target_hours_worked: Decimal::from_str(&db.target_hours_worked).unwrap_or_default(),
            target_new_clients: db.target_new_clients,
            target_new_leads: db.target_new_leads,
            target_check_ins: db.target_check_ins,
            target_calls: db.target_calls,
            current_sales_amount: Decimal::from_str(&db.current_sales_amount).unwrap_or_default(),
            current_quotations_amount: Decimal::from_str(&db.current_quotations_amount)
                .unwrap_or_default(),
            current_orders_amount: Decimal::from_str(&db.current_orders_amount)
                .unwrap_or_default(),
            current_hours_worked: Decimal::from_str(&db.current_hours_worked).unwrap_or_default(),
            current_new_clients: db.current_new_clients,
            current_new_leads: db.current_new_leads,
            current_check_ins: db.current_check_ins,
            current_calls: db.current_calls,
            period_start_date: db.period_start_date,
            period_end_date: db.period_end_date,
            last_calculated_at: db.last_calculated_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

// Conversion from Domain model to DB model
impl From<UserTarget> for UserTargetDB {
    fn from(domain: UserTarget) -> Self {
        UserTargetDB {
            id: domain.id,
            user_id: domain.user_id,
            currency: domain.currency,
            target_sales_amount: domain
                .target_sales_amount
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            target_quotations_amount: domain
                .target_quotations_amount
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            target_hours_worked: domain
                .target_hours_worked
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            target_new_clients: domain.target_new_clients,
            target_new_leads: domain.target_new_leads,
            target_check_ins: domain.target_check_ins,
            target_calls: domain.target_calls,
            current_sales_amount: domain
                .current_sales_amount
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            current_quotations_amount: domain
                .current_quotations_amount
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            current_orders_amount: domain
                .current_orders_amount
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            current_hours_worked: domain
                .current_hours_worked
                .round_dp(DECIMAL_PRECISION)
                .to_string(),
            current_new_clients: domain.current_new_clients,
            current_new_leads: domain.current_new_leads,
            current_check_ins: domain.current_check_ins,
            current_calls: domain.current_calls,
            period_start_date: domain.period_start_date,
            period_end_date: domain.period_end_date,
            last_calculated_at: domain.last_calculated_at,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}
