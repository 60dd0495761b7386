use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A sales quotation. Open statuses count against the quotations target;
/// WON/INVOICED quotations count as orders.
#[derive(
    Insertable,
    Queryable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::quotations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub status: String,
    pub total_amount: f64,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(
    Insertable,
    Queryable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::leads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(
    Insertable,
    Queryable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::clients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(
    Insertable,
    Queryable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::check_ins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub location: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Window scanned for new business records.
///
/// The start bound is closed only on the very first calculation (when the
/// watermark has never been persisted); afterwards it is open so records
/// stamped exactly at a previous scan end are never counted twice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub include_start: bool,
}

/// New-record totals for one user inside one scan window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDeltas {
    pub open_quotations_amount: Decimal,
    pub orders_amount: Decimal,
    pub new_leads: i32,
    pub new_clients: i32,
    pub check_ins: i32,
}

impl RecordDeltas {
    /// True when the window contained no qualifying records in any source
    pub fn is_empty(&self) -> bool {
        self.open_quotations_amount.is_zero()
            && self.orders_amount.is_zero()
            && self.new_leads == 0
            && self.new_clients == 0
            && self.check_ins == 0
    }
}
