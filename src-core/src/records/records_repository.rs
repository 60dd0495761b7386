use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::constants::{OPEN_QUOTATION_STATUSES, ORDER_QUOTATION_STATUSES};
use crate::db::get_connection;
use crate::records::records_errors::{RecordError, Result};
use crate::records::records_model::{RecordDeltas, ScanWindow};
use crate::records::records_traits::RecordSourceTrait;
use crate::schema::{check_ins, clients, leads, quotations};

/// Repository aggregating the business-record sources tracked by user targets
pub struct RecordRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl RecordRepository {
    /// Creates a new RecordRepository instance
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    fn sum_quotation_amounts(
        conn: &mut SqliteConnection,
        user_id: &str,
        statuses: &[&str],
        window: &ScanWindow,
    ) -> QueryResult<Decimal> {
        let base = quotations::table
            .filter(quotations::user_id.eq(user_id))
            .filter(quotations::status.eq_any(statuses.iter().copied()))
            .filter(quotations::created_at.le(window.to))
            .select(quotations::total_amount);

        let amounts: Vec<f64> = if window.include_start {
            base.filter(quotations::created_at.ge(window.from))
                .load(conn)?
        } else {
            base.filter(quotations::created_at.gt(window.from))
                .load(conn)?
        };

        // Sum per row as Decimal rather than accumulating floats
        Ok(amounts
            .into_iter()
            .filter_map(Decimal::from_f64)
            .fold(Decimal::ZERO, |acc, amount| acc + amount))
    }

    fn count_leads(
        conn: &mut SqliteConnection,
        user_id: &str,
        window: &ScanWindow,
    ) -> QueryResult<i64> {
        let base = leads::table
            .filter(leads::user_id.eq(user_id))
            .filter(leads::created_at.le(window.to));

        if window.include_start {
            base.filter(leads::created_at.ge(window.from))
                .count()
                .get_result(conn)
        } else {
            base.filter(leads::created_at.gt(window.from))
                .count()
                .get_result(conn)
        }
    }

    fn count_clients(
        conn: &mut SqliteConnection,
        user_id: &str,
        window: &ScanWindow,
    ) -> QueryResult<i64> {
        let base = clients::table
            .filter(clients::user_id.eq(user_id))
            .filter(clients::created_at.le(window.to));

        if window.include_start {
            base.filter(clients::created_at.ge(window.from))
                .count()
                .get_result(conn)
        } else {
            base.filter(clients::created_at.gt(window.from))
                .count()
                .get_result(conn)
        }
    }

    fn count_check_ins(
        conn: &mut SqliteConnection,
        user_id: &str,
        window: &ScanWindow,
    ) -> QueryResult<i64> {
        let base = check_ins::table
            .filter(check_ins::user_id.eq(user_id))
            .filter(check_ins::created_at.le(window.to));

        if window.include_start {
            base.filter(check_ins::created_at.ge(window.from))
                .count()
                .get_result(conn)
        } else {
            base.filter(check_ins::created_at.gt(window.from))
                .count()
                .get_result(conn)
        }
    }
}

impl RecordSourceTrait for RecordRepository {
    fn deltas_between(&self, user_id: &str, window: &ScanWindow) -> Result<RecordDeltas> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| RecordError::DatabaseError(e.to_string()))?;

        let open_quotations_amount =
            Self::sum_quotation_amounts(&mut conn, user_id, &OPEN_QUOTATION_STATUSES, window)?;
        let orders_amount =
            Self::sum_quotation_amounts(&mut conn, user_id, &ORDER_QUOTATION_STATUSES, window)?;
        let new_leads = Self::count_leads(&mut conn, user_id, window)?;
        let new_clients = Self::count_clients(&mut conn, user_id, window)?;
        let check_ins = Self::count_check_ins(&mut conn, user_id, window)?;

        Ok(RecordDeltas {
            open_quotations_amount,
            orders_amount,
            new_leads: new_leads as i32,
            new_clients: new_clients as i32,
            check_ins: check_ins as i32,
        })
    }
}
