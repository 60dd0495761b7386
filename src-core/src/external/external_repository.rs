use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::errors::Result;
use crate::external::external_model::{UpdateReceipt, UpdateReceiptDB};
use crate::schema::external_update_receipts;

/// Writes an idempotency receipt through an existing connection, so it
/// commits atomically with the aggregate mutation it records.
pub fn insert_receipt(conn: &mut SqliteConnection, receipt: &UpdateReceipt) -> Result<()> {
    let receipt_db: UpdateReceiptDB = receipt.clone().into();
    diesel::insert_into(external_update_receipts::table)
        .values(&receipt_db)
        .execute(conn)?;
    Ok(())
}

/// Repository for external-update idempotency receipts
pub struct ReceiptRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl ReceiptRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        ReceiptRepository { pool }
    }

    /// Looks up an unexpired receipt for a transaction id
    pub fn find_valid(
        &self,
        transaction_id: &str,
        now: NaiveDateTime,
    ) -> Result<Option<UpdateReceipt>> {
        let mut conn = get_connection(&self.pool)?;

        Ok(external_update_receipts::table
            .find(transaction_id)
            .filter(external_update_receipts::expires_at.gt(now))
            .first::<UpdateReceiptDB>(&mut conn)
            .optional()?
            .map(UpdateReceipt::from))
    }

    /// Drops receipts past their TTL
    pub fn purge_expired(&self, now: NaiveDateTime) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;

        Ok(diesel::delete(
            external_update_receipts::table.filter(external_update_receipts::expires_at.le(now)),
        )
        .execute(&mut conn)?)
    }
}
