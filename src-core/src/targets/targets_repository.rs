use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::schema::user_targets;
use crate::targets::targets_errors::{Result, TargetError};
use crate::targets::targets_model::{NewUserTarget, UserTarget, UserTargetDB};
use crate::targets::targets_traits::TargetRepositoryTrait;

/// Loads a user's aggregate through an existing connection. Used both by the
/// pooled repository methods and inside locked transactions, where the
/// re-read must happen on the transaction's own connection.
pub fn load_target(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<UserTarget>> {
    user_targets::table
        .filter(user_targets::user_id.eq(user_id))
        .first::<UserTargetDB>(conn)
        .optional()
        .map_err(TargetError::from)
        .map(|row| row.map(UserTarget::from))
}

/// Writes a mutated aggregate through an existing connection, stamping
/// `updated_at`. The whole row goes out in one write.
pub fn persist_target(conn: &mut SqliteConnection, target: &UserTarget) -> Result<UserTarget> {
    let mut target_db: UserTargetDB = target.clone().into();
    target_db.updated_at = Utc::now().naive_utc();

    diesel::update(user_targets::table.find(&target_db.id))
        .set(&target_db)
        .execute(conn)
        .map_err(TargetError::from)?;

    Ok(UserTarget::from(target_db))
}

/// Repository for managing target aggregates in the database
pub struct TargetRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl TargetRepository {
    /// Creates a new TargetRepository instance
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl TargetRepositoryTrait for TargetRepository {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<UserTarget>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TargetError::DatabaseError(e.to_string()))?;
        load_target(&mut conn, user_id)
    }

    fn insert_new(&self, new_target: NewUserTarget) -> Result<UserTarget> {
        new_target.validate()?;

        let mut conn = get_connection(&self.pool)
            .map_err(|e| TargetError::DatabaseError(e.to_string()))?;

        let target = UserTarget::from(new_target);
        let target_db: UserTargetDB = target.clone().into();

        diesel::insert_into(user_targets::table)
            .values(&target_db)
            .execute(&mut conn)
            .map_err(TargetError::from)?;

        Ok(target)
    }

    fn save(&self, target: &UserTarget) -> Result<UserTarget> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TargetError::DatabaseError(e.to_string()))?;
        persist_target(&mut conn, target)
    }

    fn delete_by_user_id(&self, user_id: &str) -> Result<usize> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TargetError::DatabaseError(e.to_string()))?;

        diesel::delete(user_targets::table.filter(user_targets::user_id.eq(user_id)))
            .execute(&mut conn)
            .map_err(TargetError::from)
    }
}
