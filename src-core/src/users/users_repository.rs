use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::get_connection;
use crate::schema::users;
use crate::users::users_errors::{Result, UserError};
use crate::users::users_model::{NewUser, User};
use crate::users::users_traits::UserRepositoryTrait;

/// Repository for managing user data in the database
pub struct UserRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl UserRepository {
    /// Creates a new UserRepository instance
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl UserRepositoryTrait for UserRepository {
    fn find_in_scope(&self, user_id: &str, company_id: &str) -> Result<User> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        users::table
            .filter(users::id.eq(user_id))
            .filter(users::company_id.eq(company_id))
            .filter(users::is_active.eq(true))
            .filter(users::deleted_at.is_null())
            .first::<User>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound(format!(
                    "User with id {} not found in scope",
                    user_id
                )),
                _ => UserError::DatabaseError(e.to_string()),
            })
    }

    fn get_by_id(&self, user_id: &str) -> Result<User> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    UserError::NotFound(format!("User with id {} not found", user_id))
                }
                _ => UserError::DatabaseError(e.to_string()),
            })
    }

    fn create(&self, mut new_user: NewUser) -> Result<User> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        if new_user.id.is_none() {
            new_user.id = Some(Uuid::new_v4().to_string());
        }

        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(&mut conn)
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        users::table
            .find(new_user.id.as_deref().unwrap_or_default())
            .first::<User>(&mut conn)
            .map_err(UserError::from)
    }
}
