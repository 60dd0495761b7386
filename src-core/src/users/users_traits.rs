use crate::users::users_errors::Result;
use crate::users::users_model::{NewUser, User};

/// Trait for user repository operations
pub trait UserRepositoryTrait: Send + Sync {
    /// Resolve a user inside a tenant scope. Soft-deleted, deactivated and
    /// out-of-scope users all resolve to NotFound.
    fn find_in_scope(&self, user_id: &str, company_id: &str) -> Result<User>;

    fn get_by_id(&self, user_id: &str) -> Result<User>;

    fn create(&self, new_user: NewUser) -> Result<User>;
}
