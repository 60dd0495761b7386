use chrono::NaiveDate;

use crate::targets::targets_errors::Result;
use crate::targets::targets_model::{MetricProgress, NewUserTarget, UserTarget};

/// Trait for target-aggregate repository operations
pub trait TargetRepositoryTrait: Send + Sync {
    fn get_by_user_id(&self, user_id: &str) -> Result<Option<UserTarget>>;

    fn insert_new(&self, new_target: NewUserTarget) -> Result<UserTarget>;

    /// Persist a mutated aggregate in one write
    fn save(&self, target: &UserTarget) -> Result<UserTarget>;

    fn delete_by_user_id(&self, user_id: &str) -> Result<usize>;
}

/// Trait for the human-facing target lifecycle operations
pub trait TargetServiceTrait: Send + Sync {
    fn set_target(&self, new_target: NewUserTarget) -> Result<UserTarget>;

    fn get_target(&self, user_id: &str) -> Result<UserTarget>;

    fn get_progress(&self, user_id: &str) -> Result<Vec<MetricProgress>>;

    /// Move the aggregate onto a new period, restarting its counters and
    /// clearing the watermark
    fn update_period(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<UserTarget>;

    fn delete_target(&self, user_id: &str) -> Result<usize>;
}
