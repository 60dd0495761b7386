use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use crate::targets::targets_errors::{Result, TargetError};
use crate::targets::targets_model::{MetricProgress, NewUserTarget, UserTarget};
use crate::targets::targets_traits::{TargetRepositoryTrait, TargetServiceTrait};

/// Service for the human-facing target lifecycle. The engine itself never
/// goes through this service; it mutates current values directly.
pub struct TargetService<T: TargetRepositoryTrait> {
    target_repo: Arc<T>,
}

impl<T: TargetRepositoryTrait> TargetService<T> {
    pub fn new(target_repo: Arc<T>) -> Self {
        TargetService { target_repo }
    }
}

impl<T: TargetRepositoryTrait> TargetServiceTrait for TargetService<T> {
    fn set_target(&self, new_target: NewUserTarget) -> Result<UserTarget> {
        if self
            .target_repo
            .get_by_user_id(&new_target.user_id)?
            .is_some()
        {
            return Err(TargetError::InvalidData(format!(
                "User {} already has a target aggregate",
                new_target.user_id
            )));
        }

        debug!("Creating target aggregate for user {}", new_target.user_id);
        self.target_repo.insert_new(new_target)
    }

    fn get_target(&self, user_id: &str) -> Result<UserTarget> {
        self.target_repo.get_by_user_id(user_id)?.ok_or_else(|| {
            TargetError::NotFound(format!("User {} has no target aggregate", user_id))
        })
    }

    fn get_progress(&self, user_id: &str) -> Result<Vec<MetricProgress>> {
        Ok(self.get_target(user_id)?.progress())
    }

    fn update_period(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<UserTarget> {
        if start > end {
            return Err(TargetError::InvalidData(
                "periodStartDate must be before or equal to periodEndDate".to_string(),
            ));
        }

        let mut target = self.get_target(user_id)?;
        target.rebaseline_period(start, end);
        self.target_repo.save(&target)
    }

    fn delete_target(&self, user_id: &str) -> Result<usize> {
        let deleted = self.target_repo.delete_by_user_id(user_id)?;
        if deleted == 0 {
            return Err(TargetError::NotFound(format!(
                "User {} has no target aggregate",
                user_id
            )));
        }
        Ok(deleted)
    }
}
