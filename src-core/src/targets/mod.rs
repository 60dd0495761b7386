// Module declarations
pub(crate) mod targets_errors;
pub(crate) mod targets_model;
pub(crate) mod targets_repository;
pub(crate) mod targets_service;
pub(crate) mod targets_traits;
pub(crate) mod targets_validator;

// Re-export the public interface
pub use targets_model::{
    newly_achieved, CurrentValues, MetricProgress, NewUserTarget, TargetField, UserTarget,
    UserTargetDB,
};
pub use targets_repository::{load_target, persist_target, TargetRepository};
pub use targets_service::TargetService;
pub use targets_traits::{TargetRepositoryTrait, TargetServiceTrait};
pub use targets_validator::{validate_aggregate, ValidatorConfig};

// Re-export error types for convenience
pub use targets_errors::TargetError;
