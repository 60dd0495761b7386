// Module declarations
pub(crate) mod records_errors;
pub(crate) mod records_model;
pub(crate) mod records_repository;
pub(crate) mod records_traits;

// Re-export the public interface
pub use records_model::{CheckIn, Client, Lead, Quotation, RecordDeltas, ScanWindow};
pub use records_repository::RecordRepository;
pub use records_traits::RecordSourceTrait;

// Re-export error types for convenience
pub use records_errors::RecordError;
