// Module declarations
pub(crate) mod external_model;
pub(crate) mod external_repository;
pub(crate) mod external_service;

// Re-export the public interface
pub use external_model::{
    AuditRecord, ConflictDetails, ExternalUpdateOutcome, ExternalUpdateRequest, FieldContribution,
    FieldDelta, RetryPolicy, TargetFieldUpdates, UpdateMode, UpdateReceipt, UpdateReceiptDB,
};
pub use external_repository::ReceiptRepository;
pub use external_service::ExternalTargetUpdateService;
