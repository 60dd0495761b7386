use crate::records::records_errors::Result;
use crate::records::records_model::{RecordDeltas, ScanWindow};

/// Trait for the business-record sources feeding the incremental calculator
pub trait RecordSourceTrait: Send + Sync {
    /// Sum/count the records attributed to a user created inside the window
    fn deltas_between(&self, user_id: &str, window: &ScanWindow) -> Result<RecordDeltas>;
}
