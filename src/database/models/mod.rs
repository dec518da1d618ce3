// Database models - Re-exports all domain-specific models
//
// - scan_record.rs: Saved scans and insert payloads
// - tag.rs: Normalized tag statistics
// - settings.rs: Persisted preferences

mod scan_record;
mod settings;
mod tag;

pub use scan_record::{CaptureSource, NewScanRecord, ScanRecord};
pub use settings::{HistorySettings, Setting};
pub use tag::TagUsage;
