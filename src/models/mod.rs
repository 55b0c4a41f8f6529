pub mod account;
pub mod artifact;
pub mod job;
pub mod normalized_bill;

// Re-export core models for easy access
pub use account::Account;
pub use artifact::Artifact;
pub use job::{FailureReason, Job, JobType, JobUpdate};
pub use normalized_bill::{BillExtraction, LineItem, NewNormalizedBill, NormalizedBill};
