//! Loan application intake: form validation, document screening and upload, persistence,
//! public status lookup, and the admin review path.

pub mod documents;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use documents::{storage_key, DocumentStore, ObjectStore, StorageError};
pub use domain::{
    ApplicantDetails, ApplicationId, ApplicationStatus, ApplicationStatusView,
    DocumentReferences, DocumentSlot, EmploymentType, LoanApplication, LoanType, ReviewPatch,
};
pub use memory::{InMemoryApplicationRepository, InMemoryObjectStore, StoredObject};
pub use repository::{ApplicationRepository, RepositoryError};
pub use router::{application_router, submit_form, SUBMISSION_ACCEPTED_MESSAGE};
pub use service::{IntakeError, IntakeService, ReviewRequest, SubmissionReceipt};
pub use validation::{
    DocumentPart, DocumentRules, FieldViolation, FileRejection, SubmissionForm, ValidationError,
    ViolationRule,
};
