//! Staging-criterion adjudication.
//!
//! Curators review machine-suggested criteria row by row: saving drafts,
//! publishing new canonical criteria, or accepting a match against one that
//! already exists. Each row is an independent state machine over
//! `NEW -> IN_PROCESS -> EXISTING | ACTIVE`; the displayed status is derived
//! from the canonical catalog on every read, so a code collision surfaces as
//! EXISTING no matter what the registry last persisted.

pub mod attachment;
pub mod domain;
pub mod engine;
pub mod registry;
pub mod router;
pub mod service;
mod status;

#[cfg(test)]
mod tests;

pub use attachment::{AttachmentError, ValueAttachment, ValueOption};
pub use domain::{
    AdjudicationStatus, ComparisonOperator, CriteriaValue, Criterion, CriterionStaging,
    CriterionStagingPublish, CriterionStagingWithValueList, CriterionStagingWithValues, InputType,
    StagingValueAttachment, Study, StudyVersionAdjudication, Unit,
};
pub use engine::{AdjudicationError, CriterionRow, RowEdit};
pub use registry::{CriteriaRegistry, RegistryError};
pub use router::adjudication_router;
pub use service::{
    AdjudicationRowView, AdjudicationService, AttachmentView, CurationServiceError,
    GroupedAdjudication, StatusGroup,
};
pub use status::{RequestState, RequestTracker, STATUS_RESET_DELAY};
