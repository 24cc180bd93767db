use async_trait::async_trait;

use super::domain::{
    CriteriaValue, Criterion, CriterionStagingPublish, CriterionStagingWithValueList,
    CriterionStagingWithValues, InputType, StagingValueAttachment, StudyVersionAdjudication, Unit,
};

/// The external criteria registry, one method per documented REST call.
/// Implementations live at the edges (HTTP client in the service binary,
/// in-memory double in tests) so the workflow engines can be exercised in
/// isolation.
#[async_trait]
pub trait CriteriaRegistry: Send + Sync {
    /// Staging criteria proposed for one trial's criteria set.
    async fn staging_for_trial(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<Vec<CriterionStagingWithValueList>, RegistryError>;

    /// Persist curator edits to a staging criterion; returns the canonical
    /// record.
    async fn save_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError>;

    /// Promote a staging criterion into the canonical catalog; returns the
    /// published code. Conflicts on duplicate codes.
    async fn publish_criterion(
        &self,
        publish: &CriterionStagingPublish,
    ) -> Result<String, RegistryError>;

    /// Accept a staging criterion that matches an existing canonical one.
    async fn accept_staging(&self, id: i64) -> Result<CriterionStagingWithValues, RegistryError>;

    /// Persist value-attachment edits to a staging criterion.
    async fn update_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError>;

    /// Publish the value attachment of a trial-criterion link.
    async fn publish_value_attachment(
        &self,
        attachment: &StagingValueAttachment,
    ) -> Result<String, RegistryError>;

    /// Create a permissible value. Conflicts on duplicates.
    async fn create_value(&self, value: &CriteriaValue) -> Result<CriteriaValue, RegistryError>;

    async fn list_values(&self) -> Result<Vec<CriteriaValue>, RegistryError>;

    async fn list_units(&self) -> Result<Vec<Unit>, RegistryError>;

    async fn list_input_types(&self) -> Result<Vec<InputType>, RegistryError>;

    /// The canonical criteria catalog.
    async fn list_criteria(&self) -> Result<Vec<Criterion>, RegistryError>;

    /// Canonical criteria not yet placed on the match form.
    async fn criteria_missing_from_match_form(&self) -> Result<Vec<Criterion>, RegistryError>;

    /// Study versions open for adjudication.
    async fn adjudication_studies(&self) -> Result<Vec<StudyVersionAdjudication>, RegistryError>;
}

/// Failure modes of a registry round-trip.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The registry refused a create/publish because the resource exists.
    #[error("resource already exists")]
    Conflict,
    #[error("resource not found")]
    NotFound,
    /// Non-2xx response; carries the message extracted from the error body
    /// when one was present.
    #[error("{0}")]
    Rejected(String),
    /// The request failed before a response arrived.
    #[error("registry unreachable: {0}")]
    Transport(String),
}
