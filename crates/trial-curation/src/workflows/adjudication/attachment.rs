use serde::Serialize;

use super::domain::{
    AdjudicationStatus, ComparisonOperator, CriteriaValue, CriterionStagingWithValueList,
    CriterionStagingWithValues, InputType, StagingValueAttachment, Unit,
};
use super::registry::{CriteriaRegistry, RegistryError};
use super::status::{RequestState, RequestTracker};

/// Failures of the value-attachment workflow.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("confirmation is required before an irreversible publish")]
    ConfirmationRequired,
    #[error("the value attachment is already published")]
    AlreadyPublished,
    #[error("publishing values requires a saved, non-empty selection")]
    PublishNotReady,
    #[error("another request is already in flight")]
    RequestInFlight,
    #[error("operator, value, and unit are all required")]
    IncompleteValue,
    #[error("The value already exists")]
    ValueConflict,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One selectable value with its rendered label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueOption {
    pub id: i64,
    pub label: String,
}

/// Value-attachment adjudication for one staging criterion: which permissible
/// values the trial-criterion link carries, adjudicated separately from the
/// criterion itself. Publishing is terminal.
#[derive(Debug)]
pub struct ValueAttachment {
    staging: CriterionStagingWithValueList,
    attached_value_ids: Vec<i64>,
    values_changed: bool,
    values_saved: bool,
    published: bool,
    save_request: RequestTracker,
    add_request: RequestTracker,
}

impl ValueAttachment {
    pub fn new(staging: CriterionStagingWithValueList) -> Self {
        let attached_value_ids = staging.staging.echc_value_ids.clone().unwrap_or_default();
        let published = staging.staging.echc_adjudication_status == AdjudicationStatus::Active;
        Self {
            staging,
            attached_value_ids,
            values_changed: false,
            values_saved: false,
            published,
            save_request: RequestTracker::new(),
            add_request: RequestTracker::new(),
        }
    }

    pub fn staging(&self) -> &CriterionStagingWithValueList {
        &self.staging
    }

    pub fn attached_value_ids(&self) -> &[i64] {
        &self.attached_value_ids
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Whether the selection has unsaved edits.
    pub fn values_changed(&self) -> bool {
        self.values_changed
    }

    pub fn save_state(&self) -> RequestState {
        self.save_request.state()
    }

    pub fn add_state(&self) -> RequestState {
        self.add_request.state()
    }

    pub fn error(&self) -> Option<String> {
        self.save_request.error().or_else(|| self.add_request.error())
    }

    pub fn is_list(&self, input_types: &[InputType]) -> bool {
        input_types
            .iter()
            .find(|input_type| input_type.id == self.staging.staging.input_type_id)
            .is_some_and(InputType::is_list)
    }

    /// Replace the attached value selection. Saving becomes required again.
    pub fn set_attached(&mut self, value_ids: Vec<i64>) -> Result<(), AttachmentError> {
        if self.published {
            return Err(AttachmentError::AlreadyPublished);
        }
        self.attached_value_ids = value_ids;
        self.values_changed = true;
        Ok(())
    }

    /// Persist the attached ids through the staging update endpoint. The
    /// changed flag clears whether or not the call succeeds; only a success
    /// makes the selection publishable.
    pub async fn save<R>(&mut self, registry: &R) -> Result<(), AttachmentError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        if self.published {
            return Err(AttachmentError::AlreadyPublished);
        }
        if self.save_request.is_sending() {
            return Err(AttachmentError::RequestInFlight);
        }

        self.save_request.begin();
        let mut staging = self.staging.staging.clone();
        staging.echc_value_ids = Some(
            self.attached_value_ids
                .iter()
                .copied()
                .filter(|id| *id != 0)
                .collect(),
        );
        let payload = CriterionStagingWithValues {
            staging,
            criterion_value_ids: self.staging.selected_value_ids(),
        };

        let result = registry.update_staging(&payload).await;
        self.values_changed = false;
        match result {
            Ok(updated) => {
                self.staging.staging = updated.staging;
                self.values_saved = true;
                self.save_request.succeed();
                Ok(())
            }
            Err(err) => {
                self.save_request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Publish the value attachment. Irreversible; requires confirmation, a
    /// prior successful save, and a non-empty selection.
    pub async fn publish<R>(&mut self, registry: &R, confirmed: bool) -> Result<(), AttachmentError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        if !confirmed {
            return Err(AttachmentError::ConfirmationRequired);
        }
        if self.published {
            return Err(AttachmentError::AlreadyPublished);
        }
        if !self.values_saved || self.attached_value_ids.is_empty() {
            return Err(AttachmentError::PublishNotReady);
        }
        if self.save_request.is_sending() {
            return Err(AttachmentError::RequestInFlight);
        }

        self.save_request.begin();
        let payload = StagingValueAttachment {
            criterion_id: self.staging.staging.criterion_id,
            eligibility_criteria_id: self.staging.staging.eligibility_criteria_id,
            criterion_staging_id: self.staging.staging.id,
            active: true,
            value_ids: self.attached_value_ids.clone(),
        };

        match registry.publish_value_attachment(&payload).await {
            Ok(_) => {
                self.published = true;
                self.staging.staging.echc_adjudication_status = AdjudicationStatus::Active;
                self.save_request.succeed();
                Ok(())
            }
            Err(err) => {
                self.save_request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Create a numeric bound for a non-list row. The returned value belongs
    /// in the shared numeric-value collection, appended by the caller.
    pub async fn add_numeric_value<R>(
        &mut self,
        registry: &R,
        operator: ComparisonOperator,
        value_string: &str,
        unit: &Unit,
    ) -> Result<CriteriaValue, AttachmentError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        if self.published {
            return Err(AttachmentError::AlreadyPublished);
        }
        if value_string.trim().is_empty() {
            return Err(AttachmentError::IncompleteValue);
        }
        if self.add_request.is_sending() {
            return Err(AttachmentError::RequestInFlight);
        }

        self.add_request.begin();
        let draft = CriteriaValue::numeric(operator, value_string.trim(), unit);
        match registry.create_value(&draft).await {
            Ok(value) => {
                self.add_request.succeed();
                Ok(value)
            }
            Err(RegistryError::Conflict) => {
                let err = AttachmentError::ValueConflict;
                self.add_request.fail(err.to_string());
                Err(err)
            }
            Err(err) => {
                self.add_request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Options offered on the attachment selector: the row's own list values
    /// for list-typed inputs, the shared numeric values otherwise.
    pub fn option_labels(
        &self,
        input_types: &[InputType],
        numeric_values: &[CriteriaValue],
        units: &[Unit],
    ) -> Vec<ValueOption> {
        if self.is_list(input_types) {
            self.staging
                .criterion_value_list
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|value| ValueOption {
                    id: value.id,
                    label: format!("== {}", value.value_string.as_deref().unwrap_or_default()),
                })
                .collect()
        } else {
            numeric_values
                .iter()
                .map(|value| {
                    let unit_name = units
                        .iter()
                        .find(|unit| unit.id == value.unit_id)
                        .map(|unit| unit.name.as_str())
                        .filter(|name| *name != "none")
                        .unwrap_or_default();
                    let symbol = value
                        .operator
                        .map(ComparisonOperator::symbol)
                        .unwrap_or_default();
                    let label = [
                        symbol,
                        value.value_string.as_deref().unwrap_or_default(),
                        unit_name,
                    ]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                    ValueOption {
                        id: value.id,
                        label,
                    }
                })
                .collect()
        }
    }
}
