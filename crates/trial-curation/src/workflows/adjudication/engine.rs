use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    AdjudicationStatus, CriteriaValue, Criterion, CriterionStagingPublish,
    CriterionStagingWithValueList, CriterionStagingWithValues, InputType,
};
use super::registry::{CriteriaRegistry, RegistryError};
use super::status::{RequestState, RequestTracker};

/// Guard and transition failures of one staging-criterion row. The display
/// strings double as the user-facing error text.
#[derive(Debug, thiserror::Error)]
pub enum AdjudicationError {
    #[error("editing requires NEW or IN_PROCESS status, not {}", status.label())]
    NotEditable { status: AdjudicationStatus },
    #[error("accept requires EXISTING status, not {}", status.label())]
    NotAcceptable { status: AdjudicationStatus },
    #[error("publish requires a successful save with no edits since")]
    PublishNotReady,
    #[error("confirmation is required before an irreversible {action}")]
    ConfirmationRequired { action: &'static str },
    #[error("no canonical criterion bears code {code}")]
    NoCanonicalMatch { code: String },
    #[error("another request is already in flight")]
    RequestInFlight,
    #[error("values can only be attached to list-typed inputs")]
    NotListInput,
    #[error("Code already exists")]
    CodeConflict,
    #[error("The value already exists")]
    ValueConflict,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A curator edit to one staging criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RowEdit {
    DisplayName(String),
    Description(String),
    Code(String),
    InputType(i64),
    /// Replace the selected value ids; unknown ids are dropped.
    Selection(Vec<i64>),
}

/// Per-criterion adjudication state machine.
///
/// Owns the staging record, the publish-eligibility flag, and the transient
/// request indicator. The effective status is derived from the current
/// canonical-catalog snapshot on every call; rows never cache it.
#[derive(Debug)]
pub struct CriterionRow {
    record: CriterionStagingWithValueList,
    can_publish: bool,
    /// Bumped on every edit. A save captures the epoch on submit and only
    /// grants publish eligibility if no edit landed while it was in flight.
    edit_epoch: u64,
    creating_value: bool,
    request: RequestTracker,
}

impl CriterionRow {
    pub fn new(record: CriterionStagingWithValueList) -> Self {
        Self {
            record,
            can_publish: false,
            edit_epoch: 0,
            creating_value: false,
            request: RequestTracker::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.record.staging.id
    }

    pub fn record(&self) -> &CriterionStagingWithValueList {
        &self.record
    }

    pub fn can_publish(&self) -> bool {
        self.can_publish
    }

    pub fn request_state(&self) -> RequestState {
        self.request.state()
    }

    pub fn request_error(&self) -> Option<String> {
        self.request.error()
    }

    pub fn effective_status(&self, catalog: &[Criterion]) -> AdjudicationStatus {
        self.record.staging.effective_status(catalog)
    }

    pub fn is_editable(&self, catalog: &[Criterion]) -> bool {
        matches!(
            self.effective_status(catalog),
            AdjudicationStatus::New | AdjudicationStatus::InProcess
        )
    }

    /// Actions offered for the current effective status.
    pub fn offered_actions(&self, catalog: &[Criterion]) -> &'static [&'static str] {
        match self.effective_status(catalog) {
            AdjudicationStatus::New | AdjudicationStatus::InProcess => &["save", "publish"],
            AdjudicationStatus::Existing => &["accept"],
            AdjudicationStatus::Active => &[],
        }
    }

    /// Input type governing the row: the matched canonical criterion's when
    /// the row resolves to EXISTING, the staged one otherwise.
    pub fn effective_input_type_id(&self, catalog: &[Criterion]) -> i64 {
        if self.record.staging.criterion_adjudication_status != AdjudicationStatus::Active {
            if let Some(canonical) = self.record.staging.canonical_match(catalog) {
                return canonical.input_type_id;
            }
        }
        self.record.staging.input_type_id
    }

    pub fn is_list(&self, catalog: &[Criterion], input_types: &[InputType]) -> bool {
        let id = self.effective_input_type_id(catalog);
        input_types
            .iter()
            .find(|input_type| input_type.id == id)
            .is_some_and(InputType::is_list)
    }

    /// Apply a form edit. Every edit revokes publish eligibility, including
    /// one that re-enters the same value.
    pub fn apply_edit(
        &mut self,
        edit: RowEdit,
        catalog: &[Criterion],
        input_types: &[InputType],
        lookup_values: &[CriteriaValue],
    ) -> Result<(), AdjudicationError> {
        let status = self.effective_status(catalog);
        let code_only = matches!(edit, RowEdit::Code(_));
        if status == AdjudicationStatus::Active
            || (!code_only && !matches!(status, AdjudicationStatus::New | AdjudicationStatus::InProcess))
        {
            return Err(AdjudicationError::NotEditable { status });
        }

        match edit {
            RowEdit::DisplayName(display_name) => self.record.staging.display_name = display_name,
            RowEdit::Description(description) => self.record.staging.description = description,
            RowEdit::Code(code) => {
                // Pointing at a code unknown to the catalog restarts the
                // adjudication; a known code resolves to EXISTING on the
                // next status derivation.
                let known = catalog.iter().any(|c| c.code == code);
                if !known && self.record.staging.code != code {
                    self.record.staging.criterion_adjudication_status = AdjudicationStatus::New;
                }
                self.record.staging.code = code;
            }
            RowEdit::InputType(input_type_id) => {
                self.record.staging.input_type_id = input_type_id;
                let is_list = input_types
                    .iter()
                    .find(|input_type| input_type.id == input_type_id)
                    .is_some_and(InputType::is_list);
                // A multi-value selection is only meaningful on list inputs.
                if !is_list {
                    self.record.criterion_value_list = Some(Vec::new());
                }
            }
            RowEdit::Selection(ids) => {
                let current = self.record.criterion_value_list.take().unwrap_or_default();
                let selected = ids
                    .iter()
                    .filter_map(|id| {
                        current
                            .iter()
                            .find(|value| value.id == *id)
                            .or_else(|| lookup_values.iter().find(|value| value.id == *id))
                            .cloned()
                    })
                    .collect();
                self.record.criterion_value_list = Some(selected);
            }
        }

        self.mark_edited();
        Ok(())
    }

    fn mark_edited(&mut self) {
        self.edit_epoch += 1;
        self.can_publish = false;
    }

    /// Persist the editable fields. On success the display value list is
    /// rebuilt from the returned ids against the shared lookup collection and
    /// the row becomes publish-eligible, unless an edit landed while the
    /// request was in flight. On failure the record is left untouched.
    pub async fn save<R>(
        &mut self,
        registry: &R,
        catalog: &[Criterion],
        lookup_values: &[CriteriaValue],
    ) -> Result<CriterionStagingWithValueList, AdjudicationError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        let status = self.effective_status(catalog);
        if !matches!(status, AdjudicationStatus::New | AdjudicationStatus::InProcess) {
            return Err(AdjudicationError::NotEditable { status });
        }
        if self.request.is_sending() {
            return Err(AdjudicationError::RequestInFlight);
        }

        let epoch = self.edit_epoch;
        self.request.begin();

        let mut staging = self.record.staging.clone();
        staging.criterion_id = None;
        let payload = CriterionStagingWithValues {
            staging,
            criterion_value_ids: self.record.selected_value_ids(),
        };

        match registry.save_staging(&payload).await {
            Ok(saved) => {
                let ids: HashSet<i64> = saved.criterion_value_ids.iter().copied().collect();
                self.record = CriterionStagingWithValueList {
                    staging: saved.staging,
                    criterion_value_list: Some(
                        lookup_values
                            .iter()
                            .filter(|value| ids.contains(&value.id))
                            .cloned()
                            .collect(),
                    ),
                };
                self.can_publish = self.edit_epoch == epoch;
                self.request.succeed();
                Ok(self.record.clone())
            }
            Err(err) => {
                self.request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Promote the row into the canonical catalog. Irreversible, so the
    /// caller must confirm, and a successful save with no edits since must
    /// precede it.
    pub async fn publish<R>(
        &mut self,
        registry: &R,
        catalog: &[Criterion],
        confirmed: bool,
    ) -> Result<CriterionStagingWithValueList, AdjudicationError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        if !confirmed {
            return Err(AdjudicationError::ConfirmationRequired { action: "publish" });
        }
        let status = self.effective_status(catalog);
        if !matches!(status, AdjudicationStatus::New | AdjudicationStatus::InProcess) {
            return Err(AdjudicationError::NotEditable { status });
        }
        if !self.can_publish {
            return Err(AdjudicationError::PublishNotReady);
        }
        if self.request.is_sending() {
            return Err(AdjudicationError::RequestInFlight);
        }

        self.request.begin();
        let payload = CriterionStagingPublish {
            code: self.record.staging.code.clone(),
            display_name: self.record.staging.display_name.clone(),
            description: self.record.staging.description.clone(),
            active: true,
            input_type_id: self.record.staging.input_type_id,
            criterion_staging_id: self.record.staging.id,
            values: self.record.selected_value_ids(),
        };

        match registry.publish_criterion(&payload).await {
            Ok(_code) => {
                self.record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
                self.can_publish = false;
                self.request.succeed();
                Ok(self.record.clone())
            }
            Err(RegistryError::Conflict) => {
                let err = AdjudicationError::CodeConflict;
                self.request.fail(err.to_string());
                Err(err)
            }
            Err(err) => {
                self.request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Adopt the canonical criterion this row collides with. The save of the
    /// pre-populated snapshot must resolve before the accept call is issued;
    /// an accept failure after a successful save leaves the row EXISTING.
    pub async fn accept<R>(
        &mut self,
        registry: &R,
        catalog: &[Criterion],
        confirmed: bool,
    ) -> Result<CriterionStagingWithValueList, AdjudicationError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        if !confirmed {
            return Err(AdjudicationError::ConfirmationRequired { action: "accept" });
        }
        let status = self.effective_status(catalog);
        if status != AdjudicationStatus::Existing {
            return Err(AdjudicationError::NotAcceptable { status });
        }
        let canonical = self
            .record
            .staging
            .canonical_match(catalog)
            .cloned()
            .ok_or_else(|| AdjudicationError::NoCanonicalMatch {
                code: self.record.staging.code.clone(),
            })?;
        if self.request.is_sending() {
            return Err(AdjudicationError::RequestInFlight);
        }

        self.request.begin();

        let mut staging = self.record.staging.clone();
        staging.code = canonical.code.clone();
        staging.criterion_id = Some(canonical.id);
        staging.display_name = canonical.display_name.clone();
        staging.description = canonical.description.clone();
        staging.input_type_id = canonical.input_type_id;
        let payload = CriterionStagingWithValues {
            staging,
            criterion_value_ids: canonical.values.iter().map(|value| value.id).collect(),
        };

        if let Err(err) = registry.save_staging(&payload).await {
            self.request.fail(err.to_string());
            return Err(err.into());
        }

        match registry.accept_staging(self.record.staging.id).await {
            Ok(_) => {
                let staging = &mut self.record.staging;
                staging.criterion_adjudication_status = AdjudicationStatus::Active;
                staging.code = canonical.code.clone();
                staging.criterion_id = Some(canonical.id);
                staging.display_name = canonical.display_name.clone();
                staging.description = canonical.description.clone();
                staging.input_type_id = canonical.input_type_id;
                self.record.criterion_value_list = Some(canonical.values.clone());
                self.request.succeed();
                Ok(self.record.clone())
            }
            Err(err) => {
                self.request.fail(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Create a free-text option typed into a list-valued field. Blank
    /// labels, labels already selected, and re-entrant calls are ignored.
    /// The created value joins the current selection; the caller appends it
    /// to the shared lookup collection.
    pub async fn create_option<R>(
        &mut self,
        registry: &R,
        catalog: &[Criterion],
        input_types: &[InputType],
        label: &str,
    ) -> Result<Option<CriteriaValue>, AdjudicationError>
    where
        R: CriteriaRegistry + ?Sized,
    {
        let status = self.effective_status(catalog);
        if !matches!(status, AdjudicationStatus::New | AdjudicationStatus::InProcess) {
            return Err(AdjudicationError::NotEditable { status });
        }
        if !self.is_list(catalog, input_types) {
            return Err(AdjudicationError::NotListInput);
        }

        let label = label.trim();
        let already_selected = self
            .record
            .criterion_value_list
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|value| {
                value
                    .value_string
                    .as_deref()
                    .is_some_and(|existing| existing.eq_ignore_ascii_case(label))
            });
        if label.is_empty() || already_selected || self.creating_value {
            return Ok(None);
        }

        self.creating_value = true;
        let draft = CriteriaValue::free_text(label);
        let result = registry.create_value(&draft).await;
        self.creating_value = false;

        match result {
            Ok(value) => {
                self.record
                    .criterion_value_list
                    .get_or_insert_with(Vec::new)
                    .push(value.clone());
                // A post-save edit: publish eligibility is gone until the
                // next successful save.
                self.mark_edited();
                Ok(Some(value))
            }
            Err(RegistryError::Conflict) => {
                let err = AdjudicationError::ValueConflict;
                self.request.fail(err.to_string());
                Err(err)
            }
            Err(err) => {
                self.request.fail(err.to_string());
                Err(err.into())
            }
        }
    }
}
