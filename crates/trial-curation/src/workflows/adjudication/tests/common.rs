use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::workflows::adjudication::domain::{
    AdjudicationStatus, ComparisonOperator, CriteriaValue, Criterion, CriterionStaging,
    CriterionStagingPublish, CriterionStagingWithValueList, CriterionStagingWithValues, InputType,
    StagingValueAttachment, Study, StudyVersionAdjudication, Unit,
};
use crate::workflows::adjudication::registry::{CriteriaRegistry, RegistryError};
use crate::workflows::adjudication::service::AdjudicationService;

pub(super) const TRIAL_EBC_ID: i64 = 7;
pub(super) const LIST_INPUT: i64 = 1;
pub(super) const NUMBER_INPUT: i64 = 2;

pub(super) fn input_types() -> Vec<InputType> {
    vec![
        InputType {
            id: LIST_INPUT,
            data_type: "list".to_string(),
            render_type: "select".to_string(),
        },
        InputType {
            id: NUMBER_INPUT,
            data_type: "Integer".to_string(),
            render_type: "number".to_string(),
        },
    ]
}

pub(super) fn units() -> Vec<Unit> {
    vec![
        Unit {
            id: 1,
            name: "none".to_string(),
        },
        Unit {
            id: 2,
            name: "years".to_string(),
        },
        Unit {
            id: 3,
            name: "g/dL".to_string(),
        },
    ]
}

pub(super) fn free_text_value(id: i64, label: &str) -> CriteriaValue {
    CriteriaValue {
        id,
        value_string: Some(label.to_string()),
        description: Some(label.to_string()),
        is_numeric: false,
        active: true,
        operator: Some(ComparisonOperator::Eq),
        unit_id: 1,
        unit_name: Some("none".to_string()),
    }
}

pub(super) fn numeric_value(id: i64, value: &str, unit_id: i64) -> CriteriaValue {
    CriteriaValue {
        id,
        value_string: Some(value.to_string()),
        description: None,
        is_numeric: true,
        active: true,
        operator: Some(ComparisonOperator::Gte),
        unit_id,
        unit_name: None,
    }
}

pub(super) fn lookup_values() -> Vec<CriteriaValue> {
    vec![
        free_text_value(10, "Relapsed"),
        free_text_value(11, "Refractory"),
        numeric_value(20, "9", 3),
    ]
}

pub(super) fn canonical_criterion() -> Criterion {
    Criterion {
        id: 50,
        code: "ECOG_STATUS".to_string(),
        description: "ECOG performance status".to_string(),
        display_name: "ECOG Status".to_string(),
        input_type_id: NUMBER_INPUT,
        values: vec![numeric_value(21, "2", 1)],
    }
}

pub(super) fn staging_record(
    id: i64,
    code: &str,
    status: AdjudicationStatus,
    input_type_id: i64,
) -> CriterionStagingWithValues {
    CriterionStagingWithValues {
        staging: CriterionStaging {
            id,
            code: code.to_string(),
            description: format!("description for {code}"),
            display_name: format!("Display {code}"),
            text: format!("source excerpt for {code}"),
            input_id: 1,
            input_type_id,
            eligibility_criteria_id: TRIAL_EBC_ID,
            criterion_id: None,
            criterion_adjudication_status: status,
            echc_adjudication_status: AdjudicationStatus::New,
            echc_value_ids: None,
        },
        criterion_value_ids: Vec::new(),
    }
}

#[derive(Default)]
pub(super) struct RegistryState {
    pub(super) staging: HashMap<i64, CriterionStagingWithValues>,
    pub(super) criteria: Vec<Criterion>,
    pub(super) values: Vec<CriteriaValue>,
    pub(super) units: Vec<Unit>,
    pub(super) input_types: Vec<InputType>,
    pub(super) studies: Vec<StudyVersionAdjudication>,
    pub(super) published: Vec<CriterionStagingPublish>,
    pub(super) accepted: Vec<i64>,
    pub(super) attachments: Vec<StagingValueAttachment>,
    pub(super) calls: Vec<&'static str>,
    pub(super) next_value_id: i64,
    pub(super) fail_lists: bool,
    pub(super) fail_staging_list: bool,
    pub(super) fail_save: bool,
    pub(super) fail_accept: bool,
    pub(super) fail_update: bool,
    pub(super) conflict_on_publish: bool,
    pub(super) conflict_on_value: bool,
}

/// In-memory registry double driving the workflow engines in tests.
#[derive(Clone)]
pub(super) struct MemoryRegistry {
    pub(super) state: Arc<Mutex<RegistryState>>,
}

impl MemoryRegistry {
    pub(super) fn with_fixtures() -> Self {
        let mut state = RegistryState {
            criteria: vec![canonical_criterion()],
            values: lookup_values(),
            units: units(),
            input_types: input_types(),
            next_value_id: 100,
            ..RegistryState::default()
        };
        state.studies = vec![StudyVersionAdjudication {
            id: 1,
            study_id: 3,
            study_version_num: 2,
            active: true,
            eligibility_criteria_id: TRIAL_EBC_ID,
            study: Study {
                id: 3,
                code: "NCT-0042".to_string(),
                name: "Relapsed AML".to_string(),
            },
        }];
        for record in [
            staging_record(101, "NEW_CODE", AdjudicationStatus::New, LIST_INPUT),
            staging_record(102, "ECOG_STATUS", AdjudicationStatus::New, NUMBER_INPUT),
            staging_record(103, "DONE_CODE", AdjudicationStatus::Active, NUMBER_INPUT),
            staging_record(104, "OTHER_CODE", AdjudicationStatus::New, LIST_INPUT),
        ] {
            state.staging.insert(record.staging.id, record);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub(super) fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry mutex poisoned")
    }

    fn resolve_values(state: &RegistryState, ids: &[i64]) -> Vec<CriteriaValue> {
        state
            .values
            .iter()
            .filter(|value| ids.contains(&value.id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CriteriaRegistry for MemoryRegistry {
    async fn staging_for_trial(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<Vec<CriterionStagingWithValueList>, RegistryError> {
        let state = self.lock();
        if state.fail_staging_list {
            return Err(RegistryError::Transport("connection refused".to_string()));
        }
        let mut records: Vec<_> = state
            .staging
            .values()
            .filter(|record| record.staging.eligibility_criteria_id == eligibility_criteria_id)
            .map(|record| CriterionStagingWithValueList {
                staging: record.staging.clone(),
                criterion_value_list: Some(Self::resolve_values(
                    &state,
                    &record.criterion_value_ids,
                )),
            })
            .collect();
        records.sort_by_key(|record| record.staging.id);
        Ok(records)
    }

    async fn save_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.lock();
        state.calls.push("save");
        if state.fail_save {
            return Err(RegistryError::Rejected("save rejected".to_string()));
        }
        let mut saved = staging.clone();
        if saved.staging.criterion_adjudication_status == AdjudicationStatus::New {
            saved.staging.criterion_adjudication_status = AdjudicationStatus::InProcess;
        }
        state.staging.insert(saved.staging.id, saved.clone());
        Ok(saved)
    }

    async fn publish_criterion(
        &self,
        publish: &CriterionStagingPublish,
    ) -> Result<String, RegistryError> {
        let mut state = self.lock();
        state.calls.push("publish");
        if state.conflict_on_publish || state.criteria.iter().any(|c| c.code == publish.code) {
            return Err(RegistryError::Conflict);
        }
        state.published.push(publish.clone());
        if let Some(record) = state.staging.get_mut(&publish.criterion_staging_id) {
            record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        }
        Ok(publish.code.clone())
    }

    async fn accept_staging(&self, id: i64) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.lock();
        state.calls.push("accept");
        if state.fail_accept {
            return Err(RegistryError::Rejected("accept rejected".to_string()));
        }
        state.accepted.push(id);
        let record = state
            .staging
            .get_mut(&id)
            .ok_or(RegistryError::NotFound)?;
        record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        Ok(record.clone())
    }

    async fn update_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.lock();
        state.calls.push("update");
        if state.fail_update {
            return Err(RegistryError::Rejected("update rejected".to_string()));
        }
        state.staging.insert(staging.staging.id, staging.clone());
        Ok(staging.clone())
    }

    async fn publish_value_attachment(
        &self,
        attachment: &StagingValueAttachment,
    ) -> Result<String, RegistryError> {
        let mut state = self.lock();
        state.calls.push("publish_attachment");
        state.attachments.push(attachment.clone());
        if let Some(record) = state.staging.get_mut(&attachment.criterion_staging_id) {
            record.staging.echc_adjudication_status = AdjudicationStatus::Active;
        }
        Ok("published".to_string())
    }

    async fn create_value(&self, value: &CriteriaValue) -> Result<CriteriaValue, RegistryError> {
        let mut state = self.lock();
        state.calls.push("create_value");
        let duplicate = state.values.iter().any(|existing| {
            existing.value_string == value.value_string && existing.is_numeric == value.is_numeric
        });
        if state.conflict_on_value || duplicate {
            return Err(RegistryError::Conflict);
        }
        let mut created = value.clone();
        created.id = state.next_value_id;
        state.next_value_id += 1;
        state.values.push(created.clone());
        Ok(created)
    }

    async fn list_values(&self) -> Result<Vec<CriteriaValue>, RegistryError> {
        let state = self.lock();
        if state.fail_lists {
            return Err(RegistryError::Transport("connection refused".to_string()));
        }
        Ok(state.values.clone())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, RegistryError> {
        Ok(self.lock().units.clone())
    }

    async fn list_input_types(&self) -> Result<Vec<InputType>, RegistryError> {
        Ok(self.lock().input_types.clone())
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(self.lock().criteria.clone())
    }

    async fn criteria_missing_from_match_form(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(self.lock().criteria.clone())
    }

    async fn adjudication_studies(&self) -> Result<Vec<StudyVersionAdjudication>, RegistryError> {
        Ok(self.lock().studies.clone())
    }
}

/// Service wired to a fixture registry with the trial's rows selected.
pub(super) async fn loaded_service() -> (Arc<AdjudicationService<MemoryRegistry>>, MemoryRegistry) {
    let registry = MemoryRegistry::with_fixtures();
    let service = Arc::new(AdjudicationService::new(Arc::new(registry.clone())));
    service.load().await.expect("fixture load succeeds");
    service
        .select_study(TRIAL_EBC_ID)
        .await
        .expect("fixture study loads");
    (service, registry)
}
