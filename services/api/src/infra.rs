use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use trial_curation::workflows::adjudication::{
    AdjudicationStatus, ComparisonOperator, CriteriaRegistry, CriteriaValue, Criterion,
    CriterionStaging, CriterionStagingPublish, CriterionStagingWithValueList,
    CriterionStagingWithValues, InputType, RegistryError, StagingValueAttachment, Study,
    StudyVersionAdjudication, Unit,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct RegistryData {
    staging: HashMap<i64, CriterionStagingWithValues>,
    criteria: Vec<Criterion>,
    values: Vec<CriteriaValue>,
    units: Vec<Unit>,
    input_types: Vec<InputType>,
    studies: Vec<StudyVersionAdjudication>,
    next_id: i64,
}

/// Registry double backing the CLI demo and route tests: everything lives in
/// one mutex-guarded map, with ids handed out server-side like the real
/// registry does.
#[derive(Clone, Default)]
pub(crate) struct InMemoryCriteriaRegistry {
    data: Arc<Mutex<RegistryData>>,
}

impl InMemoryCriteriaRegistry {
    pub(crate) fn seeded() -> Self {
        let registry = Self::default();
        {
            let mut data = registry.data.lock().expect("registry mutex poisoned");
            data.next_id = 1000;
            data.units = vec![
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
            ];
            data.input_types = vec![
                InputType {
                    id: 1,
                    data_type: "list".to_string(),
                    render_type: "select".to_string(),
                },
                InputType {
                    id: 2,
                    data_type: "Integer".to_string(),
                    render_type: "number".to_string(),
                },
            ];
            data.values = vec![
                free_text_value(10, "Relapsed"),
                free_text_value(11, "Refractory"),
                free_text_value(12, "Newly diagnosed"),
            ];
            data.criteria = vec![Criterion {
                id: 50,
                code: "ECOG_STATUS".to_string(),
                description: "ECOG performance status at enrollment".to_string(),
                display_name: "ECOG Status".to_string(),
                input_type_id: 2,
                values: Vec::new(),
            }];
            data.studies = vec![StudyVersionAdjudication {
                id: 1,
                study_id: 3,
                study_version_num: 2,
                active: true,
                eligibility_criteria_id: 7,
                study: Study {
                    id: 3,
                    code: "NCT-0042".to_string(),
                    name: "Relapsed/Refractory AML".to_string(),
                },
            }];
            for record in [
                seed_staging(101, "DISEASE_STATUS", 1, "disease status at enrollment"),
                seed_staging(102, "ECOG_STATUS", 2, "ECOG performance status 0-2"),
                seed_staging(103, "HGB_LEVEL", 2, "hemoglobin of at least 9 g/dL"),
            ] {
                data.staging.insert(record.staging.id, record);
            }
        }
        registry
    }
}

fn free_text_value(id: i64, label: &str) -> CriteriaValue {
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

fn seed_staging(id: i64, code: &str, input_type_id: i64, text: &str) -> CriterionStagingWithValues {
    CriterionStagingWithValues {
        staging: CriterionStaging {
            id,
            code: code.to_string(),
            description: text.to_string(),
            display_name: code.replace('_', " ").to_lowercase(),
            text: text.to_string(),
            input_id: 1,
            input_type_id,
            eligibility_criteria_id: 7,
            criterion_id: None,
            criterion_adjudication_status: AdjudicationStatus::New,
            echc_adjudication_status: AdjudicationStatus::New,
            echc_value_ids: None,
        },
        criterion_value_ids: Vec::new(),
    }
}

#[async_trait]
impl CriteriaRegistry for InMemoryCriteriaRegistry {
    async fn staging_for_trial(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<Vec<CriterionStagingWithValueList>, RegistryError> {
        let data = self.data.lock().expect("registry mutex poisoned");
        let mut records: Vec<_> = data
            .staging
            .values()
            .filter(|record| record.staging.eligibility_criteria_id == eligibility_criteria_id)
            .map(|record| CriterionStagingWithValueList {
                staging: record.staging.clone(),
                criterion_value_list: Some(
                    data.values
                        .iter()
                        .filter(|value| record.criterion_value_ids.contains(&value.id))
                        .cloned()
                        .collect(),
                ),
            })
            .collect();
        records.sort_by_key(|record| record.staging.id);
        Ok(records)
    }

    async fn save_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        if !data.staging.contains_key(&staging.staging.id) {
            return Err(RegistryError::NotFound);
        }
        let mut saved = staging.clone();
        if saved.staging.criterion_adjudication_status == AdjudicationStatus::New {
            saved.staging.criterion_adjudication_status = AdjudicationStatus::InProcess;
        }
        data.staging.insert(saved.staging.id, saved.clone());
        Ok(saved)
    }

    async fn publish_criterion(
        &self,
        publish: &CriterionStagingPublish,
    ) -> Result<String, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        if data.criteria.iter().any(|c| c.code == publish.code) {
            return Err(RegistryError::Conflict);
        }
        let id = data.next_id;
        data.next_id += 1;
        let values = data
            .values
            .iter()
            .filter(|value| publish.values.contains(&value.id))
            .cloned()
            .collect();
        data.criteria.push(Criterion {
            id,
            code: publish.code.clone(),
            description: publish.description.clone(),
            display_name: publish.display_name.clone(),
            input_type_id: publish.input_type_id,
            values,
        });
        if let Some(record) = data.staging.get_mut(&publish.criterion_staging_id) {
            record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        }
        Ok(publish.code.clone())
    }

    async fn accept_staging(&self, id: i64) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        let record = data.staging.get_mut(&id).ok_or(RegistryError::NotFound)?;
        record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        Ok(record.clone())
    }

    async fn update_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        if !data.staging.contains_key(&staging.staging.id) {
            return Err(RegistryError::NotFound);
        }
        data.staging.insert(staging.staging.id, staging.clone());
        Ok(staging.clone())
    }

    async fn publish_value_attachment(
        &self,
        attachment: &StagingValueAttachment,
    ) -> Result<String, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        if let Some(record) = data.staging.get_mut(&attachment.criterion_staging_id) {
            record.staging.echc_adjudication_status = AdjudicationStatus::Active;
            record.staging.echc_value_ids = Some(attachment.value_ids.clone());
        }
        Ok("published".to_string())
    }

    async fn create_value(&self, value: &CriteriaValue) -> Result<CriteriaValue, RegistryError> {
        let mut data = self.data.lock().expect("registry mutex poisoned");
        let duplicate = data.values.iter().any(|existing| {
            existing.value_string == value.value_string && existing.is_numeric == value.is_numeric
        });
        if duplicate {
            return Err(RegistryError::Conflict);
        }
        let mut created = value.clone();
        created.id = data.next_id;
        data.next_id += 1;
        data.values.push(created.clone());
        Ok(created)
    }

    async fn list_values(&self) -> Result<Vec<CriteriaValue>, RegistryError> {
        Ok(self.data.lock().expect("registry mutex poisoned").values.clone())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, RegistryError> {
        Ok(self.data.lock().expect("registry mutex poisoned").units.clone())
    }

    async fn list_input_types(&self) -> Result<Vec<InputType>, RegistryError> {
        Ok(self
            .data
            .lock()
            .expect("registry mutex poisoned")
            .input_types
            .clone())
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(self
            .data
            .lock()
            .expect("registry mutex poisoned")
            .criteria
            .clone())
    }

    async fn criteria_missing_from_match_form(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(self
            .data
            .lock()
            .expect("registry mutex poisoned")
            .criteria
            .clone())
    }

    async fn adjudication_studies(&self) -> Result<Vec<StudyVersionAdjudication>, RegistryError> {
        Ok(self
            .data
            .lock()
            .expect("registry mutex poisoned")
            .studies
            .clone())
    }
}
