use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use trial_curation::workflows::adjudication::{
    adjudication_router, AdjudicationService, AdjudicationStatus, ComparisonOperator,
    CriteriaRegistry, CriteriaValue, Criterion, CriterionStaging, CriterionStagingPublish,
    CriterionStagingWithValueList, CriterionStagingWithValues, InputType, RegistryError,
    StagingValueAttachment, Study, StudyVersionAdjudication, Unit,
};

const TRIAL: i64 = 7;

#[derive(Default)]
struct State {
    staging: HashMap<i64, CriterionStagingWithValues>,
    criteria: Vec<Criterion>,
    values: Vec<CriteriaValue>,
    next_value_id: i64,
}

#[derive(Clone, Default)]
struct StubRegistry {
    state: Arc<Mutex<State>>,
}

impl StubRegistry {
    fn seeded() -> Self {
        let registry = Self::default();
        {
            let mut state = registry.state.lock().expect("state mutex poisoned");
            state.next_value_id = 500;
            state.values = vec![value(10, "Relapsed"), value(11, "Refractory")];
            state.criteria = vec![Criterion {
                id: 50,
                code: "ECOG_STATUS".to_string(),
                description: "ECOG performance status".to_string(),
                display_name: "ECOG Status".to_string(),
                input_type_id: 2,
                values: Vec::new(),
            }];
            for (id, code) in [(101, "HGB_LEVEL"), (102, "ECOG_STATUS")] {
                state.staging.insert(id, staging(id, code));
            }
        }
        registry
    }
}

fn value(id: i64, label: &str) -> CriteriaValue {
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

fn staging(id: i64, code: &str) -> CriterionStagingWithValues {
    CriterionStagingWithValues {
        staging: CriterionStaging {
            id,
            code: code.to_string(),
            description: format!("{code} from the trial document"),
            display_name: code.to_string(),
            text: "patients must have adequate organ function".to_string(),
            input_id: 1,
            input_type_id: 1,
            eligibility_criteria_id: TRIAL,
            criterion_id: None,
            criterion_adjudication_status: AdjudicationStatus::New,
            echc_adjudication_status: AdjudicationStatus::New,
            echc_value_ids: None,
        },
        criterion_value_ids: Vec::new(),
    }
}

#[async_trait]
impl CriteriaRegistry for StubRegistry {
    async fn staging_for_trial(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<Vec<CriterionStagingWithValueList>, RegistryError> {
        let state = self.state.lock().expect("state mutex poisoned");
        let mut records: Vec<_> = state
            .staging
            .values()
            .filter(|r| r.staging.eligibility_criteria_id == eligibility_criteria_id)
            .map(|r| CriterionStagingWithValueList {
                staging: r.staging.clone(),
                criterion_value_list: Some(Vec::new()),
            })
            .collect();
        records.sort_by_key(|r| r.staging.id);
        Ok(records)
    }

    async fn save_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
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
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.criteria.iter().any(|c| c.code == publish.code) {
            return Err(RegistryError::Conflict);
        }
        if let Some(record) = state.staging.get_mut(&publish.criterion_staging_id) {
            record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        }
        Ok(publish.code.clone())
    }

    async fn accept_staging(&self, id: i64) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        let record = state.staging.get_mut(&id).ok_or(RegistryError::NotFound)?;
        record.staging.criterion_adjudication_status = AdjudicationStatus::Active;
        Ok(record.clone())
    }

    async fn update_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        state.staging.insert(staging.staging.id, staging.clone());
        Ok(staging.clone())
    }

    async fn publish_value_attachment(
        &self,
        _attachment: &StagingValueAttachment,
    ) -> Result<String, RegistryError> {
        Ok("published".to_string())
    }

    async fn create_value(&self, value: &CriteriaValue) -> Result<CriteriaValue, RegistryError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        let mut created = value.clone();
        created.id = state.next_value_id;
        state.next_value_id += 1;
        state.values.push(created.clone());
        Ok(created)
    }

    async fn list_values(&self) -> Result<Vec<CriteriaValue>, RegistryError> {
        Ok(self.state.lock().expect("state mutex poisoned").values.clone())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, RegistryError> {
        Ok(vec![Unit {
            id: 1,
            name: "none".to_string(),
        }])
    }

    async fn list_input_types(&self) -> Result<Vec<InputType>, RegistryError> {
        Ok(vec![
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
        ])
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(self.state.lock().expect("state mutex poisoned").criteria.clone())
    }

    async fn criteria_missing_from_match_form(&self) -> Result<Vec<Criterion>, RegistryError> {
        Ok(Vec::new())
    }

    async fn adjudication_studies(&self) -> Result<Vec<StudyVersionAdjudication>, RegistryError> {
        Ok(vec![StudyVersionAdjudication {
            id: 1,
            study_id: 3,
            study_version_num: 1,
            active: true,
            eligibility_criteria_id: TRIAL,
            study: Study {
                id: 3,
                code: "NCT-0042".to_string(),
                name: "Relapsed AML".to_string(),
            },
        }])
    }
}

async fn router() -> axum::Router {
    let service = Arc::new(AdjudicationService::new(Arc::new(StubRegistry::seeded())));
    let app = adjudication_router(service);

    let response = send(app.clone(), "POST", "/api/v1/adjudication/load", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(
        app.clone(),
        "POST",
        &format!("/api/v1/adjudication/studies/{TRIAL}/select"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    app
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds"),
    };
    app.oneshot(request).await.expect("request is handled")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn save_then_publish_promotes_a_new_criterion() {
    let app = router().await;

    let response = send(app.clone(), "POST", "/api/v1/adjudication/criteria/101/save", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "IN_PROCESS");
    assert_eq!(body["can_publish"], true);

    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/101/publish",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["actions"], json!([]));
}

#[tokio::test]
async fn unconfirmed_irreversible_transitions_are_refused() {
    let app = router().await;

    send(app.clone(), "POST", "/api/v1/adjudication/criteria/101/save", None).await;
    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/101/publish",
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error text")
        .contains("confirmation"));
}

#[tokio::test]
async fn a_code_collision_renders_existing_and_accepts() {
    let app = router().await;

    let response = send(app.clone(), "GET", "/api/v1/adjudication/criteria", None).await;
    let body = read_json_body(response).await;
    let existing = body["groups"]
        .as_array()
        .expect("groups array")
        .iter()
        .find(|group| group["status"] == "EXISTING")
        .expect("existing group")
        .clone();
    assert_eq!(existing["count"], 1);
    assert_eq!(existing["rows"][0]["id"], 102);
    assert_eq!(existing["rows"][0]["actions"], json!(["accept"]));

    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/102/accept",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["code"], "ECOG_STATUS");
}

#[tokio::test]
async fn editing_then_saving_keeps_errors_row_local() {
    let app = router().await;

    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/999/save",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/101/edit",
        Some(json!({ "field": "display_name", "value": "Hemoglobin level" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["display_name"], "Hemoglobin level");
    assert_eq!(body["can_publish"], false);
}

#[tokio::test]
async fn free_text_values_are_created_through_the_row() {
    let app = router().await;

    let response = send(
        app.clone(),
        "POST",
        "/api/v1/adjudication/criteria/101/values",
        Some(json!({ "label": "Remission" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let created = body["values"]
        .as_array()
        .expect("values array")
        .iter()
        .find(|option| option["label"] == "Remission")
        .expect("created option present");
    assert_ne!(created["id"], 0);
}

#[tokio::test]
async fn studies_are_listed_for_the_selector() {
    let app = router().await;

    let response = send(app.clone(), "GET", "/api/v1/adjudication/studies", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["study"]["code"], "NCT-0042");
    assert_eq!(body[0]["eligibility_criteria_id"], TRIAL);
}
