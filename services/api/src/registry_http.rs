//! HTTP client for the external criteria registry.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trial_curation::config::RegistryConfig;
use trial_curation::workflows::adjudication::{
    CriteriaRegistry, CriteriaValue, Criterion, CriterionStagingPublish,
    CriterionStagingWithValueList, CriterionStagingWithValues, InputType, RegistryError,
    StagingValueAttachment, StudyVersionAdjudication, Unit,
};

/// List endpoints wrap their payload in `{"results": [...]}`.
#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    results: Vec<T>,
}

/// Error bodies may carry a human-readable `message`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Registry client speaking JSON over HTTP with optional bearer auth.
pub(crate) struct HttpCriteriaRegistry {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCriteriaRegistry {
    /// `base_url` is used without a trailing slash, e.g.
    /// `http://registry.internal:8000`.
    pub(crate) fn new(config: &RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "registry request");
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RegistryError> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(transport)?;
        parse(response).await
    }

    async fn get_results<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, RegistryError> {
        let envelope: ResultsEnvelope<T> = self.get_json(path).await?;
        Ok(envelope.results)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RegistryError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        parse(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, RegistryError> {
        let response = self
            .request(Method::POST, path)
            .send()
            .await
            .map_err(transport)?;
        parse(response).await
    }
}

fn transport(err: reqwest::Error) -> RegistryError {
    RegistryError::Transport(err.to_string())
}

/// Map a response onto the registry error taxonomy: 409 is a conflict, 404 a
/// missing resource, any other non-2xx a rejection carrying the body's
/// `message` when present.
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|err| RegistryError::Rejected(format!("malformed registry response: {err}")));
    }

    match status {
        StatusCode::CONFLICT => Err(RegistryError::Conflict),
        StatusCode::NOT_FOUND => Err(RegistryError::NotFound),
        _ => {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("registry returned {status}"));
            Err(RegistryError::Rejected(message))
        }
    }
}

#[async_trait]
impl CriteriaRegistry for HttpCriteriaRegistry {
    async fn staging_for_trial(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<Vec<CriterionStagingWithValueList>, RegistryError> {
        self.get_json(&format!("/criterion-staging/{eligibility_criteria_id}"))
            .await
    }

    async fn save_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        self.post_json("/save-criterion-staging", staging).await
    }

    async fn publish_criterion(
        &self,
        publish: &CriterionStagingPublish,
    ) -> Result<String, RegistryError> {
        self.post_json("/criterion-staging-publish-criterion", publish)
            .await
    }

    async fn accept_staging(&self, id: i64) -> Result<CriterionStagingWithValues, RegistryError> {
        self.post_empty(&format!("/accept-criterion-staging/{id}"))
            .await
    }

    async fn update_staging(
        &self,
        staging: &CriterionStagingWithValues,
    ) -> Result<CriterionStagingWithValues, RegistryError> {
        self.post_json("/update-criterion-staging", staging).await
    }

    async fn publish_value_attachment(
        &self,
        attachment: &StagingValueAttachment,
    ) -> Result<String, RegistryError> {
        self.post_json("/publish-el-criteria-has-criterion", attachment)
            .await
    }

    async fn create_value(&self, value: &CriteriaValue) -> Result<CriteriaValue, RegistryError> {
        self.post_json("/value", value).await
    }

    async fn list_values(&self) -> Result<Vec<CriteriaValue>, RegistryError> {
        self.get_results("/values").await
    }

    async fn list_units(&self) -> Result<Vec<Unit>, RegistryError> {
        self.get_results("/units").await
    }

    async fn list_input_types(&self) -> Result<Vec<InputType>, RegistryError> {
        self.get_results("/input-types").await
    }

    async fn list_criteria(&self) -> Result<Vec<Criterion>, RegistryError> {
        self.get_results("/criteria").await
    }

    async fn criteria_missing_from_match_form(&self) -> Result<Vec<Criterion>, RegistryError> {
        self.get_results("/criteria-not-exist-in-match-form").await
    }

    async fn adjudication_studies(&self) -> Result<Vec<StudyVersionAdjudication>, RegistryError> {
        self.get_json("/study-versions-adjudication").await
    }
}
