use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use super::attachment::{AttachmentError, ValueAttachment, ValueOption};
use super::domain::{
    AdjudicationStatus, ComparisonOperator, CriteriaValue, Criterion, InputType,
    StudyVersionAdjudication, Unit,
};
use super::engine::{AdjudicationError, CriterionRow, RowEdit};
use super::registry::{CriteriaRegistry, RegistryError};
use super::status::RequestState;

/// Errors surfaced by the adjudication page controller. Everything except
/// `Load` is local to one row; `Load` is the only fatal-for-the-page case.
#[derive(Debug, thiserror::Error)]
pub enum CurationServiceError {
    #[error("staging criterion {0} is not loaded")]
    RowNotFound(i64),
    #[error("unit {0} is not known")]
    UnknownUnit(i64),
    #[error("initial data load failed: {0}")]
    Load(#[source] RegistryError),
    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Row projection rendered to the curator. Display fields come from the
/// matched canonical criterion while the row resolves to EXISTING.
#[derive(Debug, Clone, Serialize)]
pub struct AdjudicationRowView {
    pub id: i64,
    pub status: AdjudicationStatus,
    pub code: String,
    pub text: String,
    pub display_name: String,
    pub description: String,
    pub input_type_id: i64,
    pub is_list: bool,
    pub can_publish: bool,
    pub actions: &'static [&'static str],
    pub request: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub values: Vec<ValueOption>,
}

/// One collapsible status group on the adjudication page.
#[derive(Debug, Clone, Serialize)]
pub struct StatusGroup {
    pub status: AdjudicationStatus,
    pub count: usize,
    pub rows: Vec<AdjudicationRowView>,
}

/// The grouped-by-status page view, statuses in fixed order, rows by id.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedAdjudication {
    pub eligibility_criteria_id: Option<i64>,
    pub groups: Vec<StatusGroup>,
}

/// Value-attachment projection for one row.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentView {
    pub id: i64,
    pub published: bool,
    pub attached_value_ids: Vec<i64>,
    pub options: Vec<ValueOption>,
    pub save_request: RequestState,
    pub add_request: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Page controller for the adjudication surface.
///
/// Owns the shared lookup collections (single source of truth) and one
/// engine per staging criterion behind its own mutex, so sibling rows never
/// serialize behind each other and errors stay row-local. Children never
/// mutate the shared collections; designated flows append through the
/// service.
pub struct AdjudicationService<R> {
    registry: Arc<R>,
    studies: RwLock<Vec<StudyVersionAdjudication>>,
    catalog: RwLock<Vec<Criterion>>,
    lookup_values: RwLock<Vec<CriteriaValue>>,
    numeric_values: RwLock<Vec<CriteriaValue>>,
    units: RwLock<Vec<Unit>>,
    input_types: RwLock<Vec<InputType>>,
    selected_study: RwLock<Option<i64>>,
    rows: RwLock<BTreeMap<i64, Arc<Mutex<CriterionRow>>>>,
    attachments: RwLock<BTreeMap<i64, Arc<Mutex<ValueAttachment>>>>,
}

impl<R> AdjudicationService<R>
where
    R: CriteriaRegistry + 'static,
{
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            studies: RwLock::new(Vec::new()),
            catalog: RwLock::new(Vec::new()),
            lookup_values: RwLock::new(Vec::new()),
            numeric_values: RwLock::new(Vec::new()),
            units: RwLock::new(Vec::new()),
            input_types: RwLock::new(Vec::new()),
            selected_study: RwLock::new(None),
            rows: RwLock::new(BTreeMap::new()),
            attachments: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bulk-load every lookup list the page depends on. Any failure is
    /// fatal for the page: nothing is partially applied and the caller
    /// offers a retry instead of rendering partial content.
    pub async fn load(&self) -> Result<(), CurationServiceError> {
        let (studies, values, units, input_types, catalog) = tokio::try_join!(
            self.registry.adjudication_studies(),
            self.registry.list_values(),
            self.registry.list_units(),
            self.registry.list_input_types(),
            self.registry.list_criteria(),
        )
        .map_err(CurationServiceError::Load)?;

        let (numeric, free_text): (Vec<_>, Vec<_>) =
            values.into_iter().partition(|value| value.is_numeric);
        // Only unit-less free-text values are offered on list selectors.
        let lookup = free_text
            .into_iter()
            .filter(|value| value.unit_id == 1)
            .collect();

        info!(
            studies = studies.len(),
            criteria = catalog.len(),
            "lookup collections loaded"
        );

        *self.studies.write().expect("studies lock poisoned") = studies;
        *self.lookup_values.write().expect("values lock poisoned") = lookup;
        *self.numeric_values.write().expect("values lock poisoned") = numeric;
        *self.units.write().expect("units lock poisoned") = units;
        *self.input_types.write().expect("input types lock poisoned") = input_types;
        *self.catalog.write().expect("catalog lock poisoned") = catalog;
        Ok(())
    }

    pub fn studies(&self) -> Vec<StudyVersionAdjudication> {
        self.studies.read().expect("studies lock poisoned").clone()
    }

    /// Load the staging criteria of one trial and rebuild the per-row
    /// engines. On failure the current rows are cleared rather than left
    /// stale.
    pub async fn select_study(
        &self,
        eligibility_criteria_id: i64,
    ) -> Result<GroupedAdjudication, CurationServiceError> {
        match self.registry.staging_for_trial(eligibility_criteria_id).await {
            Ok(staging) => {
                info!(
                    eligibility_criteria_id,
                    rows = staging.len(),
                    "staging criteria loaded"
                );
                let mut rows = BTreeMap::new();
                let mut attachments = BTreeMap::new();
                for record in staging {
                    let id = record.staging.id;
                    attachments.insert(id, Arc::new(Mutex::new(ValueAttachment::new(record.clone()))));
                    rows.insert(id, Arc::new(Mutex::new(CriterionRow::new(record))));
                }
                *self.rows.write().expect("rows lock poisoned") = rows;
                *self.attachments.write().expect("rows lock poisoned") = attachments;
                *self.selected_study.write().expect("study lock poisoned") =
                    Some(eligibility_criteria_id);
                Ok(self.grouped().await)
            }
            Err(err) => {
                self.rows.write().expect("rows lock poisoned").clear();
                self.attachments.write().expect("rows lock poisoned").clear();
                *self.selected_study.write().expect("study lock poisoned") = None;
                Err(err.into())
            }
        }
    }

    /// The grouped-by-status view, recomputed from the live rows and the
    /// current catalog snapshot.
    pub async fn grouped(&self) -> GroupedAdjudication {
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();
        let handles: Vec<Arc<Mutex<CriterionRow>>> = self
            .rows
            .read()
            .expect("rows lock poisoned")
            .values()
            .cloned()
            .collect();

        let mut grouped: BTreeMap<AdjudicationStatus, Vec<AdjudicationRowView>> = BTreeMap::new();
        for handle in handles {
            let row = handle.lock().await;
            let view = row_view(&row, &catalog, &input_types);
            grouped.entry(view.status).or_default().push(view);
        }

        let groups = AdjudicationStatus::ORDER
            .into_iter()
            .map(|status| {
                let rows = grouped.remove(&status).unwrap_or_default();
                StatusGroup {
                    status,
                    count: rows.len(),
                    rows,
                }
            })
            .collect();

        GroupedAdjudication {
            eligibility_criteria_id: *self.selected_study.read().expect("study lock poisoned"),
            groups,
        }
    }

    pub async fn edit(
        &self,
        id: i64,
        edit: RowEdit,
    ) -> Result<AdjudicationRowView, CurationServiceError> {
        let handle = self.row(id)?;
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();
        let lookup = self.lookup_snapshot();

        let mut row = handle.lock().await;
        row.apply_edit(edit, &catalog, &input_types, &lookup)?;
        Ok(row_view(&row, &catalog, &input_types))
    }

    pub async fn save(&self, id: i64) -> Result<AdjudicationRowView, CurationServiceError> {
        let handle = self.row(id)?;
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();
        let lookup = self.lookup_snapshot();

        let mut row = handle.lock().await;
        row.save(self.registry.as_ref(), &catalog, &lookup).await?;
        Ok(row_view(&row, &catalog, &input_types))
    }

    pub async fn publish(
        &self,
        id: i64,
        confirmed: bool,
    ) -> Result<AdjudicationRowView, CurationServiceError> {
        let handle = self.row(id)?;
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();

        let mut row = handle.lock().await;
        row.publish(self.registry.as_ref(), &catalog, confirmed)
            .await?;
        Ok(row_view(&row, &catalog, &input_types))
    }

    pub async fn accept(
        &self,
        id: i64,
        confirmed: bool,
    ) -> Result<AdjudicationRowView, CurationServiceError> {
        let handle = self.row(id)?;
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();

        let mut row = handle.lock().await;
        row.accept(self.registry.as_ref(), &catalog, confirmed)
            .await?;
        Ok(row_view(&row, &catalog, &input_types))
    }

    /// Create a free-text option for a list-typed row. The created value is
    /// appended to the shared lookup collection, where sibling rows see it.
    pub async fn create_option(
        &self,
        id: i64,
        label: &str,
    ) -> Result<AdjudicationRowView, CurationServiceError> {
        let handle = self.row(id)?;
        let catalog = self.catalog_snapshot();
        let input_types = self.input_types_snapshot();

        let mut row = handle.lock().await;
        let created = row
            .create_option(self.registry.as_ref(), &catalog, &input_types, label)
            .await?;
        if let Some(value) = created {
            self.lookup_values
                .write()
                .expect("values lock poisoned")
                .push(value);
        }
        Ok(row_view(&row, &catalog, &input_types))
    }

    pub async fn attachment_view(&self, id: i64) -> Result<AttachmentView, CurationServiceError> {
        let handle = self.attachment(id)?;
        let attachment = handle.lock().await;
        Ok(self.build_attachment_view(&attachment))
    }

    pub async fn attachment_set(
        &self,
        id: i64,
        value_ids: Vec<i64>,
    ) -> Result<AttachmentView, CurationServiceError> {
        let handle = self.attachment(id)?;
        let mut attachment = handle.lock().await;
        attachment.set_attached(value_ids)?;
        Ok(self.build_attachment_view(&attachment))
    }

    pub async fn attachment_save(&self, id: i64) -> Result<AttachmentView, CurationServiceError> {
        let handle = self.attachment(id)?;
        let mut attachment = handle.lock().await;
        attachment.save(self.registry.as_ref()).await?;
        Ok(self.build_attachment_view(&attachment))
    }

    pub async fn attachment_publish(
        &self,
        id: i64,
        confirmed: bool,
    ) -> Result<AttachmentView, CurationServiceError> {
        let handle = self.attachment(id)?;
        let mut attachment = handle.lock().await;
        attachment.publish(self.registry.as_ref(), confirmed).await?;
        Ok(self.build_attachment_view(&attachment))
    }

    /// Create a numeric bound and append it to the shared numeric-value
    /// collection.
    pub async fn attachment_add_value(
        &self,
        id: i64,
        operator: ComparisonOperator,
        value_string: &str,
        unit_id: i64,
    ) -> Result<AttachmentView, CurationServiceError> {
        let unit = self
            .units
            .read()
            .expect("units lock poisoned")
            .iter()
            .find(|unit| unit.id == unit_id)
            .cloned()
            .ok_or(CurationServiceError::UnknownUnit(unit_id))?;

        let handle = self.attachment(id)?;
        let mut attachment = handle.lock().await;
        let value = attachment
            .add_numeric_value(self.registry.as_ref(), operator, value_string, &unit)
            .await?;
        self.numeric_values
            .write()
            .expect("values lock poisoned")
            .push(value);
        Ok(self.build_attachment_view(&attachment))
    }

    /// Canonical criteria not yet placed on the match form.
    pub async fn unassigned_criteria(&self) -> Result<Vec<Criterion>, CurationServiceError> {
        Ok(self.registry.criteria_missing_from_match_form().await?)
    }

    pub fn lookup_values(&self) -> Vec<CriteriaValue> {
        self.lookup_snapshot()
    }

    fn row(&self, id: i64) -> Result<Arc<Mutex<CriterionRow>>, CurationServiceError> {
        self.rows
            .read()
            .expect("rows lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(CurationServiceError::RowNotFound(id))
    }

    fn attachment(&self, id: i64) -> Result<Arc<Mutex<ValueAttachment>>, CurationServiceError> {
        self.attachments
            .read()
            .expect("rows lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(CurationServiceError::RowNotFound(id))
    }

    fn build_attachment_view(&self, attachment: &ValueAttachment) -> AttachmentView {
        let input_types = self.input_types_snapshot();
        let numeric = self
            .numeric_values
            .read()
            .expect("values lock poisoned")
            .clone();
        let units = self.units.read().expect("units lock poisoned").clone();
        AttachmentView {
            id: attachment.staging().staging.id,
            published: attachment.is_published(),
            attached_value_ids: attachment.attached_value_ids().to_vec(),
            options: attachment.option_labels(&input_types, &numeric, &units),
            save_request: attachment.save_state(),
            add_request: attachment.add_state(),
            error: attachment.error(),
        }
    }

    fn catalog_snapshot(&self) -> Vec<Criterion> {
        self.catalog.read().expect("catalog lock poisoned").clone()
    }

    fn input_types_snapshot(&self) -> Vec<InputType> {
        self.input_types
            .read()
            .expect("input types lock poisoned")
            .clone()
    }

    fn lookup_snapshot(&self) -> Vec<CriteriaValue> {
        self.lookup_values
            .read()
            .expect("values lock poisoned")
            .clone()
    }
}

fn row_view(
    row: &CriterionRow,
    catalog: &[Criterion],
    input_types: &[InputType],
) -> AdjudicationRowView {
    let status = row.effective_status(catalog);
    let record = row.record();
    let canonical = (status == AdjudicationStatus::Existing)
        .then(|| record.staging.canonical_match(catalog))
        .flatten();

    let values = match canonical {
        Some(canonical) => canonical.values.as_slice(),
        None => record.criterion_value_list.as_deref().unwrap_or_default(),
    };

    AdjudicationRowView {
        id: record.staging.id,
        status,
        code: canonical
            .map(|c| c.code.clone())
            .unwrap_or_else(|| record.staging.code.clone()),
        text: record.staging.text.clone(),
        display_name: canonical
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| record.staging.display_name.clone()),
        description: canonical
            .map(|c| c.description.clone())
            .unwrap_or_else(|| record.staging.description.clone()),
        input_type_id: row.effective_input_type_id(catalog),
        is_list: row.is_list(catalog, input_types),
        can_publish: row.can_publish(),
        actions: row.offered_actions(catalog),
        request: row.request_state(),
        error: row.request_error(),
        values: values
            .iter()
            .map(|value| ValueOption {
                id: value.id,
                label: value.value_string.clone().unwrap_or_default(),
            })
            .collect(),
    }
}
