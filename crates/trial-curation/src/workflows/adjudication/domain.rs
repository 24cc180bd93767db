use serde::{Deserialize, Serialize};

/// Comparison operators used by criteria values and matching rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    In,
}

impl ComparisonOperator {
    /// Programmer-style symbol used on value-attachment option labels.
    pub const fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::In => "in",
        }
    }
}

/// An atomic permissible value. Shared across criteria; identity is `id`,
/// with `0` meaning "not yet persisted".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaValue {
    pub id: i64,
    pub value_string: Option<String>,
    pub description: Option<String>,
    pub is_numeric: bool,
    pub active: bool,
    pub operator: Option<ComparisonOperator>,
    pub unit_id: i64,
    pub unit_name: Option<String>,
}

impl CriteriaValue {
    /// Draft for a free-text list option typed by a curator.
    pub fn free_text(label: &str) -> Self {
        Self {
            id: 0,
            value_string: Some(label.to_string()),
            description: Some(label.to_string()),
            is_numeric: false,
            active: true,
            operator: Some(ComparisonOperator::Eq),
            unit_id: 1,
            unit_name: Some("none".to_string()),
        }
    }

    /// Draft for a numeric bound entered on the value-attachment form.
    pub fn numeric(operator: ComparisonOperator, value_string: &str, unit: &Unit) -> Self {
        Self {
            id: 0,
            value_string: Some(value_string.to_string()),
            description: Some(format!("{} {} {}", operator.symbol(), value_string, unit.name)),
            is_numeric: true,
            active: true,
            operator: Some(operator),
            unit_id: unit.id,
            unit_name: Some(unit.name.clone()),
        }
    }
}

/// A measurement unit for numeric values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
}

/// How a match-form field captures its answer. `data_type` is free-form on
/// the wire (`Integer`, `list`, `percentage`, ...); only `list` carries a
/// multi-value selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputType {
    pub id: i64,
    pub data_type: String,
    pub render_type: String,
}

impl InputType {
    pub fn is_list(&self) -> bool {
        self.data_type == "list"
    }
}

/// A published, reusable eligibility criterion. `code` is globally unique;
/// the registry signals a conflict when a publish would collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: i64,
    pub code: String,
    pub description: String,
    pub display_name: String,
    pub input_type_id: i64,
    pub values: Vec<CriteriaValue>,
}

/// Workflow position of a staging criterion. `Active` is terminal; nothing
/// un-publishes a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjudicationStatus {
    New,
    InProcess,
    Existing,
    Active,
}

impl AdjudicationStatus {
    pub const ORDER: [AdjudicationStatus; 4] = [
        AdjudicationStatus::New,
        AdjudicationStatus::InProcess,
        AdjudicationStatus::Existing,
        AdjudicationStatus::Active,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AdjudicationStatus::New => "NEW",
            AdjudicationStatus::InProcess => "IN_PROCESS",
            AdjudicationStatus::Existing => "EXISTING",
            AdjudicationStatus::Active => "ACTIVE",
        }
    }
}

/// A machine-suggested criterion awaiting human adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionStaging {
    pub id: i64,
    pub code: String,
    pub description: String,
    pub display_name: String,
    pub text: String,
    pub input_id: i64,
    pub input_type_id: i64,
    /// Criteria set of the owning trial.
    pub eligibility_criteria_id: i64,
    /// Link to the matched canonical criterion, set on accept.
    pub criterion_id: Option<i64>,
    pub criterion_adjudication_status: AdjudicationStatus,
    pub echc_adjudication_status: AdjudicationStatus,
    pub echc_value_ids: Option<Vec<i64>>,
}

impl CriterionStaging {
    /// The status the curator sees. A persisted `ACTIVE` always wins;
    /// otherwise a code collision with the canonical catalog forces
    /// `EXISTING`. Derived from the current snapshot on every call, never
    /// cached.
    pub fn effective_status(&self, catalog: &[Criterion]) -> AdjudicationStatus {
        if self.criterion_adjudication_status == AdjudicationStatus::Active {
            return AdjudicationStatus::Active;
        }
        if catalog.iter().any(|c| c.code == self.code) {
            return AdjudicationStatus::Existing;
        }
        self.criterion_adjudication_status
    }

    /// The canonical criterion this staging record collides with, if any.
    pub fn canonical_match<'a>(&self, catalog: &'a [Criterion]) -> Option<&'a Criterion> {
        catalog.iter().find(|c| c.code == self.code)
    }
}

/// Staging record as sent to and returned by the registry's save/update
/// endpoints: the scalar fields plus attached value ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionStagingWithValues {
    #[serde(flatten)]
    pub staging: CriterionStaging,
    pub criterion_value_ids: Vec<i64>,
}

/// Staging record as listed for display: attached values resolved to full
/// objects instead of bare ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionStagingWithValueList {
    #[serde(flatten)]
    pub staging: CriterionStaging,
    pub criterion_value_list: Option<Vec<CriteriaValue>>,
}

impl CriterionStagingWithValueList {
    pub fn selected_value_ids(&self) -> Vec<i64> {
        self.criterion_value_list
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|value| value.id)
            .collect()
    }
}

/// Payload promoting a staging criterion into the canonical catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionStagingPublish {
    pub code: String,
    pub display_name: String,
    pub description: String,
    pub active: bool,
    pub input_type_id: i64,
    pub criterion_staging_id: i64,
    pub values: Vec<i64>,
}

/// Payload publishing the value attachment of a trial-criterion link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingValueAttachment {
    pub criterion_id: Option<i64>,
    pub eligibility_criteria_id: i64,
    pub criterion_staging_id: i64,
    pub active: bool,
    pub value_ids: Vec<i64>,
}

/// One study version offered on the adjudication study selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyVersionAdjudication {
    pub id: i64,
    pub study_id: i64,
    pub study_version_num: i64,
    pub active: bool,
    pub eligibility_criteria_id: i64,
    pub study: Study,
}

/// Trial identity shown on selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    pub code: String,
    pub name: String,
}
