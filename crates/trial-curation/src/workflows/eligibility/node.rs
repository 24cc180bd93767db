use serde_json::Value;

/// Shape of one node in the raw rule payload, sniffed once at the boundary so
/// the walker can dispatch structurally instead of probing properties inline.
pub(crate) enum RuleShape<'a> {
    /// `{ operator: AND|OR, criteria: [...] }`
    Group { any: bool, criteria: &'a [Value] },
    /// `{ fieldName, operator, fieldValue, fieldValueLabel?, isMatched? }`
    Leaf(LeafRule<'a>),
    /// Unrecognized object or array; its nested values are walked defensively.
    Unknown,
    /// Null or scalar, nothing to extract.
    Skip,
}

pub(crate) struct LeafRule<'a> {
    pub(crate) field_name: &'a str,
    pub(crate) operator: Option<&'a str>,
    pub(crate) value: Option<&'a Value>,
    pub(crate) label: Option<&'a Value>,
    pub(crate) matched: Option<bool>,
}

pub(crate) fn sniff(node: &Value) -> RuleShape<'_> {
    match node {
        Value::Object(map) => {
            // A node carrying both shapes counts as a group; the `criteria`
            // array wins, same as the upstream payload contract.
            if let Some(Value::Array(criteria)) = map.get("criteria") {
                let any = map
                    .get("operator")
                    .and_then(Value::as_str)
                    .map(|op| op.to_ascii_uppercase().contains("OR"))
                    .unwrap_or(false);
                return RuleShape::Group { any, criteria };
            }
            if let Some(Value::String(name)) = map.get("fieldName") {
                if !name.is_empty() {
                    return RuleShape::Leaf(LeafRule {
                        field_name: name,
                        operator: map.get("operator").and_then(Value::as_str),
                        value: map.get("fieldValue"),
                        label: map.get("fieldValueLabel"),
                        matched: map.get("isMatched").and_then(Value::as_bool),
                    });
                }
            }
            RuleShape::Unknown
        }
        Value::Array(_) => RuleShape::Unknown,
        _ => RuleShape::Skip,
    }
}

/// Nested values of an unrecognized node: object property values or array
/// elements. Scalars have none.
pub(crate) fn nested_values(node: &Value) -> Vec<&Value> {
    match node {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}
