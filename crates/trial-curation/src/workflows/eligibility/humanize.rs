use serde_json::Value;

use super::routing::FieldMatch;

/// Rendering inputs for one leaf rule: the comparison symbol, the preferred
/// display value (label when present, raw value otherwise), and the raw value
/// alone for templates that fall back to it.
pub(crate) struct LeafText<'a> {
    pub(crate) op: &'a str,
    pub(crate) v: &'a str,
    pub(crate) raw: &'a str,
}

impl LeafText<'_> {
    fn v_or_dash(&self) -> &str {
        if self.v.is_empty() {
            "\u{2014}"
        } else {
            self.v
        }
    }
}

type Template = fn(&LeafText<'_>) -> String;

/// Ordered humanization table, first match wins. Entries are appended, never
/// reordered: an earlier predicate keeps its wording when new ones arrive.
static TEMPLATES: &[(FieldMatch, Template)] = &[
    // Demographics
    (FieldMatch::Contains("current age"), |t| {
        if t.v.is_empty() {
            "Age requirement applies.".to_string()
        } else {
            format!("Age {} {} years.", t.op, t.v)
        }
    }),
    (FieldMatch::Contains("biological sex"), |t| {
        format!("Biological sex: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("cns status"), |t| {
        format!("CNS status: {}.", t.v_or_dash())
    }),
    // Disease
    (FieldMatch::Contains("current diagnosis"), |t| {
        if t.v.is_empty() {
            "Diagnosis requirement applies.".to_string()
        } else {
            format!("Diagnosis must include: {}.", t.v)
        }
    }),
    (FieldMatch::Contains("ecog"), |t| {
        if t.v.is_empty() {
            "ECOG performance status requirement applies.".to_string()
        } else {
            format!("ECOG performance status: {}.", t.v)
        }
    }),
    (FieldMatch::Contains("bclc stage"), |t| {
        if t.v.is_empty() {
            "BCLC stage requirement applies.".to_string()
        } else {
            format!("BCLC stage: {}.", t.v)
        }
    }),
    (FieldMatch::AnyOf(&["child-pugh", "child pugh"]), |t| {
        if t.v.is_empty() {
            "Child\u{2013}Pugh\u{2013}Turcotte requirement applies.".to_string()
        } else {
            format!("Child\u{2013}Pugh\u{2013}Turcotte {} {}.", t.op, t.v)
        }
    }),
    (FieldMatch::Contains("curative therapy"), |t| {
        format!("No known curative therapy: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("refractory"), |t| {
        if t.v.is_empty() {
            "Refractory disease requirement applies.".to_string()
        } else {
            format!("Refractory disease: {}.", t.v)
        }
    }),
    (FieldMatch::Contains("relapse"), |t| {
        if t.v.is_empty() {
            "Relapse requirement applies.".to_string()
        } else {
            format!("Relapse: {}.", t.v)
        }
    }),
    (FieldMatch::Contains("hiv"), |t| {
        format!("HIV infection: {}.", t.v_or_dash())
    }),
    (FieldMatch::AnyOf(&["hepatitis b", "hepatitis c"]), |t| {
        format!("Hepatitis B/C infection: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("infection"), |t| {
        format!("Active, uncontrolled infection: {}.", t.v_or_dash())
    }),
    // Treatment & Exposure
    (
        FieldMatch::Contains("hematopoietic cell transplantation"),
        |t| format!("Prior HCT exposure: {}.", t.v_or_dash()),
    ),
    (FieldMatch::Contains("transplant"), |t| {
        let detail = if t.v.is_empty() {
            format!("{} {}", t.op, t.raw)
        } else {
            t.v.to_string()
        };
        format!("{}.", format!("Transplant: {}", detail).trim_end())
    }),
    (FieldMatch::Contains("venetoclax"), |t| {
        format!("Prior venetoclax exposure: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("cyp3a"), |t| {
        format!("Exposure to strong CYP3A/3A4 inhibitors: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("radiotherapy"), |t| {
        format!("Radiotherapy: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("cytotoxic chemotherapy"), |t| {
        format!("Cytotoxic chemotherapy: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("antibody-drug conjugate"), |t| {
        format!("Antibody\u{2013}drug conjugate: {}.", t.v_or_dash())
    }),
    (FieldMatch::AnyOf(&["interleukins", "cytokines"]), |t| {
        format!("Interleukins/Interferons/Cytokines: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("growth factor"), |t| {
        format!("Growth factor exposure: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("how many days have elapsed"), |t| {
        format!("Elapsed days since last exposure: {} {}.", t.op, t.v)
    }),
    (
        FieldMatch::Contains("how much cumulative anthracycline"),
        |t| format!("Cumulative anthracycline dose {} {} mg/m\u{b2}.", t.op, t.v),
    ),
    // Organ function & labs
    (FieldMatch::Contains("cardiac function test results"), |t| {
        format!("Cardiac function: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("left ventricular function"), |t| {
        format!("Left ventricular function: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("ejection fraction"), |t| {
        format!("Ejection Fraction (EF) {} {}%.", t.op, t.v)
    }),
    (FieldMatch::Contains("shortening fraction"), |t| {
        format!("Shortening Fraction (SF) {} {}%.", t.op, t.v)
    }),
    (FieldMatch::Contains("renal function test results"), |t| {
        format!("Renal function: {}.", t.v_or_dash())
    }),
    (
        FieldMatch::Contains("calculated creatinine clearance"),
        |t| {
            format!(
                "Calculated creatinine clearance {} {} mL/min/1.73m\u{b2}.",
                t.op, t.v
            )
        },
    ),
    (FieldMatch::Contains("serum creatinine"), |t| {
        format!("Serum creatinine {} {} mg/dL.", t.op, t.v)
    }),
    (FieldMatch::Contains("liver function test results"), |t| {
        format!("Liver function: {}.", t.v_or_dash())
    }),
    (FieldMatch::Contains("direct bilirubin"), |t| {
        format!("Direct bilirubin {} {} \u{d7}ULN.", t.op, t.v)
    }),
    (FieldMatch::Contains("bilirubin (sum of conjugated"), |t| {
        format!(
            "Bilirubin (sum of conjugated + unconjugated) {} {} \u{d7}ULN (age).",
            t.op, t.v
        )
    }),
    (FieldMatch::Contains("sgot (ast)"), |t| {
        format!("SGOT (AST) {} {} \u{d7}ULN.", t.op, t.v)
    }),
    (FieldMatch::Contains("sgpt (alt)"), |t| {
        format!("SGPT (ALT) {} {} \u{d7}ULN.", t.op, t.v)
    }),
    (FieldMatch::Contains("hemoglobin"), |t| {
        format!("Hemoglobin {} {} g/dL.", t.op, t.v)
    }),
    (FieldMatch::Contains("platelet count"), |t| {
        format!("Platelet count {} {} \u{d7}10^3/\u{b5}L.", t.op, t.v)
    }),
    (
        FieldMatch::Contains("absolute neutrophil count"),
        neutrophil_count,
    ),
    (FieldMatch::Word("anc"), neutrophil_count),
    (
        FieldMatch::Contains("international normalized ratio"),
        normalized_ratio,
    ),
    (FieldMatch::Word("inr"), normalized_ratio),
    // Biomarkers
    (FieldMatch::AnyOf(&["kmt2a", "kmt2ar"]), |t| {
        format!("KMT2A rearrangement: {}.", t.v_or_dash())
    }),
    (FieldMatch::AnyOf(&["gpc3", "glypican"]), |t| {
        format!("GPC3 expression: {}.", t.v_or_dash())
    }),
];

fn neutrophil_count(t: &LeafText<'_>) -> String {
    format!(
        "Absolute neutrophil count (ANC) {} {} \u{d7}10^3/\u{b5}L.",
        t.op, t.v
    )
}

fn normalized_ratio(t: &LeafText<'_>) -> String {
    format!("International Normalized Ratio (INR) {} {}.", t.op, t.v)
}

/// Convert a raw field/operator/value triple into a readable bullet.
/// Unmapped fields fall back to `"<field> <op> <value>."`; a leaf with
/// nothing to show renders as the empty string and is dropped upstream.
pub(crate) fn humanize(
    field_name: &str,
    operator: Option<&str>,
    value: Option<&Value>,
    label: Option<&Value>,
) -> String {
    let lowered = field_name.to_lowercase();
    let op = operator_symbol(operator);
    let v = display_value(value, label);
    let raw = display_value(value, None);
    let text = LeafText {
        op,
        v: &v,
        raw: &raw,
    };

    if let Some((_, template)) = TEMPLATES
        .iter()
        .find(|(predicate, _)| predicate.matches(&lowered))
    {
        return template(&text);
    }

    let base = [field_name, op, v.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if base.is_empty() {
        String::new()
    } else {
        format!("{}.", base.trim())
    }
}

/// Map a comparison operator to its mathematical symbol; unknown operators
/// pass through as-is.
pub(crate) fn operator_symbol(operator: Option<&str>) -> &str {
    match operator {
        Some("gte") => "\u{2265}",
        Some("lte") => "\u{2264}",
        Some("gt") => ">",
        Some("lt") => "<",
        Some("eq") => "=",
        Some(other) => other,
        None => "",
    }
}

/// Preferred display value: the label when present (arrays joined with a
/// comma), the raw value's string form otherwise. Objects and nulls render
/// empty rather than leaking payload internals.
fn display_value(value: Option<&Value>, label: Option<&Value>) -> String {
    let chosen = match label {
        Some(l) if !l.is_null() => Some(l),
        _ => value,
    };
    let Some(chosen) = chosen else {
        return String::new();
    };
    coerce(chosen).trim().to_string()
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(coerce)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null | Value::Object(_) => String::new(),
    }
}
