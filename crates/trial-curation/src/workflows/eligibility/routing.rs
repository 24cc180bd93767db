use super::domain::SectionId;

/// Predicate over a lower-cased field name.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldMatch {
    /// Plain substring match.
    Contains(&'static str),
    /// Any of several substrings.
    AnyOf(&'static [&'static str]),
    /// Substring bounded by non-alphanumeric characters (or the ends), for
    /// short tokens like `anc` that would otherwise match inside words.
    Word(&'static str),
}

impl FieldMatch {
    pub(crate) fn matches(&self, field: &str) -> bool {
        match self {
            FieldMatch::Contains(needle) => field.contains(needle),
            FieldMatch::AnyOf(needles) => needles.iter().any(|needle| field.contains(needle)),
            FieldMatch::Word(word) => contains_word(field, word),
        }
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(word) {
        let at = start + pos;
        let end = at + word.len();
        let left_ok = at == 0
            || !haystack[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let right_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        start = at + 1;
        if start >= haystack.len() {
            break;
        }
    }
    false
}

/// Ordered routing table mapping field-name keywords to sections. Evaluated
/// first-match-wins, so new entries belong at the end: an appended predicate
/// must not re-route fields an earlier one already claims.
const SECTION_ROUTES: &[(FieldMatch, SectionId)] = &[
    // Demographics
    (FieldMatch::Contains("current age"), SectionId::Demographics),
    (FieldMatch::Contains("biological sex"), SectionId::Demographics),
    (FieldMatch::Contains("cns status"), SectionId::Demographics),
    // Disease
    (FieldMatch::Contains("current diagnosis"), SectionId::Disease),
    (FieldMatch::Contains("ecog"), SectionId::Disease),
    (FieldMatch::Contains("bclc stage"), SectionId::Disease),
    (FieldMatch::Contains("child-pugh"), SectionId::Disease),
    (FieldMatch::Contains("child pugh"), SectionId::Disease),
    (FieldMatch::Contains("relapse"), SectionId::Disease),
    (FieldMatch::Contains("refractory"), SectionId::Disease),
    (FieldMatch::Contains("curative therapy"), SectionId::Disease),
    (FieldMatch::Contains("hiv"), SectionId::Disease),
    (FieldMatch::Contains("hepatitis"), SectionId::Disease),
    (FieldMatch::Contains("infection"), SectionId::Disease),
    // Treatment & Exposure
    (
        FieldMatch::Contains("hematopoietic cell transplantation"),
        SectionId::Treatment,
    ),
    (FieldMatch::Contains("transplant"), SectionId::Treatment),
    (FieldMatch::Contains("prior exposure"), SectionId::Treatment),
    (FieldMatch::Contains("venetoclax"), SectionId::Treatment),
    (FieldMatch::Contains("anthracycline"), SectionId::Treatment),
    (FieldMatch::Contains("radiotherapy"), SectionId::Treatment),
    (FieldMatch::Word("rt"), SectionId::Treatment),
    (FieldMatch::Contains("cyp3a"), SectionId::Treatment),
    (FieldMatch::Contains("cytokines"), SectionId::Treatment),
    (FieldMatch::Contains("growth factor"), SectionId::Treatment),
    (
        FieldMatch::Contains("antibody-drug conjugate"),
        SectionId::Treatment,
    ),
    (
        FieldMatch::Contains("cytotoxic chemotherapy"),
        SectionId::Treatment,
    ),
    // Organ function (labs & panels)
    (FieldMatch::Contains("liver function"), SectionId::Organ),
    (FieldMatch::Contains("renal function"), SectionId::Organ),
    (FieldMatch::Contains("cardiac function"), SectionId::Organ),
    (
        FieldMatch::Contains("left ventricular function"),
        SectionId::Organ,
    ),
    (FieldMatch::Contains("ejection fraction"), SectionId::Organ),
    (FieldMatch::Contains("shortening fraction"), SectionId::Organ),
    (FieldMatch::Contains("bilirubin"), SectionId::Organ),
    (FieldMatch::Contains("sgot"), SectionId::Organ),
    (FieldMatch::Word("ast"), SectionId::Organ),
    (FieldMatch::Contains("sgpt"), SectionId::Organ),
    (FieldMatch::Word("alt"), SectionId::Organ),
    (FieldMatch::Contains("serum creatinine"), SectionId::Organ),
    (
        FieldMatch::Contains("creatinine clearance"),
        SectionId::Organ,
    ),
    (FieldMatch::Contains("hemoglobin"), SectionId::Organ),
    (FieldMatch::Contains("platelet"), SectionId::Organ),
    (
        FieldMatch::Contains("absolute neutrophil count"),
        SectionId::Organ,
    ),
    (FieldMatch::Word("anc"), SectionId::Organ),
    (
        FieldMatch::Contains("international normalized ratio"),
        SectionId::Organ,
    ),
    (FieldMatch::Word("inr"), SectionId::Organ),
    // Biomarkers
    (FieldMatch::Contains("kmt2a"), SectionId::Biomarkers),
    (FieldMatch::Contains("gpc3"), SectionId::Biomarkers),
    (FieldMatch::Contains("glypican"), SectionId::Biomarkers),
];

/// Map a field name to one of the six sections; unmatched fields land in the
/// fallback bucket.
pub(crate) fn route_field(field_name: &str) -> SectionId {
    let lowered = field_name.to_lowercase();
    SECTION_ROUTES
        .iter()
        .find(|(predicate, _)| predicate.matches(&lowered))
        .map(|(_, section)| *section)
        .unwrap_or(SectionId::Additional)
}
