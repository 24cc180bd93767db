
use serde_json::Value;

use super::{build_eligibility_sections, Section, SectionId};

pub(super) fn sections_for(payload: Value) -> Vec<Section> {
    build_eligibility_sections(&payload)
}

pub(super) fn section(sections: &[Section], id: SectionId) -> &Section {
    sections
        .iter()
        .find(|section| section.id == id)
        .expect("all six sections are always present")
}
