use serde::{Deserialize, Serialize};

/// Aggregate match state shown on a section panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionStatus {
    Met,
    NotMet,
    Unknown,
}

/// The six fixed display sections, in their rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Additional,
    Demographics,
    Disease,
    Treatment,
    Organ,
    Biomarkers,
}

impl SectionId {
    pub const ALL: [SectionId; 6] = [
        SectionId::Additional,
        SectionId::Demographics,
        SectionId::Disease,
        SectionId::Treatment,
        SectionId::Organ,
        SectionId::Biomarkers,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            SectionId::Additional => 0,
            SectionId::Demographics => 1,
            SectionId::Disease => 2,
            SectionId::Treatment => 3,
            SectionId::Organ => 4,
            SectionId::Biomarkers => 5,
        }
    }
}

/// Fixed panel definitions. The default status applies when a section ends up
/// with no items at all.
pub(crate) struct SectionDef {
    pub(crate) id: SectionId,
    pub(crate) title: &'static str,
    pub(crate) default_status: SectionStatus,
}

pub(crate) const BASE_SECTIONS: [SectionDef; 6] = [
    SectionDef {
        id: SectionId::Additional,
        title: "Additional Criteria",
        default_status: SectionStatus::Unknown,
    },
    SectionDef {
        id: SectionId::Demographics,
        title: "Demographics",
        default_status: SectionStatus::Met,
    },
    SectionDef {
        id: SectionId::Disease,
        title: "Disease",
        default_status: SectionStatus::Met,
    },
    SectionDef {
        id: SectionId::Treatment,
        title: "Treatment and Exposure",
        default_status: SectionStatus::Met,
    },
    SectionDef {
        id: SectionId::Organ,
        title: "Organ Function",
        default_status: SectionStatus::NotMet,
    },
    SectionDef {
        id: SectionId::Biomarkers,
        title: "Biomarkers",
        default_status: SectionStatus::NotMet,
    },
];

/// How a group item combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLogic {
    All,
    Any,
}

impl GroupLogic {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            GroupLogic::All => "all",
            GroupLogic::Any => "any",
        }
    }

    pub(crate) const fn heading(self) -> &'static str {
        match self {
            GroupLogic::All => "All of the following:",
            GroupLogic::Any => "Any of the following:",
        }
    }
}

/// One display bullet. A group carries nested children and their combining
/// logic; `matched` stays `None` when the state is indeterminate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionItem {
    Group {
        text: String,
        logic: GroupLogic,
        children: Vec<SectionItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        matched: Option<bool>,
    },
    Leaf {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        matched: Option<bool>,
    },
}

impl SectionItem {
    pub fn leaf(text: impl Into<String>, matched: Option<bool>) -> Self {
        SectionItem::Leaf {
            text: text.into(),
            matched,
        }
    }

    pub fn matched(&self) -> Option<bool> {
        match self {
            SectionItem::Group { matched, .. } | SectionItem::Leaf { matched, .. } => *matched,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            SectionItem::Group { text, .. } | SectionItem::Leaf { text, .. } => text,
        }
    }
}

/// A rendered section panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub status: SectionStatus,
    pub items: Vec<SectionItem>,
}
