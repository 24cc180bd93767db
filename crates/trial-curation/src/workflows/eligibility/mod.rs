//! Eligibility rule sectionizer.
//!
//! Transforms the raw matched/unmatched rule tree returned for a trial into
//! the six fixed display sections. Logical nesting (AND/OR) survives only
//! when every child of a group resolves to the same section; mixed-section
//! groups are flattened so each bullet lands in its own panel. The transform
//! is pure: no I/O and no mutation of the input payload.

pub mod domain;
mod humanize;
mod node;
mod routing;
#[cfg(test)]
mod tests;

pub use domain::{GroupLogic, Section, SectionId, SectionItem, SectionStatus};

use std::collections::HashSet;

use serde_json::Value;

use domain::{SectionDef, BASE_SECTIONS};
use humanize::humanize;
use node::{nested_values, sniff, LeafRule, RuleShape};
use routing::route_field;

/// Build the six display sections from a raw eligibility payload.
///
/// The payload root is either a single rule node or a mapping (commonly
/// numbered keys) whose values are top-level rule nodes. Foreign shapes are
/// walked defensively and contribute nothing rather than failing.
pub fn build_eligibility_sections(root: &Value) -> Vec<Section> {
    let mut assembly = SectionAssembly::new();

    match sniff(root) {
        RuleShape::Group { .. } | RuleShape::Leaf(_) => assembly.add_node(root),
        RuleShape::Unknown => {
            for value in nested_values(root) {
                assembly.add_node(value);
            }
        }
        RuleShape::Skip => {}
    }

    assembly.finish()
}

struct SectionBucket {
    items: Vec<SectionItem>,
    seen: HashSet<String>,
    flags: Vec<bool>,
}

impl SectionBucket {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            flags: Vec::new(),
        }
    }
}

struct SectionAssembly {
    buckets: [SectionBucket; 6],
}

impl SectionAssembly {
    fn new() -> Self {
        Self {
            buckets: [
                SectionBucket::new(),
                SectionBucket::new(),
                SectionBucket::new(),
                SectionBucket::new(),
                SectionBucket::new(),
                SectionBucket::new(),
            ],
        }
    }

    fn add_node(&mut self, value: &Value) {
        match sniff(value) {
            RuleShape::Group { any, criteria } => {
                if let Some(placements) = resolve_group(any, criteria) {
                    for (section, item) in placements {
                        self.add(section, item);
                    }
                }
            }
            RuleShape::Leaf(leaf) => {
                let (section, item) = leaf_placement(&leaf);
                self.add(section, item);
            }
            RuleShape::Unknown => {
                for nested in nested_values(value) {
                    self.add_node(nested);
                }
            }
            RuleShape::Skip => {}
        }
    }

    /// Place one item, skipping content duplicates. A kept item contributes
    /// its matched flags (including nested ones) to the section exactly once.
    fn add(&mut self, section: SectionId, item: SectionItem) {
        let Some(key) = content_key(&item) else {
            return;
        };
        let bucket = &mut self.buckets[section.index()];
        if bucket.seen.insert(key) {
            collect_match_flags(&item, &mut bucket.flags);
            bucket.items.push(item);
        }
    }

    fn finish(self) -> Vec<Section> {
        BASE_SECTIONS
            .iter()
            .zip(self.buckets)
            .map(|(def, bucket)| section_from_bucket(def, bucket))
            .collect()
    }
}

fn section_from_bucket(def: &SectionDef, bucket: SectionBucket) -> Section {
    let status = if bucket.items.is_empty() {
        def.default_status
    } else if bucket.flags.iter().any(|flag| !flag) {
        SectionStatus::NotMet
    } else if !bucket.flags.is_empty() && bucket.flags.iter().all(|flag| *flag) {
        SectionStatus::Met
    } else {
        SectionStatus::Unknown
    };

    Section {
        id: def.id,
        title: def.title.to_string(),
        status,
        items: bucket.items,
    }
}

fn leaf_placement(leaf: &LeafRule<'_>) -> (SectionId, SectionItem) {
    let section = route_field(leaf.field_name);
    let text = humanize(leaf.field_name, leaf.operator, leaf.value, leaf.label);
    (section, SectionItem::leaf(text, leaf.matched))
}

/// Resolve a group node into `(section, item)` placements.
///
/// All children in one section yields a single nested parent item; children
/// spanning sections are flattened into standalone items, each under its own
/// section. A group with no resolvable children disappears entirely.
fn resolve_group(any: bool, criteria: &[Value]) -> Option<Vec<(SectionId, SectionItem)>> {
    let logic = if any { GroupLogic::Any } else { GroupLogic::All };

    let mut child_results: Vec<(SectionId, SectionItem)> = Vec::new();
    for child in criteria {
        match sniff(child) {
            RuleShape::Group { any, criteria } => {
                if let Some(nested) = resolve_group(any, criteria) {
                    child_results.extend(nested);
                }
            }
            RuleShape::Leaf(leaf) => child_results.push(leaf_placement(&leaf)),
            // Some payloads wrap leaves under extra keys; unwrap one level.
            RuleShape::Unknown => {
                for nested in nested_values(child) {
                    if let RuleShape::Leaf(leaf) = sniff(nested) {
                        child_results.push(leaf_placement(&leaf));
                    }
                }
            }
            RuleShape::Skip => {}
        }
    }

    if child_results.is_empty() {
        return None;
    }

    let first_section = child_results[0].0;
    if child_results
        .iter()
        .all(|(section, _)| *section == first_section)
    {
        let children = dedupe_items(child_results.into_iter().map(|(_, item)| item).collect());
        let matched = aggregate_matched(&children, logic);
        let parent = SectionItem::Group {
            text: logic.heading().to_string(),
            logic,
            children,
            matched,
        };
        return Some(vec![(first_section, parent)]);
    }

    // Mixed sections: regroup per section in first-seen order, de-duplicate
    // within each, and emit every child as its own standalone item.
    let mut by_section: Vec<(SectionId, Vec<SectionItem>)> = Vec::new();
    for (section, item) in child_results {
        match by_section.iter_mut().find(|(s, _)| *s == section) {
            Some((_, items)) => items.push(item),
            None => by_section.push((section, vec![item])),
        }
    }

    let mut out = Vec::new();
    for (section, items) in by_section {
        for item in dedupe_items(items) {
            out.push((section, item));
        }
    }
    Some(out)
}

/// Stable content key used for de-duplication: the text for leaves, the
/// logic + text + recursively serialized children for groups. An empty leaf
/// has no key and is never placed.
fn content_key(item: &SectionItem) -> Option<String> {
    match item {
        SectionItem::Leaf { text, .. } => {
            if text.is_empty() {
                None
            } else {
                Some(text.clone())
            }
        }
        SectionItem::Group {
            text,
            logic,
            children,
            ..
        } => {
            let kids = children
                .iter()
                .filter_map(content_key)
                .collect::<Vec<_>>()
                .join("||");
            Some(format!("{}|{}|{}", logic.label(), text, kids))
        }
    }
}

fn dedupe_items(items: Vec<SectionItem>) -> Vec<SectionItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = content_key(&item).unwrap_or_default();
        if seen.insert(key) {
            out.push(item);
        }
    }
    out
}

/// Collect every defined matched flag in an item tree.
fn collect_match_flags(item: &SectionItem, bucket: &mut Vec<bool>) {
    if let Some(flag) = item.matched() {
        bucket.push(flag);
    }
    if let SectionItem::Group { children, .. } = item {
        for child in children {
            collect_match_flags(child, bucket);
        }
    }
}

/// Combine direct child flags into the parent's state: `all` is true only if
/// every defined flag is true, `any` if at least one is. No defined flags
/// leaves the parent indeterminate.
fn aggregate_matched(children: &[SectionItem], logic: GroupLogic) -> Option<bool> {
    let flags: Vec<bool> = children.iter().filter_map(SectionItem::matched).collect();
    if flags.is_empty() {
        return None;
    }
    Some(match logic {
        GroupLogic::All => flags.iter().all(|flag| *flag),
        GroupLogic::Any => flags.iter().any(|flag| *flag),
    })
}
