//! Structural change detection between an original and a reviewer's candidate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::ReviewableFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewableField {
    ScopeOfWork,
    FeeStructure,
    Assumptions,
    Exclusions,
}

impl ReviewableField {
    /// Text fields, in the order their descriptors are emitted.
    pub const SCALARS: [ReviewableField; 3] = [Self::ScopeOfWork, Self::Assumptions, Self::Exclusions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScopeOfWork => "scope_of_work",
            Self::FeeStructure => "fee_structure",
            Self::Assumptions => "assumptions",
            Self::Exclusions => "exclusions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ScopeOfWork => "Scope of work",
            Self::FeeStructure => "Fee structure",
            Self::Assumptions => "Assumptions",
            Self::Exclusions => "Exclusions",
        }
    }

    /// The text behind a scalar field; `None` for the fee structure.
    pub fn text<'a>(&self, fields: &'a ReviewableFields) -> Option<&'a str> {
        match self {
            Self::ScopeOfWork => Some(&fields.scope_of_work),
            Self::Assumptions => Some(&fields.assumptions),
            Self::Exclusions => Some(&fields.exclusions),
            Self::FeeStructure => None,
        }
    }
}

impl fmt::Display for ReviewableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One human-readable difference. `id` is stable for a given field and index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    pub id: String,
    pub text: String,
    pub field: ReviewableField,
}

impl ChangeDescriptor {
    fn new(id: impl Into<String>, field: ReviewableField, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            field,
        }
    }
}

/// Describe every difference between `original` and `candidate`.
///
/// Order: scope of work, assumptions, exclusions, then the fee item count
/// delta, then modified fee items by ascending index. Items beyond the shorter
/// list are covered by the count delta only.
pub fn summarize(original: &ReviewableFields, candidate: &ReviewableFields) -> Vec<ChangeDescriptor> {
    let mut changes = Vec::new();

    for field in ReviewableField::SCALARS {
        if field.text(original) != field.text(candidate) {
            changes.push(ChangeDescriptor::new(
                field.as_str(),
                field,
                format!("{} was modified.", field.label()),
            ));
        }
    }

    let before = &original.fee_structure;
    let after = &candidate.fee_structure;
    if after.len() > before.len() {
        changes.push(ChangeDescriptor::new(
            "fee_count",
            ReviewableField::FeeStructure,
            format!("{} new fee item(s) added.", after.len() - before.len()),
        ));
    } else if after.len() < before.len() {
        changes.push(ChangeDescriptor::new(
            "fee_count",
            ReviewableField::FeeStructure,
            format!("{} fee item(s) removed.", before.len() - after.len()),
        ));
    }

    for (index, (old, new)) in before.iter().zip(after).enumerate() {
        if old != new {
            let description = match new.description.trim() {
                "" => "Untitled",
                text => text,
            };
            changes.push(ChangeDescriptor::new(
                format!("fee_mod_{index}"),
                ReviewableField::FeeStructure,
                format!("Fee item \"{description}\" was modified."),
            ));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FeeLineItem;

    fn base() -> ReviewableFields {
        ReviewableFields {
            scope_of_work: "Survey the site.".into(),
            fee_structure: vec![FeeLineItem::new("Survey", 1000.0), FeeLineItem::new("Report", 400.0)],
            assumptions: "Access is provided.".into(),
            exclusions: "Travel.".into(),
        }
    }

    fn ids(changes: &[ChangeDescriptor]) -> Vec<&str> {
        changes.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn identical_fields_have_no_changes() {
        assert!(summarize(&base(), &base()).is_empty());
    }

    #[test]
    fn scope_edit_yields_one_descriptor() {
        let mut candidate = base();
        candidate.scope_of_work = "Survey the entire site carefully.".into();
        let changes = summarize(&base(), &candidate);
        assert_eq!(
            changes,
            vec![ChangeDescriptor {
                id: "scope_of_work".into(),
                text: "Scope of work was modified.".into(),
                field: ReviewableField::ScopeOfWork,
            }]
        );
    }

    #[test]
    fn appended_fee_item_reports_count_only() {
        let mut candidate = base();
        candidate.fee_structure.push(FeeLineItem::new("Site visit", 250.0));
        let changes = summarize(&base(), &candidate);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].text, "1 new fee item(s) added.");
        assert_eq!(changes[0].field, ReviewableField::FeeStructure);
    }

    #[test]
    fn removed_fee_items_counted() {
        let mut candidate = base();
        candidate.fee_structure.clear();
        let changes = summarize(&base(), &candidate);
        assert_eq!(ids(&changes), vec!["fee_count"]);
        assert_eq!(changes[0].text, "2 fee item(s) removed.");
    }

    #[test]
    fn modified_fee_item_named_by_description() {
        let mut candidate = base();
        candidate.fee_structure[1].cost = 450.0;
        let changes = summarize(&base(), &candidate);
        assert_eq!(ids(&changes), vec!["fee_mod_1"]);
        assert_eq!(changes[0].text, "Fee item \"Report\" was modified.");
    }

    #[test]
    fn blank_description_is_untitled() {
        let mut candidate = base();
        candidate.fee_structure[0].description = "  ".into();
        let changes = summarize(&base(), &candidate);
        assert_eq!(changes[0].text, "Fee item \"Untitled\" was modified.");
    }

    #[test]
    fn nested_fee_members_are_compared() {
        let mut candidate = base();
        candidate.fee_structure[0]
            .linked_task_templates
            .push("tpl-7".into());
        assert_eq!(ids(&summarize(&base(), &candidate)), vec!["fee_mod_0"]);
    }

    #[test]
    fn descriptors_follow_fixed_order() {
        let mut candidate = base();
        candidate.exclusions = "Travel and accommodation.".into();
        candidate.scope_of_work = "Survey two sites.".into();
        candidate.assumptions = "".into();
        candidate.fee_structure[0].cost = 1100.0;
        candidate.fee_structure[1].description = "Final report".into();
        candidate.fee_structure.push(FeeLineItem::new("Extra", 10.0));
        let changes = summarize(&base(), &candidate);
        assert_eq!(
            ids(&changes),
            vec![
                "scope_of_work",
                "assumptions",
                "exclusions",
                "fee_count",
                "fee_mod_0",
                "fee_mod_1"
            ]
        );
    }

    #[test]
    fn summary_is_idempotent() {
        let mut candidate = base();
        candidate.assumptions = "None.".into();
        candidate.fee_structure.remove(0);
        let first = summarize(&base(), &candidate);
        let second = summarize(&base(), &candidate);
        assert_eq!(first, second);
    }

    #[test]
    fn more_differing_fields_never_shrink_summary() {
        // Each bit toggles one independent difference.
        fn candidate_for(mask: u8) -> ReviewableFields {
            let mut c = base();
            if mask & 1 != 0 {
                c.scope_of_work.push_str(" Again.");
            }
            if mask & 2 != 0 {
                c.assumptions.push_str(" Also.");
            }
            if mask & 4 != 0 {
                c.exclusions.push_str(" Parking.");
            }
            if mask & 8 != 0 {
                c.fee_structure[0].cost += 1.0;
            }
            if mask & 16 != 0 {
                c.fee_structure.push(FeeLineItem::new("New", 1.0));
            }
            c
        }

        for mask in 0u8..32 {
            let len = summarize(&base(), &candidate_for(mask)).len();
            for bit in 0..5 {
                let wider = mask | (1 << bit);
                assert!(summarize(&base(), &candidate_for(wider)).len() >= len);
            }
        }
    }
}
