//! The Terms of Engagement document and its reviewable fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An identity stamped onto requests, reviews and history entries.
///
/// `id` is the email address; comparisons ignore ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Whether `self` and `other` name the same identity.
    pub fn matches(&self, other: &Actor) -> bool {
        self.matches_id(&other.id)
    }

    pub fn matches_id(&self, id: &str) -> bool {
        self.id.trim().eq_ignore_ascii_case(id.trim())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.id)
        } else {
            write!(f, "{} <{}>", self.name, self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lifecycle state of a document. See [`crate::lifecycle`] for the legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    InternalReview,
    ReviewCompleted,
    ReadyToSend,
    Sent,
    Signed,
    Expired,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InternalReview => "internal_review",
            Self::ReviewCompleted => "review_completed",
            Self::ReadyToSend => "ready_to_send",
            Self::Sent => "sent",
            Self::Signed => "signed",
            Self::Expired => "expired",
        }
    }

    /// Whether the author may change reviewable fields in this state.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::ReadyToSend)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffAllocation {
    pub staff_member: String,
    pub hours: f64,
}

/// One line of the fee structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeLineItem {
    pub description: String,
    pub cost: f64,
    #[serde(default)]
    pub time_estimate: String,
    #[serde(default)]
    pub staff_breakdown: Vec<StaffAllocation>,
    #[serde(default)]
    pub linked_task_templates: Vec<String>,
}

impl FeeLineItem {
    pub fn new(description: impl Into<String>, cost: f64) -> Self {
        Self {
            description: description.into(),
            cost,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("fee item {index} has a non-finite cost")]
    NonFiniteCost { index: usize },

    #[error("fee item {index} has non-finite hours for {staff_member}")]
    NonFiniteHours { index: usize, staff_member: String },
}

/// The four fields reviewers may edit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewableFields {
    #[serde(default)]
    pub scope_of_work: String,
    #[serde(default)]
    pub fee_structure: Vec<FeeLineItem>,
    #[serde(default)]
    pub assumptions: String,
    #[serde(default)]
    pub exclusions: String,
}

impl ReviewableFields {
    /// Check the numeric members of the fee structure.
    pub fn validate(&self) -> Result<(), FieldError> {
        for (index, item) in self.fee_structure.iter().enumerate() {
            if !item.cost.is_finite() {
                return Err(FieldError::NonFiniteCost { index });
            }
            if let Some(staff) = item
                .staff_breakdown
                .iter()
                .find(|staff| !staff.hours.is_finite())
            {
                return Err(FieldError::NonFiniteHours {
                    index,
                    staff_member: staff.staff_member.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Fee totals derived from a fee structure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub total_fee: f64,
    pub total_fee_with_gst: f64,
}

impl Totals {
    /// subtotal = sum of costs; total = subtotal + subtotal * tax_rate.
    pub fn compute(fee_structure: &[FeeLineItem], tax_rate: f64) -> Self {
        let total_fee: f64 = fee_structure.iter().map(|item| item.cost).sum();
        let gst = total_fee * tax_rate;
        Self {
            total_fee,
            total_fee_with_gst: total_fee + gst,
        }
    }

    pub fn gst(&self) -> f64 {
        self.total_fee_with_gst - self.total_fee
    }
}

/// Reviewable fields plus the totals computed from them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    #[serde(flatten)]
    pub fields: ReviewableFields,
    #[serde(flatten)]
    pub totals: Totals,
}

impl ReviewSnapshot {
    pub fn from_fields(fields: ReviewableFields, tax_rate: f64) -> Self {
        let totals = Totals::compute(&fields.fee_structure, tax_rate);
        Self { fields, totals }
    }
}

/// Immutable copy of the document taken when a review cycle produced changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreReviewVersion {
    #[serde(flatten)]
    pub snapshot: ReviewSnapshot,
    pub captured_at: DateTime<Utc>,
    pub captured_by: Actor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    SentForReview,
    ReviewCompleted,
    ChangesAccepted,
    ChangesDiscarded,
    SentToClient,
    Signed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    pub action: HistoryAction,
    pub details: String,
}

impl HistoryEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        actor: &Actor,
        action: HistoryAction,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            actor: actor.clone(),
            action,
            details: details.into(),
        }
    }
}

/// Author input for a new document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(flatten)]
    pub fields: ReviewableFields,
}

/// A Terms of Engagement document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub client_name: String,
    pub status: DocumentStatus,
    #[serde(flatten)]
    pub fields: ReviewableFields,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(default)]
    pub pre_review_version: Option<PreReviewVersion>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signed_date: Option<DateTime<Utc>>,
}

impl Document {
    /// Create a draft owned by `author`, with totals computed from the fees.
    pub fn new(draft: NewDocument, author: &Actor, at: DateTime<Utc>, tax_rate: f64) -> Self {
        let totals = Totals::compute(&draft.fields.fee_structure, tax_rate);
        Self {
            id: DocumentId::generate(),
            title: draft.title,
            client_name: draft.client_name,
            status: DocumentStatus::Draft,
            fields: draft.fields,
            totals,
            pre_review_version: None,
            history: vec![HistoryEntry::new(
                at,
                author,
                HistoryAction::Created,
                "Document created",
            )],
            created_by: author.clone(),
            created_at: at,
            updated_at: at,
            sent_date: None,
            signed_date: None,
        }
    }

    /// Current reviewable fields and totals.
    pub fn snapshot(&self) -> ReviewSnapshot {
        ReviewSnapshot {
            fields: self.fields.clone(),
            totals: self.totals,
        }
    }

    /// `pre_review_version` is present exactly while changes await a decision.
    pub fn snapshot_invariant_holds(&self) -> bool {
        self.pre_review_version.is_some() == (self.status == DocumentStatus::ReviewCompleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Actor {
        Actor::new("author@firm.example", "Avery Author")
    }

    #[test]
    fn totals_include_gst() {
        let fees = vec![FeeLineItem::new("Survey", 1000.0), FeeLineItem::new("Report", 500.0)];
        let totals = Totals::compute(&fees, 0.15);
        assert_eq!(totals.total_fee, 1500.0);
        assert!((totals.total_fee_with_gst - 1725.0).abs() < 1e-9);
        assert!((totals.gst() - 225.0).abs() < 1e-9);
    }

    #[test]
    fn empty_fee_structure_totals_zero() {
        assert_eq!(Totals::compute(&[], 0.15), Totals::default());
    }

    #[test]
    fn new_document_starts_in_draft_with_history() {
        let draft = NewDocument {
            title: "Site survey".into(),
            client_name: "Acme".into(),
            fields: ReviewableFields {
                scope_of_work: "Survey the site.".into(),
                fee_structure: vec![FeeLineItem::new("Survey", 200.0)],
                ..ReviewableFields::default()
            },
        };
        let doc = Document::new(draft, &author(), Utc::now(), 0.15);
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.totals.total_fee, 200.0);
        assert_eq!(doc.history.len(), 1);
        assert_eq!(doc.history[0].action, HistoryAction::Created);
        assert!(doc.snapshot_invariant_holds());
    }

    #[test]
    fn actor_match_ignores_case_and_padding() {
        let a = Actor::new("Reviewer@Firm.example", "R");
        assert!(a.matches_id(" reviewer@firm.example "));
        assert!(!a.matches_id("other@firm.example"));
    }

    #[test]
    fn validate_rejects_non_finite_cost() {
        let fields = ReviewableFields {
            fee_structure: vec![FeeLineItem::new("ok", 1.0), FeeLineItem::new("bad", f64::NAN)],
            ..ReviewableFields::default()
        };
        assert_eq!(fields.validate(), Err(FieldError::NonFiniteCost { index: 1 }));
    }

    #[test]
    fn document_json_flattens_fields() {
        let doc = Document::new(NewDocument::default(), &author(), Utc::now(), 0.15);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["status"], "draft");
        assert!(value.get("scope_of_work").is_some());
        assert!(value.get("total_fee_with_gst").is_some());
        let parsed: Document = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, doc);
    }
}
