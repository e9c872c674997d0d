//! Record tables and their CRUD operations.
//!
//! A [`Tables`] value is what a transaction sees: store backends hand a
//! private copy to the closure and keep it only on success.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toeflow_core::{
    ChangeDescriptor, Document, DocumentId, DocumentStatus, HistoryEntry, PreReviewVersion,
    ReviewId, ReviewRequest, ReviewSnapshot, ReviewStatus, ReviewableFields, Totals,
};

use crate::StoreError;

/// Ordering for [`Tables::list_documents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    CreatedAsc,
    CreatedDesc,
    UpdatedDesc,
}

/// Partial document update. `None` leaves a member untouched; history entries
/// are appended, never replaced.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<DocumentStatus>,
    pub fields: Option<ReviewableFields>,
    pub totals: Option<Totals>,
    pub pre_review_version: Option<Option<PreReviewVersion>>,
    pub sent_date: Option<DateTime<Utc>>,
    pub signed_date: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub append_history: Vec<HistoryEntry>,
}

impl DocumentPatch {
    fn apply_to(self, doc: &mut Document) {
        if let Some(title) = self.title {
            doc.title = title;
        }
        if let Some(client_name) = self.client_name {
            doc.client_name = client_name;
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(fields) = self.fields {
            doc.fields = fields;
        }
        if let Some(totals) = self.totals {
            doc.totals = totals;
        }
        if let Some(version) = self.pre_review_version {
            doc.pre_review_version = version;
        }
        if let Some(sent) = self.sent_date {
            doc.sent_date = Some(sent);
        }
        if let Some(signed) = self.signed_date {
            doc.signed_date = Some(signed);
        }
        if let Some(updated_at) = self.updated_at {
            doc.updated_at = updated_at;
        }
        doc.history.extend(self.append_history);
    }
}

/// Partial review request update.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub review_data: Option<ReviewSnapshot>,
    pub changes_made: Option<Vec<ChangeDescriptor>>,
    pub has_changes: Option<bool>,
}

impl ReviewPatch {
    pub fn status(status: ReviewStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply_to(self, review: &mut ReviewRequest) {
        if let Some(status) = self.status {
            review.status = status;
        }
        if let Some(at) = self.completed_at {
            review.completed_at = Some(at);
        }
        if let Some(comments) = self.comments {
            review.comments = comments;
        }
        if let Some(data) = self.review_data {
            review.review_data = Some(data);
        }
        if let Some(changes) = self.changes_made {
            review.changes_made = changes;
        }
        if let Some(has_changes) = self.has_changes {
            review.has_changes = has_changes;
        }
    }
}

/// Conjunctive filter over review requests. Reviewer ids match ignoring case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub document_id: Option<DocumentId>,
    pub reviewer: Option<String>,
    pub status: Option<ReviewStatus>,
}

impl ReviewFilter {
    pub fn for_document(document_id: &DocumentId) -> Self {
        Self {
            document_id: Some(document_id.clone()),
            ..Self::default()
        }
    }

    /// `reviewer == id AND status == pending`.
    pub fn awaiting(reviewer: &str) -> Self {
        Self {
            reviewer: Some(reviewer.to_string()),
            status: Some(ReviewStatus::Pending),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, review: &ReviewRequest) -> bool {
        self.document_id
            .as_ref()
            .is_none_or(|id| &review.document_id == id)
            && self
                .reviewer
                .as_deref()
                .is_none_or(|reviewer| review.reviewer.matches_id(reviewer))
            && self.status.is_none_or(|status| review.status == status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    documents: BTreeMap<DocumentId, Document>,
    #[serde(default)]
    reviews: BTreeMap<ReviewId, ReviewRequest>,
}

impl Tables {
    // ── Documents ──

    pub fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(id.clone()))
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn list_documents(&self, order: Order) -> Vec<Document> {
        let mut docs: Vec<Document> = self.documents.values().cloned().collect();
        match order {
            Order::CreatedAsc => docs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Order::CreatedDesc => docs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Order::UpdatedDesc => docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }
        docs
    }

    pub fn create_document(&mut self, doc: Document) -> Result<Document, StoreError> {
        if self.documents.contains_key(&doc.id) {
            return Err(StoreError::Duplicate(doc.id.to_string()));
        }
        self.documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    pub fn update_document(
        &mut self,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, StoreError> {
        let doc = self
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::DocumentNotFound(id.clone()))?;
        patch.apply_to(doc);
        Ok(doc.clone())
    }

    /// Overwrite an existing document wholesale.
    pub fn replace_document(&mut self, doc: Document) -> Result<Document, StoreError> {
        let slot = self
            .documents
            .get_mut(&doc.id)
            .ok_or_else(|| StoreError::DocumentNotFound(doc.id.clone()))?;
        *slot = doc.clone();
        Ok(doc)
    }

    pub fn delete_document(&mut self, id: &DocumentId) -> Result<Document, StoreError> {
        self.documents
            .remove(id)
            .ok_or_else(|| StoreError::DocumentNotFound(id.clone()))
    }

    // ── Review requests ──

    pub fn get_review(&self, id: &ReviewId) -> Result<ReviewRequest, StoreError> {
        self.reviews
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ReviewNotFound(id.clone()))
    }

    /// All reviews in request order.
    pub fn list_reviews(&self) -> Vec<ReviewRequest> {
        self.filter_reviews(&ReviewFilter::default())
    }

    /// Matching reviews in request order (ties broken by id).
    pub fn filter_reviews(&self, filter: &ReviewFilter) -> Vec<ReviewRequest> {
        let mut reviews: Vec<ReviewRequest> = self
            .reviews
            .values()
            .filter(|review| filter.matches(review))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.id.cmp(&b.id)));
        reviews
    }

    pub fn create_review(&mut self, review: ReviewRequest) -> Result<ReviewRequest, StoreError> {
        if self.reviews.contains_key(&review.id) {
            return Err(StoreError::Duplicate(review.id.to_string()));
        }
        self.reviews.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    pub fn update_review(
        &mut self,
        id: &ReviewId,
        patch: ReviewPatch,
    ) -> Result<ReviewRequest, StoreError> {
        let review = self
            .reviews
            .get_mut(id)
            .ok_or_else(|| StoreError::ReviewNotFound(id.clone()))?;
        patch.apply_to(review);
        Ok(review.clone())
    }

    pub fn delete_review(&mut self, id: &ReviewId) -> Result<ReviewRequest, StoreError> {
        self.reviews
            .remove(id)
            .ok_or_else(|| StoreError::ReviewNotFound(id.clone()))
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }
}
