//! The workflow facade and the author's own document operations.
//!
//! Review fan-out/fan-in lives in `coordinator`, accept/discard in
//! `reconcile`; both extend [`Workflow`] with further `impl` blocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toeflow_core::lifecycle::{self, Transition};
use toeflow_core::{
    Actor, Document, DocumentId, DocumentStatus, HistoryAction, HistoryEntry, NewDocument,
    ReviewConfig, ReviewableFields, Totals, summarize,
};
use toeflow_store::{DocumentPatch, Order, RecordStore, ReviewFilter};
use tracing::info;

use crate::ReviewError;
use crate::clock::{Clock, SystemClock};
use crate::notify::{NoopNotifier, ReviewNotifier};

/// Author edits. `None` leaves a member as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub fields: Option<ReviewableFields>,
}

pub struct Workflow<S> {
    store: S,
    config: ReviewConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn ReviewNotifier>,
}

impl<S: RecordStore> Workflow<S> {
    pub fn new(store: S, config: ReviewConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReviewNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> ReviewConfig {
        self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn notifier(&self) -> &dyn ReviewNotifier {
        self.notifier.as_ref()
    }

    // ── Author operations ──

    pub fn create_document(&self, draft: NewDocument, author: &Actor) -> Result<Document, ReviewError> {
        draft.fields.validate()?;
        let doc = Document::new(draft, author, self.now(), self.config.tax_rate);
        let doc = self.store.create_document(doc)?;
        info!(document = %doc.id, author = %author.id, "document created");
        Ok(doc)
    }

    pub fn document(&self, id: &DocumentId) -> Result<Document, ReviewError> {
        Ok(self.store.get_document(id)?)
    }

    pub fn documents(&self, order: Order) -> Result<Vec<Document>, ReviewError> {
        Ok(self.store.list_documents(order)?)
    }

    /// Change title, client or reviewable fields. Rejected while the
    /// document is under review, awaiting a review decision, or out with
    /// the client.
    pub fn edit_document(
        &self,
        id: &DocumentId,
        edit: DocumentEdit,
        actor: &Actor,
    ) -> Result<Document, ReviewError> {
        if let Some(fields) = &edit.fields {
            fields.validate()?;
        }
        let at = self.now();
        let tax_rate = self.config.tax_rate;
        self.store.transaction(|t| {
            let doc = t.get_document(id)?;
            lifecycle::ensure_editable(&doc)?;

            let mut details = Vec::new();
            if edit.title.as_ref().is_some_and(|title| title != &doc.title) {
                details.push("Title was modified.".to_string());
            }
            if edit
                .client_name
                .as_ref()
                .is_some_and(|client| client != &doc.client_name)
            {
                details.push("Client was modified.".to_string());
            }
            let totals = edit.fields.as_ref().map(|fields| {
                details.extend(summarize(&doc.fields, fields).into_iter().map(|c| c.text));
                Totals::compute(&fields.fee_structure, tax_rate)
            });
            let details = if details.is_empty() {
                "No changes".to_string()
            } else {
                details.join(" ")
            };

            let patch = DocumentPatch {
                title: edit.title,
                client_name: edit.client_name,
                fields: edit.fields,
                totals,
                updated_at: Some(at),
                append_history: vec![HistoryEntry::new(at, actor, HistoryAction::Updated, details)],
                ..DocumentPatch::default()
            };
            let doc = t.update_document(id, patch)?;
            info!(document = %id, actor = %actor.id, "document updated");
            Ok(doc)
        })
    }

    /// Delete a document and every review request that points at it.
    /// Signed documents are kept.
    pub fn delete_document(&self, id: &DocumentId, actor: &Actor) -> Result<Document, ReviewError> {
        self.store.transaction(|t| {
            let doc = t.get_document(id)?;
            if doc.status == DocumentStatus::Signed {
                return Err(ReviewError::DocumentSigned(id.clone()));
            }
            let reviews = t.filter_reviews(&ReviewFilter::for_document(id));
            for review in &reviews {
                t.delete_review(&review.id)?;
            }
            let doc = t.delete_document(id)?;
            info!(
                document = %id,
                actor = %actor.id,
                reviews = reviews.len(),
                "document deleted"
            );
            Ok(doc)
        })
    }

    /// `ready_to_send -> sent`, stamping the sent date.
    pub fn mark_sent(&self, id: &DocumentId, actor: &Actor) -> Result<Document, ReviewError> {
        self.transition(id, Transition::MarkSent, actor, "Sent to client")
    }

    /// `sent -> signed`, on the signature-completion event.
    pub fn mark_signed(&self, id: &DocumentId, actor: &Actor) -> Result<Document, ReviewError> {
        self.transition(id, Transition::MarkSigned, actor, "Signed by client")
    }

    /// `sent -> expired`, on the external expiry event.
    pub fn mark_expired(&self, id: &DocumentId, actor: &Actor) -> Result<Document, ReviewError> {
        self.transition(id, Transition::MarkExpired, actor, "Offer expired")
    }

    fn transition(
        &self,
        id: &DocumentId,
        transition: Transition,
        actor: &Actor,
        details: &str,
    ) -> Result<Document, ReviewError> {
        let at = self.now();
        self.store.transaction(|t| {
            let mut doc = t.get_document(id)?;
            lifecycle::apply(&mut doc, transition, actor, at, details)?;
            let doc = t.replace_document(doc)?;
            info!(document = %id, status = %doc.status, actor = %actor.id, "document transitioned");
            Ok(doc)
        })
    }
}
