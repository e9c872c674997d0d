//! Terminal rendering for documents, reviews and feedback.
//!
//! Documents print as a vertical card grouped into sections; lists print as
//! one line per record. Diffs use inline `[-removed-]{+added+}` markup.

use chrono::{DateTime, Utc};
use toeflow_core::text_diff::to_markup;
use toeflow_core::{Document, FeeLineItem, ReviewRequest};
use toeflow_review::{DocumentFeedback, FanIn, FanOut, Reconciliation, SubmitOutcome};

const MAX_HISTORY: usize = 10;
const LABEL_WIDTH: usize = 14;

// ── Documents ──

pub fn print_document(doc: &Document) {
    println!("{}", doc.title);
    println!("{}", "─".repeat(doc.title.chars().count().max(20)));

    section("Identity");
    field("id", doc.id.as_str());
    field("client", &doc.client_name);
    field("status", doc.status.as_str());
    field("created by", &doc.created_by.to_string());
    field("created", &timestamp(doc.created_at));
    field("updated", &timestamp(doc.updated_at));
    if let Some(sent) = doc.sent_date {
        field("sent", &timestamp(sent));
    }
    if let Some(signed) = doc.signed_date {
        field("signed", &timestamp(signed));
    }

    section("Scope of work");
    paragraph(&doc.fields.scope_of_work);

    section("Fees");
    print_fees(&doc.fields.fee_structure);
    field("total", &money(doc.totals.total_fee));
    field("GST", &money(doc.totals.gst()));
    field("total inc GST", &money(doc.totals.total_fee_with_gst));

    section("Assumptions");
    paragraph(&doc.fields.assumptions);

    section("Exclusions");
    paragraph(&doc.fields.exclusions);

    if let Some(version) = &doc.pre_review_version {
        section("Pre-review version");
        field("captured", &timestamp(version.captured_at));
        field("captured by", &version.captured_by.to_string());
        field("total", &money(version.snapshot.totals.total_fee));
    }

    section("History");
    let skip = doc.history.len().saturating_sub(MAX_HISTORY);
    if skip > 0 {
        println!("  ... {skip} earlier entries");
    }
    for entry in doc.history.iter().skip(skip) {
        println!(
            "  {}  {:<18} {}  {}",
            timestamp(entry.timestamp),
            format!("{:?}", entry.action),
            entry.actor.id,
            entry.details
        );
    }
}

pub fn print_document_list(docs: &[Document]) {
    if docs.is_empty() {
        println!("No documents.");
        return;
    }
    for doc in docs {
        println!(
            "{}  {:<16} {:>12}  {}",
            doc.id,
            doc.status.as_str(),
            money(doc.totals.total_fee_with_gst),
            doc.title
        );
    }
}

fn print_fees(items: &[FeeLineItem]) {
    if items.is_empty() {
        println!("  (none)");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let description = if item.description.is_empty() {
            "Untitled"
        } else {
            &item.description
        };
        println!("  {:>2}. {:<40} {:>12}", i, description, money(item.cost));
        if !item.time_estimate.is_empty() {
            println!("      time: {}", item.time_estimate);
        }
        for staff in &item.staff_breakdown {
            println!("      {}: {}h", staff.staff_member, staff.hours);
        }
    }
}

// ── Reviews ──

pub fn print_reviews(reviews: &[ReviewRequest]) {
    if reviews.is_empty() {
        println!("No review requests.");
        return;
    }
    for review in reviews {
        let changes = if review.has_changes {
            format!("{} change(s)", review.changes_made.len())
        } else {
            String::new()
        };
        println!(
            "{}  {:<10} {}  doc {}  {}",
            review.id,
            review.status.to_string(),
            review.reviewer,
            review.document_id,
            changes
        );
    }
}

pub fn print_fan_out(fan_out: &FanOut) {
    println!(
        "Document {} is now {}; {} review request(s) created:",
        fan_out.document.id,
        fan_out.document.status.as_str(),
        fan_out.reviews.len()
    );
    print_reviews(&fan_out.reviews);
}

pub fn print_submit(outcome: &SubmitOutcome) {
    let review = &outcome.review;
    if review.has_changes {
        println!("Submitted review {} with {} change(s):", review.id, review.changes_made.len());
        for change in &review.changes_made {
            println!("  - {}", change.text);
        }
    } else {
        println!("Submitted review {} with no changes.", review.id);
    }
    match &outcome.fan_in {
        FanIn::Waiting { pending } => println!("Waiting on {pending} more review(s)."),
        FanIn::Resolved { status, .. } => {
            println!("All reviews in; document is now {}.", status.as_str())
        }
    }
}

pub fn print_feedback(feedback: &DocumentFeedback) {
    println!(
        "Feedback for {} ({})",
        feedback.document_id,
        feedback.status.as_str()
    );
    if feedback.reviews.is_empty() {
        println!("No completed reviews.");
        return;
    }
    for review in &feedback.reviews {
        println!();
        let when = review.completed_at.map(timestamp).unwrap_or_default();
        println!("■ {}  {}", review.reviewer, when);
        if !review.comments.is_empty() {
            println!("  \"{}\"", review.comments);
        }
        if !review.has_changes {
            println!("  Approved without changes.");
            continue;
        }
        for change in &review.changes {
            println!("  - {}", change.text);
        }
        for diff in &review.field_diffs {
            println!("  {}:", diff.field.label());
            println!("    {}", to_markup(&diff.segments));
        }
        if let Some(after) = review.totals_after
            && after != review.totals_before
        {
            println!(
                "  Total inc GST: {} -> {}",
                money(review.totals_before.total_fee_with_gst),
                money(after.total_fee_with_gst)
            );
        }
    }
}

pub fn print_reconciliation(outcome: &Reconciliation) {
    match outcome {
        Reconciliation::Accepted {
            document,
            applied_from,
            archived,
        } => println!(
            "Accepted changes from review {applied_from}; {archived} review(s) archived. Document is now {}.",
            document.status.as_str()
        ),
        Reconciliation::Discarded { document, archived } => println!(
            "Discarded review changes; {archived} review(s) archived. Document is now {}.",
            document.status.as_str()
        ),
        Reconciliation::NothingToReconcile { document } => println!(
            "No review of {} proposes changes; nothing to do.",
            document.id
        ),
    }
}

// ── Helpers ──

fn section(name: &str) {
    println!();
    println!("{name}");
}

fn field(label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    println!("  {label:<LABEL_WIDTH$} {value}");
}

fn paragraph(text: &str) {
    if text.trim().is_empty() {
        println!("  (empty)");
        return;
    }
    for line in text.lines() {
        println!("  {line}");
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(1150.0), "$1150.00");
        assert_eq!(money(2.5), "$2.50");
    }
}
