use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use toeflow_core::{
    Actor, DocumentId, FeeLineItem, NewDocument, ReviewConfig, ReviewId, ReviewableFields,
    text_diff,
};
use toeflow_review::{DocumentEdit, LogNotifier, Workflow};
use toeflow_store::{JsonFileStore, Order};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod display;

#[derive(Parser)]
#[command(name = "toeflow", version, about = "Terms of Engagement review workflow")]
struct Cli {
    /// JSON record store
    #[arg(long, env = "TOEFLOW_STORE", default_value = "toeflow.json", global = true)]
    store: PathBuf,

    /// Acting identity (email)
    #[arg(long, env = "TOEFLOW_ACTOR", global = true)]
    actor: Option<String>,

    /// Display name for the acting identity
    #[arg(long, env = "TOEFLOW_ACTOR_NAME", global = true)]
    actor_name: Option<String>,

    /// GST rate applied to fee totals
    #[arg(long, env = "TOEFLOW_TAX_RATE", global = true)]
    tax_rate: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a draft document
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        client: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Show one document
    Show { id: String },
    /// List documents, newest first
    List,
    /// Edit a draft or ready-to-send document
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a document and its review requests
    Delete { id: String },
    /// Send a draft out for internal review
    RequestReview {
        id: String,
        /// Reviewer as `email` or `email:Name`; repeatable
        #[arg(long = "reviewer", required = true, value_parser = parse_reviewer)]
        reviewers: Vec<Actor>,
    },
    /// List reviews awaiting the acting identity, or every review of a document
    Pending {
        #[arg(long)]
        document: Option<String>,
    },
    /// Edit a copy of the document and submit the review
    Review {
        review_id: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Remove the fee item at this index; repeatable
        #[arg(long = "remove-fee")]
        remove_fees: Vec<usize>,
        #[arg(long, default_value = "")]
        comments: String,
    },
    /// Show completed review feedback with word-level diffs
    Feedback { id: String },
    /// Merge the latest reviewer changes and mark ready to send
    Accept { id: String },
    /// Discard reviewer changes and return to draft
    Discard { id: String },
    /// Mark a ready document as sent to the client
    Send { id: String },
    /// Record the client's signature
    Sign { id: String },
    /// Record that the offer expired
    Expire { id: String },
    /// Word-level diff of two strings
    Diff { original: String, modified: String },
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "TOEFLOW_LISTEN", default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

/// Reviewable field overrides shared by `create`, `edit` and `review`.
#[derive(Args, Default)]
struct FieldArgs {
    #[arg(long)]
    scope: Option<String>,
    #[arg(long)]
    assumptions: Option<String>,
    #[arg(long)]
    exclusions: Option<String>,
    /// Fee item as `description=cost`; repeatable, appended in order
    #[arg(long = "fee", value_parser = parse_fee)]
    fees: Vec<FeeLineItem>,
}

impl FieldArgs {
    fn is_empty(&self) -> bool {
        self.scope.is_none()
            && self.assumptions.is_none()
            && self.exclusions.is_none()
            && self.fees.is_empty()
    }

    fn apply_to(self, fields: &mut ReviewableFields) {
        if let Some(scope) = self.scope {
            fields.scope_of_work = scope;
        }
        if let Some(assumptions) = self.assumptions {
            fields.assumptions = assumptions;
        }
        if let Some(exclusions) = self.exclusions {
            fields.exclusions = exclusions;
        }
        fields.fee_structure.extend(self.fees);
    }
}

fn parse_fee(s: &str) -> Result<FeeLineItem, String> {
    let (description, cost) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected description=cost, got {s:?}"))?;
    let cost: f64 = cost
        .trim()
        .parse()
        .map_err(|e| format!("invalid cost {cost:?}: {e}"))?;
    Ok(FeeLineItem::new(description.trim(), cost))
}

fn parse_reviewer(s: &str) -> Result<Actor, String> {
    let (email, name) = s.split_once(':').unwrap_or((s, s));
    let email = email.trim();
    if email.is_empty() {
        return Err("reviewer email is empty".into());
    }
    Ok(Actor::new(email, name.trim()))
}

/// The acting identity from `--actor` / `--actor-name`, required only by writes.
struct Identity {
    email: Option<String>,
    name: Option<String>,
}

impl Identity {
    fn require(&self) -> anyhow::Result<Actor> {
        let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
            bail!("this command needs an acting identity: pass --actor or set TOEFLOW_ACTOR");
        };
        let name = self.name.as_deref().unwrap_or(email);
        Ok(Actor::new(email, name))
    }
}

fn config(tax_rate: Option<f64>) -> anyhow::Result<ReviewConfig> {
    match tax_rate {
        Some(rate) => ReviewConfig::with_tax_rate(rate).context("invalid --tax-rate"),
        None => Ok(ReviewConfig::default()),
    }
}

fn open_workflow(store: &Path, config: ReviewConfig) -> anyhow::Result<Workflow<JsonFileStore>> {
    let store = JsonFileStore::open(store)
        .with_context(|| format!("opening store {}", store.display()))?;
    Ok(Workflow::new(store, config).with_notifier(Arc::new(LogNotifier)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let identity = Identity {
        email: cli.actor,
        name: cli.actor_name,
    };

    if let Command::Diff { original, modified } = &cli.command {
        println!("{}", text_diff::to_markup(&text_diff::diff(original, modified)));
        return Ok(());
    }

    let workflow = open_workflow(&cli.store, config(cli.tax_rate)?)?;

    match cli.command {
        Command::Create {
            title,
            client,
            fields: args,
        } => {
            let actor = identity.require()?;
            let mut fields = ReviewableFields::default();
            args.apply_to(&mut fields);
            let draft = NewDocument {
                title,
                client_name: client,
                fields,
            };
            let doc = workflow.create_document(draft, &actor)?;
            display::print_document(&doc);
        }
        Command::Show { id } => {
            display::print_document(&workflow.document(&DocumentId::new(id))?);
        }
        Command::List => {
            display::print_document_list(&workflow.documents(Order::CreatedDesc)?);
        }
        Command::Edit {
            id,
            title,
            client,
            fields: args,
        } => {
            let actor = identity.require()?;
            let id = DocumentId::new(id);
            let fields = if args.is_empty() {
                None
            } else {
                let mut fields = workflow.document(&id)?.fields;
                args.apply_to(&mut fields);
                Some(fields)
            };
            let edit = DocumentEdit {
                title,
                client_name: client,
                fields,
            };
            display::print_document(&workflow.edit_document(&id, edit, &actor)?);
        }
        Command::Delete { id } => {
            let actor = identity.require()?;
            let doc = workflow.delete_document(&DocumentId::new(id), &actor)?;
            println!("Deleted {} ({}).", doc.id, doc.title);
        }
        Command::RequestReview { id, reviewers } => {
            let actor = identity.require()?;
            let fan_out = workflow.request_reviews(&DocumentId::new(id), &reviewers, &actor)?;
            display::print_fan_out(&fan_out);
        }
        Command::Pending { document } => {
            let reviews = match document {
                Some(id) => workflow.reviews_for_document(&DocumentId::new(id))?,
                None => workflow.awaiting_review(&identity.require()?)?,
            };
            display::print_reviews(&reviews);
        }
        Command::Review {
            review_id,
            fields: args,
            mut remove_fees,
            comments,
        } => {
            let actor = identity.require()?;
            let review_id = ReviewId::new(review_id);
            let mut session = workflow.open_session(&review_id, &actor)?;

            // Highest index first so earlier removals don't shift later ones.
            remove_fees.sort_unstable_by(|a, b| b.cmp(a));
            remove_fees.dedup();
            for index in remove_fees {
                session.remove_fee_item(index)?;
            }
            if let Some(scope) = args.scope {
                session.set_scope_of_work(scope)?;
            }
            if let Some(assumptions) = args.assumptions {
                session.set_assumptions(assumptions)?;
            }
            if let Some(exclusions) = args.exclusions {
                session.set_exclusions(exclusions)?;
            }
            for fee in args.fees {
                session.add_fee_item(fee)?;
            }

            let submission = session.submit(comments)?;
            let outcome = workflow.submit_review(&review_id, submission, &actor)?;
            display::print_submit(&outcome);
        }
        Command::Feedback { id } => {
            display::print_feedback(&workflow.feedback(&DocumentId::new(id))?);
        }
        Command::Accept { id } => {
            let actor = identity.require()?;
            display::print_reconciliation(&workflow.accept_review(&DocumentId::new(id), &actor)?);
        }
        Command::Discard { id } => {
            let actor = identity.require()?;
            display::print_reconciliation(&workflow.discard_review(&DocumentId::new(id), &actor)?);
        }
        Command::Send { id } => {
            let actor = identity.require()?;
            display::print_document(&workflow.mark_sent(&DocumentId::new(id), &actor)?);
        }
        Command::Sign { id } => {
            let actor = identity.require()?;
            display::print_document(&workflow.mark_signed(&DocumentId::new(id), &actor)?);
        }
        Command::Expire { id } => {
            let actor = identity.require()?;
            display::print_document(&workflow.mark_expired(&DocumentId::new(id), &actor)?);
        }
        Command::Serve { listen } => {
            let app = toeflow_server::router(Arc::new(workflow));
            let listener = tokio::net::TcpListener::bind(&listen)
                .await
                .with_context(|| format!("binding {listen}"))?;
            info!(listen = %listen, store = %cli.store.display(), "serving toeflow API");
            axum::serve(listener, app).await.context("serving HTTP")?;
        }
        Command::Diff { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_argument_splits_on_last_equals() {
        let fee = parse_fee("Survey = site A=1200.50").unwrap();
        assert_eq!(fee.description, "Survey = site A");
        assert_eq!(fee.cost, 1200.5);
        assert!(parse_fee("no cost").is_err());
        assert!(parse_fee("Survey=lots").is_err());
    }

    #[test]
    fn reviewer_argument_takes_optional_name() {
        let r = parse_reviewer("alice@firm.example:Alice Smith").unwrap();
        assert_eq!(r, Actor::new("alice@firm.example", "Alice Smith"));
        let r = parse_reviewer("bob@firm.example").unwrap();
        assert_eq!(r.name, "bob@firm.example");
        assert!(parse_reviewer(":Nobody").is_err());
    }

    #[test]
    fn identity_is_required_for_writes() {
        let missing = Identity {
            email: Some("  ".into()),
            name: None,
        };
        assert!(missing.require().is_err());
        let present = Identity {
            email: Some("a@firm.example".into()),
            name: None,
        };
        assert_eq!(present.require().unwrap().name, "a@firm.example");
    }

    #[test]
    fn cli_parses_repeated_reviewers() {
        let cli = Cli::try_parse_from([
            "toeflow",
            "request-review",
            "doc-1",
            "--reviewer",
            "a@firm.example",
            "--reviewer",
            "b@firm.example:B",
        ])
        .unwrap();
        let Command::RequestReview { id, reviewers } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(id, "doc-1");
        assert_eq!(reviewers.len(), 2);
    }
}
