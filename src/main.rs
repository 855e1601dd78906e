use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

use donorflow::config::{config, DonorflowConfig};
use donorflow::store::{FileStore, NotificationStore, RecordStore};
use donorflow::telemetry::{create_workflow_span, init_telemetry};
use donorflow::workflow::status::ALL_STATUSES;
use donorflow::workflow::{
    normalize_record, Action, Actor, ApplicationRecord, DocumentDecision, MedicalDocument,
    RecordMutator, RequestStatus, Role,
};

#[derive(Parser)]
#[command(name = "donorflow")]
#[command(about = "Approval workflow engine for donor and recipient applications")]
#[command(long_about = "Donorflow tracks donor and recipient applications through the \
                       multi-stage approval pipeline: doctor review, admin confirmation or \
                       override, medical evaluation, and final decision. Every transition is \
                       audited and notifies the affected users.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default donorflow.toml to the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Normalize and import legacy JSON records
    Ingest {
        /// Path to a JSON array of legacy application documents
        file: PathBuf,
    },
    /// Create a new application record
    Seed {
        /// Applicant user ID
        #[arg(long)]
        applicant: String,
        /// Applicant display name
        #[arg(long)]
        name: String,
        /// Create a recipient application instead of a donor one
        #[arg(long)]
        recipient: bool,
    },
    /// Show one application record
    Show {
        record_id: String,
    },
    /// Apply a workflow action to a record
    Apply {
        record_id: String,
        /// Acting role: doctor, admin, donor, or recipient
        #[arg(long)]
        role: String,
        /// Action: approve, reject, initial-approve, initial-reject, needs-info, submit
        #[arg(long)]
        action: String,
        /// Acting user ID
        #[arg(long)]
        actor: String,
        /// Free-text justification (mandatory for rejections and overrides)
        #[arg(long)]
        reason: Option<String>,
    },
    /// Advance every record waiting on the automatic transition
    AutoAdvance,
    /// Print the approval history of a record
    History {
        record_id: String,
    },
    /// List notifications addressed to a user
    Notifications {
        user_id: String,
        /// Mark the listed notifications as read
        #[arg(long)]
        mark_read: bool,
    },
    /// Register a doctor's medical document for admin review
    UploadDoc {
        /// Application record under evaluation
        #[arg(long)]
        record: String,
        /// Uploading doctor's user ID
        #[arg(long)]
        doctor: String,
        /// Medical fitness verdict
        #[arg(long)]
        fit: bool,
    },
    /// Record an admin decision on a medical document
    ReviewDoc {
        document_id: String,
        /// Decision: approve or reject
        #[arg(long)]
        decision: String,
        /// Acting admin's user ID
        #[arg(long)]
        actor: String,
        /// Review note (mandatory for rejections)
        #[arg(long)]
        note: Option<String>,
    },
    /// Show how many records sit at each pipeline status
    Status,
}

fn main() -> Result<()> {
    if config()?.observability.tracing_enabled {
        init_telemetry()?;
    }
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Init { force } => init_command(force),
        Commands::Ingest { file } => runtime.block_on(ingest_command(file)),
        Commands::Seed {
            applicant,
            name,
            recipient,
        } => runtime.block_on(seed_command(applicant, name, recipient)),
        Commands::Show { record_id } => runtime.block_on(show_command(record_id)),
        Commands::Apply {
            record_id,
            role,
            action,
            actor,
            reason,
        } => runtime.block_on(apply_command(record_id, role, action, actor, reason)),
        Commands::AutoAdvance => runtime.block_on(auto_advance_command()),
        Commands::History { record_id } => runtime.block_on(history_command(record_id)),
        Commands::Notifications { user_id, mark_read } => {
            runtime.block_on(notifications_command(user_id, mark_read))
        }
        Commands::UploadDoc {
            record,
            doctor,
            fit,
        } => runtime.block_on(upload_doc_command(record, doctor, fit)),
        Commands::ReviewDoc {
            document_id,
            decision,
            actor,
            note,
        } => runtime.block_on(review_doc_command(document_id, decision, actor, note)),
        Commands::Status => runtime.block_on(status_command()),
    }
}

async fn open_store() -> Result<Arc<FileStore>> {
    let config = config()?;
    let store = FileStore::open(config.store.data_directory.clone()).await?;
    Ok(Arc::new(store))
}

fn mutator_over(store: &Arc<FileStore>) -> RecordMutator {
    RecordMutator::new(store.clone(), store.clone(), store.clone())
}

fn init_command(force: bool) -> Result<()> {
    let path = Path::new("donorflow.toml");
    if path.exists() && !force {
        return Err(anyhow!(
            "donorflow.toml already exists (use --force to overwrite)"
        ));
    }
    DonorflowConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to donorflow.toml");
    Ok(())
}

async fn ingest_command(file: PathBuf) -> Result<()> {
    let store = open_store().await?;
    let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let documents: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

    let mut imported = 0usize;
    for raw in &documents {
        let record = normalize_record(raw)
            .with_context(|| format!("normalizing record {imported} of {}", documents.len()))?;
        store.insert_record(&record).await?;
        imported += 1;
    }
    println!("Imported {imported} records from {}", file.display());
    Ok(())
}

async fn seed_command(applicant: String, name: String, recipient: bool) -> Result<()> {
    let store = open_store().await?;
    let id = donorflow::generate_correlation_id();
    let record = if recipient {
        ApplicationRecord::new_recipient(id.clone(), applicant, name)
    } else {
        ApplicationRecord::new_donor(id.clone(), applicant, name)
    };
    store.insert_record(&record).await?;
    println!("Created application record {id}");
    Ok(())
}

async fn show_command(record_id: String) -> Result<()> {
    let store = open_store().await?;
    let record = store
        .get_record(&record_id)
        .await?
        .ok_or_else(|| anyhow!("record {record_id} not found"))?;
    println!(
        "{} [{} / {}]",
        record.applicant_name,
        record.request_status.display(),
        record.request_status.color_class()
    );
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn apply_command(
    record_id: String,
    role: String,
    action: String,
    actor_id: String,
    reason: Option<String>,
) -> Result<()> {
    let store = open_store().await?;
    let mutator = mutator_over(&store);

    let role: Role = role.parse().map_err(|e| anyhow!("{e}"))?;
    let action: Action = action.parse().map_err(|e| anyhow!("{e}"))?;
    let actor = Actor::new(actor_id, role);

    let correlation_id = donorflow::generate_correlation_id();
    let span = create_workflow_span(
        "apply",
        Some(&record_id),
        Some(&actor.id),
        Some(&correlation_id),
    );
    let outcome = mutator
        .apply(&record_id, action, &actor, reason.as_deref())
        .instrument(span)
        .await?;
    if outcome.changed {
        println!(
            "{record_id}: {} -> {}",
            outcome.previous_status, outcome.new_status
        );
    } else {
        println!(
            "{record_id}: no transition for {role} {action} at {}",
            outcome.previous_status
        );
    }

    // A doctor's initial approval queues straight up for admin review unless
    // the sweep is configured to handle it.
    if config()?.workflow.auto_advance_on_apply
        && outcome.new_status == RequestStatus::InitialDoctorApproved
    {
        let auto = mutator.apply_auto(&record_id).await?;
        if auto.changed {
            println!(
                "{record_id}: {} -> {} (automatic)",
                auto.previous_status, auto.new_status
            );
        }
    }
    Ok(())
}

async fn auto_advance_command() -> Result<()> {
    let store = open_store().await?;
    let mutator = mutator_over(&store);

    let waiting = store
        .records_with_status(RequestStatus::InitialDoctorApproved)
        .await?;
    if waiting.is_empty() {
        println!("No records waiting on the automatic advance");
        return Ok(());
    }
    for record in waiting {
        let outcome = mutator.apply_auto(&record.id).await?;
        println!(
            "{}: {} -> {} (automatic)",
            record.id, outcome.previous_status, outcome.new_status
        );
    }
    Ok(())
}

async fn history_command(record_id: String) -> Result<()> {
    let store = open_store().await?;
    let history = store.history_for(&record_id).await?;
    if history.is_empty() {
        println!("No approval history for {record_id}");
        return Ok(());
    }
    for entry in history {
        let actor = entry.actor_id.as_deref().unwrap_or("automatic");
        let mut line = format!(
            "{} {} -> {} by {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.previous_status,
            entry.new_status,
            actor
        );
        if entry.is_override {
            line.push_str(" [override]");
        }
        if entry.is_final_decision {
            line.push_str(" [final]");
        }
        if let Some(reason) = &entry.reason {
            line.push_str(&format!(" - {reason}"));
        }
        println!("{line}");
    }
    Ok(())
}

async fn notifications_command(user_id: String, mark_read: bool) -> Result<()> {
    let store = open_store().await?;
    let notifications = store.notifications_for(&user_id).await?;
    if notifications.is_empty() {
        println!("No notifications for {user_id}");
        return Ok(());
    }
    for notification in notifications {
        let marker = if notification.read { " " } else { "*" };
        println!(
            "{marker} [{}] {}: {}",
            notification.created_at.format("%Y-%m-%d %H:%M"),
            notification.title,
            notification.message
        );
        if mark_read && !notification.read {
            store.mark_read(&notification.id).await?;
        }
    }
    Ok(())
}

async fn upload_doc_command(record: String, doctor: String, fit: bool) -> Result<()> {
    let store = open_store().await?;
    let document = MedicalDocument::new(record, doctor, fit);
    donorflow::store::DocumentStore::insert_document(store.as_ref(), &document).await?;
    println!("Registered medical document {}", document.id);
    Ok(())
}

async fn review_doc_command(
    document_id: String,
    decision: String,
    actor_id: String,
    note: Option<String>,
) -> Result<()> {
    let store = open_store().await?;
    let mutator = mutator_over(&store);

    let decision = match decision.as_str() {
        "approve" => DocumentDecision::Approve,
        "reject" => DocumentDecision::Reject,
        other => return Err(anyhow!("unrecognized decision: {other:?}")),
    };
    let actor = Actor::new(actor_id, Role::Admin);

    let status = mutator
        .review_document(&document_id, decision, &actor, note.as_deref())
        .await?;
    println!("{document_id}: {status}");
    Ok(())
}

async fn status_command() -> Result<()> {
    let store = open_store().await?;
    for status in ALL_STATUSES {
        let count = store.records_with_status(status).await?.len();
        if count > 0 {
            println!("{:>4}  {}", count, status.display());
        }
    }
    Ok(())
}
