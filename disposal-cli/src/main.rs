use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use disposal_core::{AssetId, Attachment, DisposalEngine, FieldEdit, Notification};
use disposal_http::BackOfficeClient;
use tracing::warn;

mod logging;
mod plan;

use plan::DisposalPlan;

/// Run a multi-asset disposal batch against the back office.
///
/// Reads a disposal plan CSV (one row per asset), loads the batch, applies
/// each row's fields, lets the valuation service derive the depreciated
/// value, and submits the records one at a time. A failed submission leaves
/// that record behind and moves on; the summary at the end lists every
/// outcome.
#[derive(Parser, Debug)]
#[command(name = "disposal-runner")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the disposal plan CSV
    #[arg(short, long)]
    plan: PathBuf,

    /// Base URL of the back-office REST API
    #[arg(short, long, default_value = "http://localhost:8080/api/")]
    base_url: String,

    /// Override the attachment size cap, in bytes
    #[arg(long)]
    max_attachment_bytes: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_default_logging();
    let args = Args::parse();

    let file = File::open(&args.plan)
        .with_context(|| format!("failed to open plan: {}", args.plan.display()))?;
    let rows = DisposalPlan::parse(file)
        .with_context(|| format!("failed to parse plan: {}", args.plan.display()))?;

    println!("Loaded {} plan rows from {}", rows.len(), args.plan.display());

    let client = Arc::new(
        BackOfficeClient::new(&args.base_url)
            .with_context(|| format!("failed to build client for {}", args.base_url))?,
    );

    let asset_ids: Vec<AssetId> = rows
        .iter()
        .map(|row| AssetId::from(row.asset_id.as_str()))
        .collect();

    let mut engine = DisposalEngine::start(
        client.as_ref(),
        client.as_ref(),
        client.clone(),
        client.clone(),
        &asset_ids,
    )
    .await
    .context("failed to start the disposal workflow")?;
    if let Some(max) = args.max_attachment_bytes {
        engine = engine.with_max_attachment_bytes(max);
    }

    println!("Batch loaded: {} assets", engine.working_set().len());

    let mut submitted = 0usize;
    let mut failed: Vec<(String, String)> = Vec::new();
    let mut skipped: Vec<(String, String)> = Vec::new();

    for row in &rows {
        let id = AssetId::from(row.asset_id.as_str());
        if !engine.working_set().contains(&id) {
            skipped.push((
                row.asset_id.clone(),
                "not in the working set (unresolved or already submitted)".to_string(),
            ));
            continue;
        }
        engine.set_focus(&id);

        let edits = [
            FieldEdit::SoldValue(row.sold_value),
            FieldEdit::DiscardDate(row.discard_date),
            FieldEdit::VendorName(row.vendor.clone()),
            FieldEdit::LocationId(row.location_id),
            FieldEdit::Remarks(row.remarks.clone()),
        ];
        let mut pending = None;
        for edit in edits {
            match engine.edit_field(&id, edit) {
                Ok(Some(request)) => pending = Some(request),
                Ok(None) => {}
                Err(err) => warn!(asset_id = %id, %err, "field edit rejected"),
            }
        }
        if let Some(request) = pending {
            engine.recompute(request).await;
        }

        if let Some(path) = &row.attachment {
            match read_attachment(Path::new(path)) {
                Ok(attachment) => {
                    if let Err(err) = engine.attach_file(&id, attachment) {
                        warn!(asset_id = %id, %err, "attachment rejected");
                    }
                }
                Err(err) => warn!(asset_id = %id, %err, "attachment unreadable; submitting without it"),
            }
        }

        match engine.submit(&id).await {
            Ok(outcome) => {
                submitted += 1;
                println!("  submitted {}: {}", row.asset_id, outcome.message);
                if outcome.workflow_complete() {
                    println!("All records submitted; workflow complete.");
                }
            }
            Err(err) => {
                warn!(asset_id = %id, %err, "submission failed; record kept for retry");
                failed.push((row.asset_id.clone(), err.to_string()));
            }
        }

        for notification in engine.drain_notifications() {
            match notification {
                Notification::RecomputeFailed { asset_id, reason } => {
                    println!("  note: valuation failed for {asset_id}: {reason}");
                }
            }
        }
    }

    println!();
    println!(
        "Done: {} submitted, {} failed, {} skipped, {} left in the working set.",
        submitted,
        failed.len(),
        skipped.len(),
        engine.working_set().len()
    );
    for (asset_id, reason) in &failed {
        println!("  failed  {asset_id}: {reason}");
    }
    for (asset_id, reason) in &skipped {
        println!("  skipped {asset_id}: {reason}");
    }

    Ok(())
}

fn read_attachment(path: &Path) -> Result<Attachment> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment { file_name, bytes })
}
