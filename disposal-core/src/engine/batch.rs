//! The disposal batch engine.
//!
//! Owns the working set for one workflow instance and routes every mutation:
//! which field edits trigger a remote valuation, which derive locally, what
//! blocks a submit, and how the batch shrinks as records go out one by one.
//!
//! # Field routing
//!
//! | Field edited  | Local effect                          | Remote trigger |
//! |---------------|---------------------------------------|----------------|
//! | sold value    | validate, re-derive price difference  | yes, if valid and date present |
//! | discard date  | store                                 | yes, if sold value present |
//! | anything else | store                                 | never          |
//!
//! # Valuation races
//!
//! The host may let valuation calls for different records overlap freely,
//! but per record only the latest issued request is authoritative. Each
//! [`RecomputeRequest`] carries a monotonic sequence number; a response is
//! applied only if its record is still in the set and its sequence number is
//! still the latest (last write wins by issuance order, not arrival order).
//!
//! # Partial failure
//!
//! Each submission is independent. A failed gateway call leaves that record
//! in place for retry and touches nothing else in the batch.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{BatchLoader, LoadError};
use crate::models::{
    AssetId, Attachment, DisposalRecord, RecordPhase, ReferenceCache, ValidationError, WorkingSet,
    MAX_ATTACHMENT_BYTES,
};
use crate::services::{
    AssetDirectory, DisposalGateway, DisposalSubmission, ReferenceDataSource, ServiceError,
    Valuation, ValuationRequest, ValuationService,
};

/// Errors returned by engine operations. All of them are scoped to one
/// record; none of them invalidate the rest of the batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("asset '{0}' is not in the working set")]
    UnknownAsset(AssetId),

    #[error("asset '{asset_id}' failed validation: {source}")]
    Validation {
        asset_id: AssetId,
        source: ValidationError,
    },

    #[error("asset '{0}' is missing a discard date or sold value")]
    MissingDisposalFields(AssetId),

    #[error("asset '{0}' already has a submission in flight")]
    SubmissionInFlight(AssetId),

    #[error("submission failed for asset '{asset_id}': {source}")]
    Submission {
        asset_id: AssetId,
        source: ServiceError,
    },
}

/// A single field write routed through [`DisposalEngine::edit_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    DiscardDate(Option<NaiveDate>),
    SoldValue(Option<Decimal>),
    VendorName(Option<String>),
    LocationId(Option<i64>),
    Remarks(Option<String>),
}

/// A pending valuation call the host should dispatch, either through
/// [`DisposalEngine::recompute`] or by calling the service itself and
/// feeding the outcome to [`DisposalEngine::apply_valuation`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeRequest {
    pub asset_id: AssetId,
    pub seq: u64,
    pub discard_date: NaiveDate,
    pub sold_value: Decimal,
}

/// Non-fatal events raised outside a direct call path, for the host to
/// surface as discrete, non-blocking messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    RecomputeFailed { asset_id: AssetId, reason: String },
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub message: String,
    pub remaining: usize,
    /// The record now in focus, if any are left.
    pub next_focus: Option<AssetId>,
}

impl SubmitOutcome {
    /// The working set is empty: the host should leave the workflow.
    pub fn workflow_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// State machine for one discard/sell workflow instance.
///
/// Collaborator handles are passed in explicitly; the engine reads no
/// ambient configuration. One engine drives one working set, single actor;
/// it never mutates the set from more than one call at a time.
pub struct DisposalEngine {
    working_set: WorkingSet,
    reference: ReferenceCache,
    valuation: Arc<dyn ValuationService>,
    gateway: Arc<dyn DisposalGateway>,
    notifications: Vec<Notification>,
    max_attachment_bytes: usize,
}

impl DisposalEngine {
    pub fn new(
        working_set: WorkingSet,
        reference: ReferenceCache,
        valuation: Arc<dyn ValuationService>,
        gateway: Arc<dyn DisposalGateway>,
    ) -> Self {
        Self {
            working_set,
            reference,
            valuation,
            gateway,
            notifications: Vec::new(),
            max_attachment_bytes: MAX_ATTACHMENT_BYTES,
        }
    }

    /// Override the attachment size cap.
    pub fn with_max_attachment_bytes(mut self, max: usize) -> Self {
        self.max_attachment_bytes = max;
        self
    }

    /// Convenience constructor: resolve the batch and load reference data,
    /// then build the engine. Any failure here is fatal to the workflow.
    pub async fn start(
        directory: &dyn AssetDirectory,
        reference_source: &dyn ReferenceDataSource,
        valuation: Arc<dyn ValuationService>,
        gateway: Arc<dyn DisposalGateway>,
        asset_ids: &[AssetId],
    ) -> Result<Self, LoadError> {
        let working_set = BatchLoader::load(directory, asset_ids).await?;
        let reference = ReferenceCache::load(reference_source)
            .await
            .map_err(LoadError::Reference)?;
        info!(batch_size = working_set.len(), "disposal workflow started");
        Ok(Self::new(working_set, reference, valuation, gateway))
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn reference(&self) -> &ReferenceCache {
        &self.reference
    }

    pub fn record(&self, id: &AssetId) -> Option<&DisposalRecord> {
        self.working_set.get(id)
    }

    pub fn focused_record(&self) -> Option<&DisposalRecord> {
        self.working_set.focused_record()
    }

    pub fn set_focus(&mut self, id: &AssetId) -> bool {
        self.working_set.set_focus(id)
    }

    pub fn advance_focus(&mut self) {
        self.working_set.advance_focus();
    }

    /// Take all queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Apply one field write to one record.
    ///
    /// Sold-value edits are validated against the purchase price: on a
    /// violation the raw value is still stored (so the user sees what they
    /// typed), a field-level error is recorded, and the remote trigger for
    /// this edit is suppressed. The local price difference is re-derived on
    /// every sold-value write, valid or not.
    ///
    /// Returns a [`RecomputeRequest`] when this edit makes the record due
    /// for valuation: a date or sold-value write with both inputs present
    /// and no validation error.
    pub fn edit_field(
        &mut self,
        id: &AssetId,
        edit: FieldEdit,
    ) -> Result<Option<RecomputeRequest>, EngineError> {
        let record = self
            .working_set
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownAsset(id.clone()))?;

        let mut valuation_trigger = false;
        match edit {
            FieldEdit::SoldValue(value) => {
                record.sold_value = value;
                record.sold_value_error = match value {
                    Some(v) if v < Decimal::ZERO => Some(ValidationError::NegativeSoldValue(v)),
                    Some(v) if v > record.purchase_price => {
                        Some(ValidationError::SoldValueExceedsPurchase {
                            sold: v,
                            purchase: record.purchase_price,
                        })
                    }
                    _ => None,
                };
                record.refresh_price_difference();
                if let Some(err) = &record.sold_value_error {
                    debug!(asset_id = %id, %err, "sold value failed validation; remote trigger suppressed");
                } else {
                    valuation_trigger = true;
                }
            }
            FieldEdit::DiscardDate(date) => {
                record.discard_date = date;
                valuation_trigger = true;
            }
            FieldEdit::VendorName(vendor) => record.vendor_name = vendor,
            FieldEdit::LocationId(location) => record.location_id = location,
            FieldEdit::Remarks(remarks) => record.remarks = remarks,
        }

        if !record.has_disposal_inputs() {
            record.phase = RecordPhase::Incomplete;
        }

        if valuation_trigger && record.sold_value_error.is_none() {
            if let (Some(discard_date), Some(sold_value)) = (record.discard_date, record.sold_value)
            {
                record.recompute_seq += 1;
                return Ok(Some(RecomputeRequest {
                    asset_id: id.clone(),
                    seq: record.recompute_seq,
                    discard_date,
                    sold_value,
                }));
            }
        }

        Ok(None)
    }

    /// Store a pending attachment on a record, replacing any previous one.
    /// Oversized files are rejected without touching the existing attachment.
    pub fn attach_file(&mut self, id: &AssetId, attachment: Attachment) -> Result<(), EngineError> {
        let record = self
            .working_set
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownAsset(id.clone()))?;

        if attachment.size() > self.max_attachment_bytes {
            return Err(EngineError::Validation {
                asset_id: id.clone(),
                source: ValidationError::AttachmentTooLarge {
                    file_name: attachment.file_name,
                    size: attachment.bytes.len(),
                    max: self.max_attachment_bytes,
                },
            });
        }

        record.attachment = Some(attachment);
        Ok(())
    }

    /// Dispatch a pending valuation call and apply the outcome through the
    /// staleness guard. Returns true if the response was applied.
    pub async fn recompute(&mut self, request: RecomputeRequest) -> bool {
        let outcome = self
            .valuation
            .compute_valuation(&ValuationRequest {
                asset_id: request.asset_id.clone(),
                discard_date: request.discard_date,
                sold_value: request.sold_value,
            })
            .await;
        self.apply_valuation(&request.asset_id, request.seq, outcome)
    }

    /// Merge a valuation outcome into its record.
    ///
    /// The guard: a response for a record no longer in the set, or carrying
    /// anything but the record's latest sequence number, is discarded. A
    /// failed valuation leaves the previous derived values intact and queues
    /// a notification; the record stays editable and submittable.
    pub fn apply_valuation(
        &mut self,
        id: &AssetId,
        seq: u64,
        outcome: Result<Valuation, ServiceError>,
    ) -> bool {
        let Some(record) = self.working_set.get_mut(id) else {
            debug!(asset_id = %id, "valuation response for a departed record; discarded");
            return false;
        };
        if seq != record.recompute_seq {
            debug!(
                asset_id = %id,
                seq,
                latest = record.recompute_seq,
                "stale valuation response discarded"
            );
            return false;
        }

        match outcome {
            Ok(valuation) => {
                record.depreciated_value = Some(valuation.depreciated_value);
                record.valuation_price_diff = Some(valuation.price_diff);
                if record.phase != RecordPhase::Submitting && record.has_disposal_inputs() {
                    record.phase = RecordPhase::Computed;
                }
                debug!(asset_id = %id, depreciated = %valuation.depreciated_value, "valuation applied");
                true
            }
            Err(err) => {
                warn!(asset_id = %id, %err, "valuation failed; previous derived values kept");
                self.notifications.push(Notification::RecomputeFailed {
                    asset_id: id.clone(),
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    /// Submit one record to the gateway.
    ///
    /// Preconditions: no validation error, both disposal inputs present, no
    /// submission already in flight for this record. A validation failure
    /// aborts before the gateway is called.
    ///
    /// On success the record leaves the working set for good and the focus
    /// pointer is re-clamped; [`SubmitOutcome::workflow_complete`] tells the
    /// host when the batch is done. On failure the record stays, rolled back
    /// to its pre-submit phase, and the rest of the batch is untouched.
    pub async fn submit(&mut self, id: &AssetId) -> Result<SubmitOutcome, EngineError> {
        let record = self
            .working_set
            .get(id)
            .ok_or_else(|| EngineError::UnknownAsset(id.clone()))?;

        if record.phase == RecordPhase::Submitting {
            return Err(EngineError::SubmissionInFlight(id.clone()));
        }
        if let Some(err) = &record.sold_value_error {
            return Err(EngineError::Validation {
                asset_id: id.clone(),
                source: err.clone(),
            });
        }
        let (Some(discard_date), Some(sold_value)) = (record.discard_date, record.sold_value)
        else {
            return Err(EngineError::MissingDisposalFields(id.clone()));
        };

        let vendor_id = record.vendor_name.as_deref().and_then(|name| {
            let resolved = self.reference.resolve_vendor(name);
            if resolved.is_none() {
                warn!(asset_id = %id, vendor = name, "vendor name did not resolve; submitting without a vendor id");
            }
            resolved
        });

        let submission = DisposalSubmission {
            asset_id: id.clone(),
            discard_date,
            sold_value,
            vendor_id,
            location_id: record.location_id,
            remarks: record.remarks.clone(),
            attachment: record.attachment.clone(),
        };
        let had_valuation = record.depreciated_value.is_some();

        if let Some(record) = self.working_set.get_mut(id) {
            record.phase = RecordPhase::Submitting;
        }

        match self.gateway.submit_disposal(&submission).await {
            Ok(receipt) => {
                self.working_set.remove(id);
                info!(
                    asset_id = %id,
                    remaining = self.working_set.len(),
                    "disposal submitted"
                );
                Ok(SubmitOutcome {
                    message: receipt.message,
                    remaining: self.working_set.len(),
                    next_focus: self.working_set.focused_id().cloned(),
                })
            }
            Err(source) => {
                if let Some(record) = self.working_set.get_mut(id) {
                    record.phase = if had_valuation && record.has_disposal_inputs() {
                        RecordPhase::Computed
                    } else {
                        RecordPhase::Incomplete
                    };
                }
                warn!(asset_id = %id, %source, "submission failed; record kept for retry");
                Err(EngineError::Submission {
                    asset_id: id.clone(),
                    source,
                })
            }
        }
    }
}
