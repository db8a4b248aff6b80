//! Collaborator contracts for the disposal workflow.
//!
//! Everything the engine needs from the outside world comes through these
//! traits: the asset directory, the valuation service, the disposal
//! submission gateway, and the vendor/location reference lists. Every remote
//! failure is caught at this boundary and surfaced as a [`ServiceError`];
//! nothing propagates past the engine unhandled.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AssetId, AssetSummary, Attachment, Location, Vendor};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Batch asset lookup. Not-found ids are simply omitted from the result;
/// only a wholly failed call is an error.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    async fn fetch_assets(&self, ids: &[AssetId]) -> Result<Vec<AssetSummary>, ServiceError>;
}

/// Inputs to a valuation: the record's disposal date and sale value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub asset_id: AssetId,
    pub discard_date: NaiveDate,
    pub sold_value: Decimal,
}

/// What the valuation service derives for a record. `price_diff` is the
/// service's own figure and is stored alongside, not instead of, the
/// locally derived difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub depreciated_value: Decimal,
    pub price_diff: Decimal,
}

/// Remote valuation rule set. Must be idempotent and side-effect-free; the
/// engine calls it repeatedly as the user edits.
#[async_trait]
pub trait ValuationService: Send + Sync {
    async fn compute_valuation(&self, request: &ValuationRequest)
        -> Result<Valuation, ServiceError>;
}

/// Outbound payload for one record, with names already resolved to ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposalSubmission {
    pub asset_id: AssetId,
    pub discard_date: NaiveDate,
    pub sold_value: Decimal,
    pub vendor_id: Option<i64>,
    pub location_id: Option<i64>,
    pub remarks: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub message: String,
}

/// Persists one disposal server-side. Not idempotent: a retry after an
/// ambiguous network failure may double-submit, so the engine never retries
/// on its own.
#[async_trait]
pub trait DisposalGateway: Send + Sync {
    async fn submit_disposal(
        &self,
        submission: &DisposalSubmission,
    ) -> Result<SubmitReceipt, ServiceError>;
}

/// Read-only vendor and location option lists.
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    async fn fetch_vendors(&self) -> Result<Vec<Vendor>, ServiceError>;
    async fn fetch_locations(&self) -> Result<Vec<Location>, ServiceError>;
}
