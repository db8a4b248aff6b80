use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AssetId, AssetSummary};

/// Largest attachment accepted for a disposal record, in bytes (5 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Where a record stands in the submit lifecycle.
///
/// `Submitting` is transient and exists to make the gateway call exclusive:
/// a record already in flight cannot be submitted a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordPhase {
    /// Discard date or sold value still missing.
    Incomplete,
    /// Valuation succeeded at least once with both inputs present.
    Computed,
    /// A gateway call for this record is in flight.
    Submitting,
}

/// A file pending upload alongside a disposal record. At most one per record;
/// attaching again replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Field-level validation failures. These block submission of the one record
/// they are recorded on and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("sold value {sold} exceeds purchase price {purchase}")]
    SoldValueExceedsPurchase { sold: Decimal, purchase: Decimal },

    #[error("sold value {0} is negative")]
    NegativeSoldValue(Decimal),

    #[error("attachment '{file_name}' is {size} bytes, over the {max} byte limit")]
    AttachmentTooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },
}

/// One asset being discarded or sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposalRecord {
    // Read-only identity, fetched once from the asset directory
    pub asset_id: AssetId,
    pub asset_code: String,
    pub asset_name: String,
    pub purchase_price: Decimal,

    // User-entered disposal fields
    pub discard_date: Option<NaiveDate>,
    pub sold_value: Option<Decimal>,
    pub vendor_name: Option<String>,
    pub location_id: Option<i64>,
    pub remarks: Option<String>,
    pub attachment: Option<Attachment>,

    /// Owned by the valuation service; never hand-edited.
    pub depreciated_value: Option<Decimal>,
    /// The valuation service's own price difference. Kept separate from
    /// `price_difference`; the two are not reconciled.
    pub valuation_price_diff: Option<Decimal>,
    /// Local derivation: sold value minus purchase price.
    pub price_difference: Option<Decimal>,

    pub phase: RecordPhase,
    /// Validation failure on the sold-value field, if any. The raw entered
    /// value is kept so the user sees what they typed.
    pub sold_value_error: Option<ValidationError>,
    /// Monotonic counter for valuation requests issued for this record.
    /// Only a response carrying the latest value may be applied.
    pub recompute_seq: u64,
}

impl DisposalRecord {
    /// Seed a record from a directory lookup; all disposal fields start empty.
    pub fn from_summary(summary: AssetSummary) -> Self {
        Self {
            asset_id: summary.id,
            asset_code: summary.code,
            asset_name: summary.name,
            purchase_price: summary.purchase_price,
            discard_date: None,
            sold_value: None,
            vendor_name: None,
            location_id: None,
            remarks: None,
            attachment: None,
            depreciated_value: None,
            valuation_price_diff: None,
            price_difference: None,
            phase: RecordPhase::Incomplete,
            sold_value_error: None,
            recompute_seq: 0,
        }
    }

    /// Re-derive the local price difference from the current operands.
    pub fn refresh_price_difference(&mut self) {
        self.price_difference = self.sold_value.map(|sold| sold - self.purchase_price);
    }

    /// Both inputs the valuation service needs are present.
    pub fn has_disposal_inputs(&self) -> bool {
        self.discard_date.is_some() && self.sold_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn record() -> DisposalRecord {
        DisposalRecord::from_summary(AssetSummary {
            id: AssetId::from("A1"),
            code: "AST-001".to_string(),
            name: "Forklift".to_string(),
            purchase_price: dec!(1000.00),
        })
    }

    #[test]
    fn from_summary_leaves_disposal_fields_empty() {
        let r = record();

        assert_eq!(r.discard_date, None);
        assert_eq!(r.sold_value, None);
        assert_eq!(r.depreciated_value, None);
        assert_eq!(r.price_difference, None);
        assert_eq!(r.phase, RecordPhase::Incomplete);
        assert_eq!(r.recompute_seq, 0);
    }

    #[test]
    fn refresh_price_difference_uses_sold_minus_purchase() {
        let mut r = record();
        r.sold_value = Some(dec!(800.00));

        r.refresh_price_difference();

        assert_eq!(r.price_difference, Some(dec!(-200.00)));
    }

    #[test]
    fn refresh_price_difference_clears_when_sold_value_absent() {
        let mut r = record();
        r.sold_value = Some(dec!(800.00));
        r.refresh_price_difference();

        r.sold_value = None;
        r.refresh_price_difference();

        assert_eq!(r.price_difference, None);
    }

    #[test]
    fn has_disposal_inputs_requires_both_fields() {
        let mut r = record();
        assert!(!r.has_disposal_inputs());

        r.sold_value = Some(dec!(800.00));
        assert!(!r.has_disposal_inputs());

        r.discard_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 10);
        assert!(r.has_disposal_inputs());
    }
}
