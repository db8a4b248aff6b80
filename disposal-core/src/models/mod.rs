mod asset;
mod disposal_record;
mod reference;
mod working_set;

pub use asset::{AssetId, AssetSummary};
pub use disposal_record::{
    Attachment, DisposalRecord, RecordPhase, ValidationError, MAX_ATTACHMENT_BYTES,
};
pub use reference::{Location, ReferenceCache, Vendor};
pub use working_set::WorkingSet;
