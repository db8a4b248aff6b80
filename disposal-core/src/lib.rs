pub mod engine;
pub mod models;
pub mod services;

pub use engine::{
    BatchLoader, DisposalEngine, EngineError, FieldEdit, LoadError, Notification,
    RecomputeRequest, SubmitOutcome,
};
pub use models::*;
pub use services::{
    AssetDirectory, DisposalGateway, DisposalSubmission, ReferenceDataSource, ServiceError,
    SubmitReceipt, Valuation, ValuationRequest, ValuationService,
};
