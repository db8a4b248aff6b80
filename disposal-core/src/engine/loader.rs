use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::models::{AssetId, DisposalRecord, WorkingSet};
use crate::services::{AssetDirectory, ServiceError};

/// Errors that can occur when resolving a batch of asset ids into a working
/// set. All of them are fatal: the workflow never starts on partial data.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The caller asked for a batch with zero asset ids. Surfaced as its own
    /// state so the host shows "nothing selected" rather than "all done".
    #[error("no assets selected for disposal")]
    NothingSelected,

    /// Every requested id failed to resolve. Distinct from an empty working
    /// set, which would read as a completed workflow.
    #[error("none of the requested assets could be resolved")]
    NoAssetsResolved,

    #[error("asset lookup failed: {0}")]
    Directory(#[from] ServiceError),

    #[error("reference data load failed: {0}")]
    Reference(ServiceError),
}

/// Resolves a batch of asset ids into the initial working set.
pub struct BatchLoader;

impl BatchLoader {
    /// Fetch the requested assets in one directory call and seed a disposal
    /// record for each, disposal fields empty.
    ///
    /// Input ids are de-duplicated first, preserving first-occurrence order,
    /// so the working set's uniqueness invariant holds regardless of the
    /// caller. A short directory result shrinks the batch (missing ids are
    /// logged); a wholly failed call or a batch where nothing resolved is
    /// fatal.
    pub async fn load<D: AssetDirectory + ?Sized>(
        directory: &D,
        asset_ids: &[AssetId],
    ) -> Result<WorkingSet, LoadError> {
        if asset_ids.is_empty() {
            return Err(LoadError::NothingSelected);
        }

        let mut seen = HashSet::new();
        let requested: Vec<AssetId> = asset_ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let summaries = directory.fetch_assets(&requested).await?;

        let mut records = Vec::with_capacity(requested.len());
        let mut resolved = HashSet::new();
        for summary in summaries {
            if !requested.contains(&summary.id) {
                warn!(asset_id = %summary.id, "directory returned an asset that was not requested; dropping");
                continue;
            }
            if !resolved.insert(summary.id.clone()) {
                warn!(asset_id = %summary.id, "directory returned a duplicate asset; keeping the first");
                continue;
            }
            records.push(DisposalRecord::from_summary(summary));
        }

        for id in &requested {
            if !resolved.contains(id) {
                warn!(asset_id = %id, "asset not found in directory; excluded from batch");
            }
        }

        if records.is_empty() {
            return Err(LoadError::NoAssetsResolved);
        }

        // Directory responses are unordered; restore batch input order.
        records.sort_by_key(|r| {
            requested
                .iter()
                .position(|id| id == &r.asset_id)
                .unwrap_or(usize::MAX)
        });

        Ok(WorkingSet::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::AssetSummary;

    /// Directory fake returning a canned response or a canned failure.
    struct FakeDirectory {
        summaries: Vec<AssetSummary>,
        fail: bool,
    }

    impl FakeDirectory {
        fn with(summaries: Vec<AssetSummary>) -> Self {
            Self {
                summaries,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                summaries: vec![],
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AssetDirectory for FakeDirectory {
        async fn fetch_assets(&self, ids: &[AssetId]) -> Result<Vec<AssetSummary>, ServiceError> {
            if self.fail {
                return Err(ServiceError::Network("connection refused".to_string()));
            }
            Ok(self
                .summaries
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect())
        }
    }

    fn summary(id: &str, price: rust_decimal::Decimal) -> AssetSummary {
        AssetSummary {
            id: AssetId::from(id),
            code: format!("AST-{id}"),
            name: format!("Asset {id}"),
            purchase_price: price,
        }
    }

    #[tokio::test]
    async fn load_builds_records_in_input_order() {
        let directory = FakeDirectory::with(vec![
            summary("A2", dec!(500.00)),
            summary("A1", dec!(1000.00)),
        ]);

        let set = BatchLoader::load(&directory, &["A1".into(), "A2".into()])
            .await
            .expect("load should succeed");

        assert_eq!(set.len(), 2);
        let codes: Vec<&str> = set.iter().map(|r| r.asset_code.as_str()).collect();
        assert_eq!(codes, vec!["AST-A1", "AST-A2"]);
        assert_eq!(set.focused_id(), Some(&AssetId::from("A1")));
    }

    #[tokio::test]
    async fn load_rejects_empty_input() {
        let directory = FakeDirectory::with(vec![]);

        let err = BatchLoader::load(&directory, &[])
            .await
            .expect_err("empty input must not load");

        assert!(matches!(err, LoadError::NothingSelected));
    }

    #[tokio::test]
    async fn load_deduplicates_requested_ids() {
        let directory = FakeDirectory::with(vec![summary("A1", dec!(1000.00))]);

        let set = BatchLoader::load(&directory, &["A1".into(), "A1".into(), "A1".into()])
            .await
            .expect("load should succeed");

        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn load_tolerates_a_short_result() {
        let directory = FakeDirectory::with(vec![summary("A1", dec!(1000.00))]);

        let set = BatchLoader::load(&directory, &["A1".into(), "A9".into()])
            .await
            .expect("load should succeed with the smaller batch");

        assert_eq!(set.len(), 1);
        assert!(set.contains(&"A1".into()));
        assert!(!set.contains(&"A9".into()));
    }

    #[tokio::test]
    async fn load_fails_when_nothing_resolves() {
        let directory = FakeDirectory::with(vec![]);

        let err = BatchLoader::load(&directory, &["A8".into(), "A9".into()])
            .await
            .expect_err("wholly unresolved batch must fail");

        assert!(matches!(err, LoadError::NoAssetsResolved));
    }

    #[tokio::test]
    async fn load_propagates_directory_failure() {
        let directory = FakeDirectory::failing();

        let err = BatchLoader::load(&directory, &["A1".into()])
            .await
            .expect_err("directory failure must be fatal");

        assert!(matches!(err, LoadError::Directory(_)));
    }

    #[tokio::test]
    async fn load_drops_duplicate_directory_rows() {
        let directory = FakeDirectory::with(vec![
            summary("A1", dec!(1000.00)),
            summary("A1", dec!(999.00)),
        ]);

        let set = BatchLoader::load(&directory, &["A1".into()])
            .await
            .expect("load should succeed");

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&"A1".into()).map(|r| r.purchase_price),
            Some(dec!(1000.00))
        );
    }
}
