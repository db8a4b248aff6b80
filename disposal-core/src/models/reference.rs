use serde::{Deserialize, Serialize};

use crate::services::{ReferenceDataSource, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
}

/// Vendor and location option lists, fetched once per workflow and read-only
/// afterwards. Safe to share across records; only used to annotate
/// submissions, never mutated by the engine.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    vendors: Vec<Vendor>,
    locations: Vec<Location>,
}

impl ReferenceCache {
    pub fn new(vendors: Vec<Vendor>, locations: Vec<Location>) -> Self {
        Self { vendors, locations }
    }

    /// Fetch both option lists from the backend.
    pub async fn load<S: ReferenceDataSource + ?Sized>(source: &S) -> Result<Self, ServiceError> {
        let vendors = source.fetch_vendors().await?;
        let locations = source.fetch_locations().await?;
        Ok(Self { vendors, locations })
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Resolve a human-entered vendor name to its id. Matching is trimmed
    /// and case-insensitive; an unknown name resolves to nothing.
    pub fn resolve_vendor(&self, name: &str) -> Option<i64> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        self.vendors
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(wanted))
            .map(|v| v.id)
    }

    pub fn location(&self, id: i64) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cache() -> ReferenceCache {
        ReferenceCache::new(
            vec![
                Vendor {
                    id: 1,
                    name: "Acme Salvage".to_string(),
                },
                Vendor {
                    id: 2,
                    name: "Birch & Co".to_string(),
                },
            ],
            vec![Location {
                id: 10,
                name: "Main Warehouse".to_string(),
            }],
        )
    }

    #[test]
    fn resolve_vendor_matches_exact_name() {
        assert_eq!(cache().resolve_vendor("Acme Salvage"), Some(1));
    }

    #[test]
    fn resolve_vendor_is_case_insensitive_and_trims() {
        assert_eq!(cache().resolve_vendor("  acme salvage "), Some(1));
        assert_eq!(cache().resolve_vendor("BIRCH & CO"), Some(2));
    }

    #[test]
    fn resolve_vendor_unknown_name_is_none() {
        assert_eq!(cache().resolve_vendor("Nonesuch"), None);
    }

    #[test]
    fn resolve_vendor_empty_name_is_none() {
        assert_eq!(cache().resolve_vendor("   "), None);
    }

    #[test]
    fn location_lookup_by_id() {
        let cache = cache();

        assert_eq!(cache.location(10).map(|l| l.name.as_str()), Some("Main Warehouse"));
        assert_eq!(cache.location(99), None);
    }
}
