use std::collections::HashMap;

use crate::models::{AssetId, DisposalRecord};

/// The in-memory batch of not-yet-submitted disposal records.
///
/// Records live in a map keyed by asset id; a separate ordered key list
/// preserves the batch input order and carries the focus pointer. Addressing
/// by key rather than raw index avoids index-shift bugs when a record is
/// removed mid-batch.
///
/// Invariants:
/// - no two records share an asset id;
/// - the focus pointer is always a valid index into the order list, or
///   `None` exactly when the set is empty;
/// - a removed record never re-enters the set.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    records: HashMap<AssetId, DisposalRecord>,
    order: Vec<AssetId>,
    focus: Option<usize>,
}

impl WorkingSet {
    /// Build a working set from loader output. Later duplicates of an asset
    /// id are dropped; the first occurrence wins.
    pub fn from_records(records: Vec<DisposalRecord>) -> Self {
        let mut set = Self::default();
        for record in records {
            if set.records.contains_key(&record.asset_id) {
                continue;
            }
            set.order.push(record.asset_id.clone());
            set.records.insert(record.asset_id.clone(), record);
        }
        if !set.order.is_empty() {
            set.focus = Some(0);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &AssetId) -> Option<&DisposalRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &AssetId) -> Option<&mut DisposalRecord> {
        self.records.get_mut(id)
    }

    /// Asset ids in batch input order.
    pub fn ids(&self) -> &[AssetId] {
        &self.order
    }

    /// Records in batch input order.
    pub fn iter(&self) -> impl Iterator<Item = &DisposalRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn focused_id(&self) -> Option<&AssetId> {
        self.focus.and_then(|i| self.order.get(i))
    }

    pub fn focused_record(&self) -> Option<&DisposalRecord> {
        self.focused_id().and_then(|id| self.records.get(id))
    }

    /// Point the focus at the given record. Returns false if the record is
    /// not in the set.
    pub fn set_focus(&mut self, id: &AssetId) -> bool {
        match self.order.iter().position(|o| o == id) {
            Some(i) => {
                self.focus = Some(i);
                true
            }
            None => false,
        }
    }

    /// Step the focus to the next record in batch order, wrapping at the end.
    pub fn advance_focus(&mut self) {
        if let Some(i) = self.focus {
            self.focus = Some((i + 1) % self.order.len());
        }
    }

    /// Remove a record and re-clamp the focus pointer:
    /// a focus past the removed index shifts down by one; a focus at the
    /// removed index stays put unless it fell off the end, in which case it
    /// moves to the new last record; an emptied set has no focus.
    pub fn remove(&mut self, id: &AssetId) -> Option<DisposalRecord> {
        let removed_at = self.order.iter().position(|o| o == id)?;
        self.order.remove(removed_at);
        let record = self.records.remove(id);

        self.focus = match self.focus {
            _ if self.order.is_empty() => None,
            Some(f) if f > removed_at => Some(f - 1),
            Some(f) => Some(f.min(self.order.len() - 1)),
            None => None,
        };

        record
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::AssetSummary;

    fn set_of(ids: &[&str]) -> WorkingSet {
        let records = ids
            .iter()
            .map(|id| {
                DisposalRecord::from_summary(AssetSummary {
                    id: AssetId::from(*id),
                    code: format!("AST-{id}"),
                    name: format!("Asset {id}"),
                    purchase_price: dec!(1000.00),
                })
            })
            .collect();
        WorkingSet::from_records(records)
    }

    #[test]
    fn from_records_keeps_input_order_and_focuses_first() {
        let set = set_of(&["A1", "A2", "A3"]);

        assert_eq!(set.len(), 3);
        let expected: Vec<AssetId> = vec!["A1".into(), "A2".into(), "A3".into()];
        assert_eq!(set.ids(), expected);
        assert_eq!(set.focused_id(), Some(&AssetId::from("A1")));
    }

    #[test]
    fn from_records_drops_duplicate_ids_first_wins() {
        let set = set_of(&["A1", "A2", "A1"]);

        assert_eq!(set.len(), 2);
        let expected: Vec<AssetId> = vec!["A1".into(), "A2".into()];
        assert_eq!(set.ids(), expected);
    }

    #[test]
    fn empty_set_has_no_focus() {
        let set = WorkingSet::from_records(vec![]);

        assert!(set.is_empty());
        assert_eq!(set.focus(), None);
    }

    #[test]
    fn remove_before_focus_shifts_focus_down() {
        let mut set = set_of(&["A1", "A2", "A3"]);
        set.set_focus(&"A3".into());

        set.remove(&"A1".into());

        assert_eq!(set.focused_id(), Some(&AssetId::from("A3")));
        assert_eq!(set.focus(), Some(1));
    }

    #[test]
    fn remove_at_focus_keeps_index_pointing_at_next_record() {
        let mut set = set_of(&["A1", "A2", "A3"]);
        set.set_focus(&"A2".into());

        set.remove(&"A2".into());

        assert_eq!(set.focused_id(), Some(&AssetId::from("A3")));
    }

    #[test]
    fn remove_last_focused_record_clamps_to_new_last() {
        let mut set = set_of(&["A1", "A2", "A3"]);
        set.set_focus(&"A3".into());

        set.remove(&"A3".into());

        assert_eq!(set.focused_id(), Some(&AssetId::from("A2")));
    }

    #[test]
    fn remove_after_focus_leaves_focus_alone() {
        let mut set = set_of(&["A1", "A2", "A3"]);
        set.set_focus(&"A1".into());

        set.remove(&"A3".into());

        assert_eq!(set.focused_id(), Some(&AssetId::from("A1")));
    }

    #[test]
    fn remove_final_record_clears_focus() {
        let mut set = set_of(&["A1"]);

        let removed = set.remove(&"A1".into());

        assert!(removed.is_some());
        assert!(set.is_empty());
        assert_eq!(set.focus(), None);
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let mut set = set_of(&["A1", "A2"]);

        let removed = set.remove(&"A9".into());

        assert!(removed.is_none());
        assert_eq!(set.len(), 2);
        assert_eq!(set.focused_id(), Some(&AssetId::from("A1")));
    }

    #[test]
    fn advance_focus_wraps_around() {
        let mut set = set_of(&["A1", "A2"]);

        set.advance_focus();
        assert_eq!(set.focused_id(), Some(&AssetId::from("A2")));

        set.advance_focus();
        assert_eq!(set.focused_id(), Some(&AssetId::from("A1")));
    }
}
