//! Sparse record of cells whose value diverged from their baseline.

use std::collections::HashMap;

use geotoken_core::{CellIndex, CellKey, TokenValue};

use crate::baseline::BaselineGenerator;

/// Stores only the cells whose current value differs from the baseline.
///
/// Every other cell resolves through the [`BaselineGenerator`], so the store
/// grows with player activity rather than with the number of cells visited.
/// An entry never holds a value equal to its cell's baseline.
#[derive(Debug)]
pub struct OverlayStore {
    generator: BaselineGenerator,
    entries: HashMap<CellKey, Option<TokenValue>>,
}

impl OverlayStore {
    /// Creates an empty store backed by the provided generator.
    #[must_use]
    pub fn new(generator: BaselineGenerator) -> Self {
        Self {
            generator,
            entries: HashMap::new(),
        }
    }

    /// Current value of `cell`: the overlay entry if present, the baseline otherwise.
    #[must_use]
    pub fn get(&self, cell: CellIndex) -> Option<TokenValue> {
        match self.entries.get(&cell.key()) {
            Some(value) => *value,
            None => self.generator.generate(cell),
        }
    }

    /// Records `value` for `cell`, dropping the entry when it matches the baseline.
    pub fn set(&mut self, cell: CellIndex, value: Option<TokenValue>) {
        if value == self.generator.generate(cell) {
            let _ = self.entries.remove(&cell.key());
        } else {
            let _ = self.entries.insert(cell.key(), value);
        }
    }

    /// Drops every entry, returning all cells to their baseline.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Reports whether `cell` currently diverges from its baseline.
    #[must_use]
    pub fn contains(&self, cell: CellIndex) -> bool {
        self.entries.contains_key(&cell.key())
    }

    /// Number of diverging cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no cell diverges from its baseline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Baseline value of `cell`, ignoring any overlay entry.
    #[must_use]
    pub fn baseline(&self, cell: CellIndex) -> Option<TokenValue> {
        self.generator.generate(cell)
    }

    /// Iterates the diverging cells in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (CellIndex, Option<TokenValue>)> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (CellIndex::from_key(*key), *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::SeededLuck;
    use geotoken_core::{CellSpan, GameConfig};

    fn store() -> OverlayStore {
        OverlayStore::new(BaselineGenerator::new(
            &GameConfig::default(),
            Box::new(SeededLuck),
        ))
    }

    fn cell_with_token(store: &OverlayStore) -> CellIndex {
        CellSpan::new(CellIndex::new(0, 0), CellIndex::new(20, 20))
            .iter()
            .find(|cell| store.baseline(*cell).is_some())
            .expect("a 21x21 region contains at least one token")
    }

    #[test]
    fn get_falls_back_to_baseline() {
        let store = store();
        let cell = cell_with_token(&store);
        assert_eq!(store.get(cell), store.baseline(cell));
        assert!(store.is_empty());
    }

    #[test]
    fn setting_baseline_value_prunes_entry() {
        let mut store = store();
        let cell = cell_with_token(&store);

        store.set(cell, None);
        assert!(store.contains(cell));
        assert_eq!(store.get(cell), None);

        store.set(cell, store.baseline(cell));
        assert!(!store.contains(cell));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn writing_baseline_to_untouched_cell_stores_nothing() {
        let mut store = store();
        for cell in CellSpan::new(CellIndex::new(-5, -5), CellIndex::new(5, 5)) {
            let baseline = store.baseline(cell);
            store.set(cell, baseline);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn clear_restores_baselines() {
        let mut store = store();
        let cell = cell_with_token(&store);
        let baseline = store.get(cell);
        store.set(cell, Some(TokenValue::new(16)));
        store.set(CellIndex::new(-40, 40), Some(TokenValue::new(8)));

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get(cell), baseline);
    }

    #[test]
    fn entries_report_diverging_cells() {
        let mut store = store();
        let cell = CellIndex::new(-40, 40);
        store.set(cell, Some(TokenValue::new(8)));
        let entries: Vec<_> = store.entries().collect();
        assert_eq!(entries, vec![(cell, Some(TokenValue::new(8)))]);
    }
}
