#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Viewport lifecycle system that keeps one visual per visible cell.
//!
//! Visual lifetime follows viewport membership only. Cells that scroll out of
//! view lose their visuals but keep whatever the world records for them; the
//! value shown for a cell is resolved again from the world on every pass.

use std::collections::{btree_map::Entry, BTreeMap};

use geotoken_core::{
    CellIndex, CellSpan, Event, GeoBounds, GridGeometry, TokenValue, VisualCommand,
};
use log::{debug, warn};

/// Configuration parameters required to construct the viewport system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    padding: u32,
    max_span: u32,
}

impl Config {
    /// Rows and columns a viewport covers at most unless configured otherwise.
    pub const DEFAULT_MAX_SPAN: u32 = 256;

    /// Creates a configuration keeping `padding` extra cells alive around the view.
    #[must_use]
    pub const fn new(padding: u32) -> Self {
        Self {
            padding,
            max_span: Self::DEFAULT_MAX_SPAN,
        }
    }

    /// Limits the rows and columns covered by a single reconcile.
    ///
    /// Larger regions are cut down to a window of this size around their centre.
    #[must_use]
    pub const fn with_max_span(mut self, max_span: u32) -> Self {
        self.max_span = if max_span == 0 { 1 } else { max_span };
        self
    }

    /// Extra cells kept alive on each side of the visible region.
    #[must_use]
    pub const fn padding(&self) -> u32 {
        self.padding
    }

    /// Maximum rows and columns covered by the viewport.
    #[must_use]
    pub const fn max_span(&self) -> u32 {
        self.max_span
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Ephemeral state of a cell that currently has visuals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VisualCell {
    marker: Option<TokenValue>,
}

/// Pure system translating viewport changes into [`VisualCommand`]s.
#[derive(Debug, Default)]
pub struct Viewport {
    config: Config,
    visuals: BTreeMap<CellIndex, VisualCell>,
    needed: Option<CellSpan>,
}

impl Viewport {
    /// Creates a viewport with no visible cells.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            visuals: BTreeMap::new(),
            needed: None,
        }
    }

    /// Brings the set of visuals in line with the cells covering `bounds`.
    ///
    /// The `value_at` closure should mirror the world's `query::cell_value`
    /// helper. Calling this twice with unchanged bounds and world emits nothing
    /// on the second call.
    pub fn reconcile<F>(
        &mut self,
        bounds: GeoBounds,
        geometry: &GridGeometry,
        mut value_at: F,
        out: &mut Vec<VisualCommand>,
    ) where
        F: FnMut(CellIndex) -> Option<TokenValue>,
    {
        let covering = geometry.span_covering(bounds, self.config.padding);
        let needed = clamp_span(covering, self.config.max_span);
        if needed != covering {
            warn!(
                "viewport of {}x{} cells exceeds the {} cell limit, showing the centre only",
                covering.rows(),
                covering.cols(),
                self.config.max_span
            );
        }

        let stale: Vec<CellIndex> = self
            .visuals
            .keys()
            .filter(|cell| !needed.contains(**cell))
            .copied()
            .collect();
        for cell in &stale {
            let _ = self.visuals.remove(cell);
            out.push(VisualCommand::DespawnCell { cell: *cell });
        }

        let mut spawned = 0_usize;
        for cell in needed.iter() {
            let value = value_at(cell);
            match self.visuals.entry(cell) {
                Entry::Vacant(slot) => {
                    out.push(VisualCommand::SpawnCell {
                        cell,
                        bounds: geometry.bounds_of(cell),
                    });
                    if let Some(value) = value {
                        out.push(VisualCommand::ShowToken {
                            cell,
                            anchor: geometry.center_of(cell),
                            value,
                        });
                    }
                    let _ = slot.insert(VisualCell { marker: value });
                    spawned += 1;
                }
                Entry::Occupied(mut slot) => {
                    refresh(cell, slot.get_mut(), value, geometry, out);
                }
            }
        }

        if spawned > 0 || !stale.is_empty() {
            debug!(
                "viewport reconciled: {spawned} spawned, {} despawned, {} visible",
                stale.len(),
                self.visuals.len()
            );
        }
        self.needed = Some(needed);
    }

    /// Refreshes visible cells whose value may have changed according to `events`.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        geometry: &GridGeometry,
        mut value_at: F,
        out: &mut Vec<VisualCommand>,
    ) where
        F: FnMut(CellIndex) -> Option<TokenValue>,
    {
        let mut refresh_all = false;
        let mut touched: Vec<CellIndex> = Vec::new();
        for event in events {
            match *event {
                Event::TokenPickedUp { cell, .. }
                | Event::TokenDropped { cell, .. }
                | Event::TokensMerged { cell, .. } => touched.push(cell),
                Event::GameReset | Event::StateRestored => refresh_all = true,
                _ => {}
            }
        }

        if refresh_all {
            touched = self.visuals.keys().copied().collect();
        }

        for cell in touched {
            if let Some(visual) = self.visuals.get_mut(&cell) {
                refresh(cell, visual, value_at(cell), geometry, out);
            }
        }
    }

    /// Destroys every visual, leaving the viewport empty.
    pub fn clear(&mut self, out: &mut Vec<VisualCommand>) {
        out.extend(
            self.visuals
                .keys()
                .map(|cell| VisualCommand::DespawnCell { cell: *cell }),
        );
        self.visuals.clear();
        self.needed = None;
    }

    /// Reports whether the cell currently has visuals.
    #[must_use]
    pub fn is_visible(&self, cell: CellIndex) -> bool {
        self.visuals.contains_key(&cell)
    }

    /// Number of cells that currently have visuals.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visuals.len()
    }

    /// Value displayed by the marker of a visible cell.
    #[must_use]
    pub fn marker(&self, cell: CellIndex) -> Option<TokenValue> {
        self.visuals.get(&cell).and_then(|visual| visual.marker)
    }

    /// Cells needed by the most recent reconcile, if any.
    #[must_use]
    pub fn needed(&self) -> Option<CellSpan> {
        self.needed
    }
}

fn clamp_span(span: CellSpan, max_span: u32) -> CellSpan {
    let (min_row, max_row) = clamp_axis(span.min().row(), span.max().row(), max_span);
    let (min_col, max_col) = clamp_axis(span.min().col(), span.max().col(), max_span);
    CellSpan::new(
        CellIndex::new(min_row, min_col),
        CellIndex::new(max_row, max_col),
    )
}

fn clamp_axis(min: i32, max: i32, max_span: u32) -> (i32, i32) {
    let side = i64::from(max) - i64::from(min) + 1;
    let limit = i64::from(max_span.max(1));
    if side <= limit {
        return (min, max);
    }
    let start = i64::from(min) + (side - limit) / 2;
    let end = start + limit - 1;
    (
        i32::try_from(start).unwrap_or(min),
        i32::try_from(end).unwrap_or(max),
    )
}

fn refresh(
    cell: CellIndex,
    visual: &mut VisualCell,
    value: Option<TokenValue>,
    geometry: &GridGeometry,
    out: &mut Vec<VisualCommand>,
) {
    match (visual.marker, value) {
        (None, Some(value)) => out.push(VisualCommand::ShowToken {
            cell,
            anchor: geometry.center_of(cell),
            value,
        }),
        (Some(shown), Some(value)) if shown != value => {
            out.push(VisualCommand::UpdateToken { cell, value });
        }
        (Some(_), None) => out.push(VisualCommand::HideToken { cell }),
        _ => {}
    }
    visual.marker = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_emits_minimal_marker_changes() {
        let geometry = GridGeometry::default();
        let cell = CellIndex::new(0, 0);
        let mut visual = VisualCell { marker: None };
        let mut out = Vec::new();

        refresh(cell, &mut visual, None, &geometry, &mut out);
        assert!(out.is_empty());

        refresh(cell, &mut visual, Some(TokenValue::new(2)), &geometry, &mut out);
        refresh(cell, &mut visual, Some(TokenValue::new(2)), &geometry, &mut out);
        refresh(cell, &mut visual, Some(TokenValue::new(4)), &geometry, &mut out);
        refresh(cell, &mut visual, None, &geometry, &mut out);

        assert_eq!(
            out,
            vec![
                VisualCommand::ShowToken {
                    cell,
                    anchor: geometry.center_of(cell),
                    value: TokenValue::new(2),
                },
                VisualCommand::UpdateToken {
                    cell,
                    value: TokenValue::new(4),
                },
                VisualCommand::HideToken { cell },
            ]
        );
    }
}
