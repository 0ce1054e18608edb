#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for geotoken adapters.
//!
//! Systems describe visual changes as [`VisualCommand`]s. A [`SceneSync`]
//! turns those into calls on a [`MapSurface`], the only thing a concrete map
//! widget has to implement.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result as AnyResult;
use geotoken_core::{CellIndex, GeoBounds, LatLng, TokenValue, VisualCommand};
use log::trace;
use thiserror::Error;

/// Opaque handle to a primitive drawn by a [`MapSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u64);

impl PrimitiveId {
    /// Wraps a surface-specific identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the surface-specific identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Drawing primitives a map widget must provide.
pub trait MapSurface {
    /// Draws the outline of a cell.
    fn create_border(&mut self, cell: CellIndex, bounds: GeoBounds) -> AnyResult<PrimitiveId>;

    /// Places a labelled marker at `anchor`.
    fn create_marker(
        &mut self,
        cell: CellIndex,
        anchor: LatLng,
        label: &str,
    ) -> AnyResult<PrimitiveId>;

    /// Changes the label of an existing marker.
    fn update_marker(&mut self, id: PrimitiveId, label: &str) -> AnyResult<()>;

    /// Removes a primitive from the map.
    fn destroy(&mut self, id: PrimitiveId) -> AnyResult<()>;

    /// Drains the cells clicked since the previous call.
    fn take_clicks(&mut self) -> Vec<CellIndex>;
}

/// Inconsistencies detected in a stream of [`VisualCommand`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RenderingError {
    /// A cell was spawned twice without being despawned.
    #[error("cell {cell} is already spawned")]
    AlreadySpawned {
        /// Offending cell.
        cell: CellIndex,
    },
    /// A command referenced a cell that has no visuals.
    #[error("cell {cell} is not spawned")]
    NotSpawned {
        /// Offending cell.
        cell: CellIndex,
    },
    /// A marker was shown on a cell that already has one.
    #[error("cell {cell} already shows a token")]
    MarkerPresent {
        /// Offending cell.
        cell: CellIndex,
    },
    /// A marker was updated or hidden on a cell that has none.
    #[error("cell {cell} shows no token")]
    MarkerMissing {
        /// Offending cell.
        cell: CellIndex,
    },
}

/// Text drawn on a token marker.
#[must_use]
pub fn token_label(value: TokenValue) -> String {
    value.to_string()
}

#[derive(Clone, Copy, Debug)]
struct CellPrimitives {
    border: PrimitiveId,
    marker: Option<PrimitiveId>,
}

/// Applies visual commands to a surface while tracking the primitives of each cell.
#[derive(Debug)]
pub struct SceneSync<S> {
    surface: S,
    cells: HashMap<CellIndex, CellPrimitives>,
}

impl<S: MapSurface> SceneSync<S> {
    /// Wraps a surface that currently shows nothing.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            cells: HashMap::new(),
        }
    }

    /// Applies `commands` in order, stopping at the first failure.
    pub fn apply(&mut self, commands: &[VisualCommand]) -> AnyResult<()> {
        for command in commands {
            self.apply_one(command)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, command: &VisualCommand) -> AnyResult<()> {
        trace!("applying {command:?}");
        match *command {
            VisualCommand::SpawnCell { cell, bounds } => {
                if self.cells.contains_key(&cell) {
                    return Err(RenderingError::AlreadySpawned { cell }.into());
                }
                let border = self.surface.create_border(cell, bounds)?;
                let _ = self.cells.insert(
                    cell,
                    CellPrimitives {
                        border,
                        marker: None,
                    },
                );
            }
            VisualCommand::ShowToken {
                cell,
                anchor,
                value,
            } => {
                let primitives = self.spawned(cell)?;
                if primitives.marker.is_some() {
                    return Err(RenderingError::MarkerPresent { cell }.into());
                }
                let marker = self
                    .surface
                    .create_marker(cell, anchor, &token_label(value))?;
                if let Some(primitives) = self.cells.get_mut(&cell) {
                    primitives.marker = Some(marker);
                }
            }
            VisualCommand::UpdateToken { cell, value } => {
                let marker = self
                    .spawned(cell)?
                    .marker
                    .ok_or(RenderingError::MarkerMissing { cell })?;
                self.surface.update_marker(marker, &token_label(value))?;
            }
            VisualCommand::HideToken { cell } => {
                let marker = self
                    .spawned(cell)?
                    .marker
                    .ok_or(RenderingError::MarkerMissing { cell })?;
                self.surface.destroy(marker)?;
                if let Some(primitives) = self.cells.get_mut(&cell) {
                    primitives.marker = None;
                }
            }
            VisualCommand::DespawnCell { cell } => {
                let primitives = self
                    .cells
                    .remove(&cell)
                    .ok_or(RenderingError::NotSpawned { cell })?;
                if let Some(marker) = primitives.marker {
                    self.surface.destroy(marker)?;
                }
                self.surface.destroy(primitives.border)?;
            }
        }
        Ok(())
    }

    fn spawned(&self, cell: CellIndex) -> Result<CellPrimitives, RenderingError> {
        self.cells
            .get(&cell)
            .copied()
            .ok_or(RenderingError::NotSpawned { cell })
    }

    /// Clicks on spawned cells since the previous call. Clicks elsewhere are dropped.
    pub fn take_clicks(&mut self) -> Vec<CellIndex> {
        let cells = &self.cells;
        self.surface
            .take_clicks()
            .into_iter()
            .filter(|cell| cells.contains_key(cell))
            .collect()
    }

    /// Reports whether the cell has a border on the surface.
    #[must_use]
    pub fn is_spawned(&self, cell: CellIndex) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Number of cells with a border.
    #[must_use]
    pub fn border_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells showing a token marker.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.cells
            .values()
            .filter(|primitives| primitives.marker.is_some())
            .count()
    }

    /// Shared access to the surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Exclusive access to the surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

/// Primitive kept by a [`MemorySurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Cell outline.
    Border {
        /// Cell the outline belongs to.
        cell: CellIndex,
        /// Geographic extent of the outline.
        bounds: GeoBounds,
    },
    /// Token marker.
    Marker {
        /// Cell the marker belongs to.
        cell: CellIndex,
        /// Marker position.
        anchor: LatLng,
        /// Displayed text.
        label: String,
    },
}

/// Headless surface that keeps every primitive in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    next_id: u64,
    primitives: BTreeMap<PrimitiveId, Primitive>,
    clicks: Vec<CellIndex>,
}

impl MemorySurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a click on `cell`, as a map widget would on user input.
    pub fn click(&mut self, cell: CellIndex) {
        self.clicks.push(cell);
    }

    /// Every primitive currently drawn.
    pub fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> + '_ {
        self.primitives.iter().map(|(id, primitive)| (*id, primitive))
    }

    /// Label of the marker drawn on `cell`, if any.
    #[must_use]
    pub fn marker_label(&self, cell: CellIndex) -> Option<&str> {
        self.primitives.values().find_map(|primitive| match primitive {
            Primitive::Marker {
                cell: owner, label, ..
            } if *owner == cell => Some(label.as_str()),
            _ => None,
        })
    }

    /// Reports whether `cell` has an outline.
    #[must_use]
    pub fn has_border(&self, cell: CellIndex) -> bool {
        self.primitives.values().any(
            |primitive| matches!(primitive, Primitive::Border { cell: owner, .. } if *owner == cell),
        )
    }

    fn insert(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId::new(self.next_id);
        self.next_id += 1;
        let _ = self.primitives.insert(id, primitive);
        id
    }
}

impl MapSurface for MemorySurface {
    fn create_border(&mut self, cell: CellIndex, bounds: GeoBounds) -> AnyResult<PrimitiveId> {
        Ok(self.insert(Primitive::Border { cell, bounds }))
    }

    fn create_marker(
        &mut self,
        cell: CellIndex,
        anchor: LatLng,
        label: &str,
    ) -> AnyResult<PrimitiveId> {
        Ok(self.insert(Primitive::Marker {
            cell,
            anchor,
            label: label.to_owned(),
        }))
    }

    fn update_marker(&mut self, id: PrimitiveId, label: &str) -> AnyResult<()> {
        match self.primitives.get_mut(&id) {
            Some(Primitive::Marker { label: current, .. }) => {
                *current = label.to_owned();
                Ok(())
            }
            Some(Primitive::Border { .. }) => {
                anyhow::bail!("primitive {} is not a marker", id.get())
            }
            None => anyhow::bail!("primitive {} does not exist", id.get()),
        }
    }

    fn destroy(&mut self, id: PrimitiveId) -> AnyResult<()> {
        match self.primitives.remove(&id) {
            Some(_) => Ok(()),
            None => anyhow::bail!("primitive {} does not exist", id.get()),
        }
    }

    fn take_clicks(&mut self) -> Vec<CellIndex> {
        std::mem::take(&mut self.clicks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_labels_show_the_value() {
        assert_eq!(token_label(TokenValue::new(32)), "32");
    }

    #[test]
    fn memory_surface_rejects_unknown_primitives() {
        let mut surface = MemorySurface::new();
        assert!(surface.destroy(PrimitiveId::new(7)).is_err());

        let border = surface
            .create_border(CellIndex::new(0, 0), GeoBounds::new(0.0, 0.0, 1.0, 1.0))
            .expect("border created");
        assert!(surface.update_marker(border, "2").is_err());
    }
}
