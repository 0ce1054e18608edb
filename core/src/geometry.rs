//! Conversions between geographic coordinates and the infinite cell grid.

use serde::{Deserialize, Serialize};

use crate::{CellIndex, ConfigError};

/// Geographic position expressed in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, positive towards north.
    pub lat: f64,
    /// Longitude in degrees, positive towards east.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new geographic position.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned geographic rectangle, typically the visible map region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Southern edge latitude.
    pub south: f64,
    /// Western edge longitude.
    pub west: f64,
    /// Northern edge latitude.
    pub north: f64,
    /// Eastern edge longitude.
    pub east: f64,
}

impl GeoBounds {
    /// Creates bounds from explicit edges.
    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Creates bounds centred on `center` extending `half_lat`/`half_lng` degrees in each direction.
    #[must_use]
    pub fn centered(center: LatLng, half_lat: f64, half_lng: f64) -> Self {
        Self {
            south: center.lat - half_lat,
            west: center.lng - half_lng,
            north: center.lat + half_lat,
            east: center.lng + half_lng,
        }
    }
}

/// Maps positions onto square cells of a fixed angular size.
///
/// The origin of the grid is the `(0, 0)` coordinate. Row indices grow towards
/// north and column indices grow towards east, so every position maps to
/// exactly one cell and every cell maps to exactly one bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    cell_size_degrees: f64,
}

impl GridGeometry {
    /// Side length used when no configuration is supplied.
    pub const DEFAULT_CELL_SIZE_DEGREES: f64 = 0.0001;

    /// Creates a geometry with the provided cell size.
    ///
    /// Returns an error when the size is not a positive finite number.
    pub fn new(cell_size_degrees: f64) -> Result<Self, ConfigError> {
        if !cell_size_degrees.is_finite() || cell_size_degrees <= 0.0 {
            return Err(ConfigError::InvalidCellSize { cell_size_degrees });
        }

        Ok(Self { cell_size_degrees })
    }

    /// Side length of a single cell in degrees.
    #[must_use]
    pub const fn cell_size_degrees(&self) -> f64 {
        self.cell_size_degrees
    }

    /// Cell containing the provided position.
    #[must_use]
    pub fn cell_at(&self, position: LatLng) -> CellIndex {
        CellIndex::new(
            self.axis_index(position.lat),
            self.axis_index(position.lng),
        )
    }

    /// Bounding box of the cell. The south-west corner sits at the index product.
    #[must_use]
    pub fn bounds_of(&self, cell: CellIndex) -> GeoBounds {
        let size = self.cell_size_degrees;
        let south = f64::from(cell.row()) * size;
        let west = f64::from(cell.col()) * size;
        GeoBounds::new(south, west, south + size, west + size)
    }

    /// Geographic centre of the cell.
    #[must_use]
    pub fn center_of(&self, cell: CellIndex) -> LatLng {
        let size = self.cell_size_degrees;
        LatLng::new(
            (f64::from(cell.row()) + 0.5) * size,
            (f64::from(cell.col()) + 0.5) * size,
        )
    }

    /// Inclusive rectangle of cells intersecting `bounds`, grown by `padding` cells on every side.
    #[must_use]
    pub fn span_covering(&self, bounds: GeoBounds, padding: u32) -> CellSpan {
        let padding = i32::try_from(padding).unwrap_or(i32::MAX);
        let south_west = self.cell_at(LatLng::new(
            bounds.south.min(bounds.north),
            bounds.west.min(bounds.east),
        ));
        let north_east = self.cell_at(LatLng::new(
            bounds.south.max(bounds.north),
            bounds.west.max(bounds.east),
        ));
        CellSpan::new(
            south_west.offset(-padding, -padding),
            north_east.offset(padding, padding),
        )
    }

    fn axis_index(&self, degrees: f64) -> i32 {
        // `as` saturates at the i32 range and maps NaN to zero.
        (degrees / self.cell_size_degrees).floor() as i32
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_size_degrees: Self::DEFAULT_CELL_SIZE_DEGREES,
        }
    }
}

/// Inclusive rectangle of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellSpan {
    min: CellIndex,
    max: CellIndex,
}

impl CellSpan {
    /// Creates the span enclosing both corners, in any order.
    #[must_use]
    pub fn new(first: CellIndex, second: CellIndex) -> Self {
        Self {
            min: CellIndex::new(first.row().min(second.row()), first.col().min(second.col())),
            max: CellIndex::new(first.row().max(second.row()), first.col().max(second.col())),
        }
    }

    /// Southern-most, western-most cell of the span.
    #[must_use]
    pub const fn min(&self) -> CellIndex {
        self.min
    }

    /// Northern-most, eastern-most cell of the span.
    #[must_use]
    pub const fn max(&self) -> CellIndex {
        self.max
    }

    /// Reports whether the cell lies inside the span.
    #[must_use]
    pub fn contains(&self, cell: CellIndex) -> bool {
        (self.min.row()..=self.max.row()).contains(&cell.row())
            && (self.min.col()..=self.max.col()).contains(&cell.col())
    }

    /// Number of rows covered by the span.
    #[must_use]
    pub fn rows(&self) -> u64 {
        u64::from(self.min.row().abs_diff(self.max.row())) + 1
    }

    /// Number of columns covered by the span.
    #[must_use]
    pub fn cols(&self) -> u64 {
        u64::from(self.min.col().abs_diff(self.max.col())) + 1
    }

    /// Total number of cells in the span.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.rows().saturating_mul(self.cols())
    }

    /// Always `false`; a span covers at least one cell.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the cells row by row, starting at [`CellSpan::min`].
    #[must_use]
    pub fn iter(&self) -> CellSpanIter {
        CellSpanIter {
            span: *self,
            row: i64::from(self.min.row()),
            col: i64::from(self.min.col()),
        }
    }
}

impl IntoIterator for CellSpan {
    type Item = CellIndex;
    type IntoIter = CellSpanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over the cells of a [`CellSpan`].
#[derive(Clone, Debug)]
pub struct CellSpanIter {
    span: CellSpan,
    row: i64,
    col: i64,
}

impl Iterator for CellSpanIter {
    type Item = CellIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row > i64::from(self.span.max.row()) {
            return None;
        }

        let cell = CellIndex::new(
            i32::try_from(self.row).ok()?,
            i32::try_from(self.col).ok()?,
        );

        self.col += 1;
        if self.col > i64::from(self.span.max.col()) {
            self.col = i64::from(self.span.min.col());
            self.row += 1;
        }

        Some(cell)
    }
}
