//! Text rendering of the surface around the player.

use std::fmt::Write as _;

use geotoken_core::CellIndex;
use geotoken_rendering::MemorySurface;

const CELL_WIDTH: usize = 4;

/// Draws the `radius` cells around `player`, north at the top.
///
/// Tokens show their value, empty cells a dot and cells without visuals stay
/// blank. The player's cell is bracketed.
#[must_use]
pub fn ascii_map(surface: &MemorySurface, player: CellIndex, radius: u32) -> String {
    let radius = i32::try_from(radius).unwrap_or(i32::MAX);
    let mut map = String::new();
    for row in (-radius..=radius).rev() {
        for col in -radius..=radius {
            let cell = player.offset(row, col);
            let glyph = match surface.marker_label(cell) {
                Some(label) => label.to_owned(),
                None if surface.has_border(cell) => ".".to_owned(),
                None => " ".to_owned(),
            };
            let glyph = if cell == player {
                format!("[{glyph}]")
            } else {
                glyph
            };
            let _ = write!(map, "{glyph:>CELL_WIDTH$}");
        }
        let trimmed = map.trim_end_matches(' ').len();
        map.truncate(trimmed);
        map.push('\n');
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotoken_core::{GeoBounds, LatLng};
    use geotoken_rendering::MapSurface;

    #[test]
    fn draws_tokens_empty_cells_and_the_player() {
        let mut surface = MemorySurface::new();
        let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0);
        for cell in [CellIndex::new(0, 0), CellIndex::new(1, 0), CellIndex::new(0, 1)] {
            let _ = surface.create_border(cell, bounds).expect("border");
        }
        let _ = surface
            .create_marker(CellIndex::new(1, 0), LatLng::new(0.5, 0.5), "16")
            .expect("marker");

        let map = ascii_map(&surface, CellIndex::new(0, 0), 1);

        assert_eq!(map, "      16\n     [.]   .\n\n");
    }
}
