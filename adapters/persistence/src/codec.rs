//! Versionless JSON layout of a saved session.

use std::collections::HashSet;

use geotoken_core::{
    CellIndex, LatLng, ParseCellIndexError, PlayerSnapshot, TokenValue, WorldSnapshot,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted form of a [`WorldSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBlob {
    /// Player latitude in degrees.
    pub player_lat: f64,
    /// Player longitude in degrees.
    pub player_lng: f64,
    /// Token held by the player.
    pub held_token: Option<u64>,
    /// Every cell whose value differs from its baseline.
    pub modified_cells: Vec<SavedCell>,
}

/// Single modified cell inside a [`SaveBlob`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCell {
    /// Cell identity in `row,col` form.
    pub id: String,
    /// Current value; `None` records an emptied cell.
    pub value: Option<u64>,
}

/// Reasons a blob cannot be turned back into a snapshot.
#[derive(Debug, Error)]
pub enum CorruptBlob {
    /// The stored text is not a valid save blob.
    #[error("save blob is not valid JSON")]
    Json(#[from] serde_json::Error),
    /// A modified cell carries an unreadable id.
    #[error("save blob contains an invalid cell id")]
    CellId(#[from] ParseCellIndexError),
    /// The same cell appears more than once.
    #[error("save blob lists cell {0} more than once")]
    DuplicateCell(CellIndex),
    /// The player position is not a finite coordinate.
    #[error("save blob has a non-finite player position")]
    Position,
    /// A token carries the value zero.
    #[error("save blob contains a zero-valued token")]
    ZeroToken,
}

/// Captures `snapshot` in its persisted layout.
#[must_use]
pub fn encode(snapshot: &WorldSnapshot) -> SaveBlob {
    SaveBlob {
        player_lat: snapshot.player.position.lat,
        player_lng: snapshot.player.position.lng,
        held_token: snapshot.player.held.map(|value| value.get()),
        modified_cells: snapshot
            .modified_cells
            .iter()
            .map(|(cell, value)| SavedCell {
                id: cell.to_string(),
                value: value.map(|value| value.get()),
            })
            .collect(),
    }
}

/// Rebuilds a snapshot, rejecting the whole blob if any part is malformed.
pub fn decode(blob: &SaveBlob) -> Result<WorldSnapshot, CorruptBlob> {
    if !blob.player_lat.is_finite() || !blob.player_lng.is_finite() {
        return Err(CorruptBlob::Position);
    }

    let mut seen = HashSet::with_capacity(blob.modified_cells.len());
    let mut modified_cells = Vec::with_capacity(blob.modified_cells.len());
    for saved in &blob.modified_cells {
        let cell: CellIndex = saved.id.parse()?;
        if !seen.insert(cell) {
            return Err(CorruptBlob::DuplicateCell(cell));
        }
        modified_cells.push((cell, token(saved.value)?));
    }
    modified_cells.sort_by_key(|(cell, _)| *cell);

    Ok(WorldSnapshot {
        player: PlayerSnapshot {
            position: LatLng::new(blob.player_lat, blob.player_lng),
            held: token(blob.held_token)?,
        },
        modified_cells,
    })
}

/// Serialises `snapshot` to the JSON text stored on disk.
pub fn to_json(snapshot: &WorldSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(&encode(snapshot))
}

/// Parses stored JSON text back into a snapshot.
pub fn from_json(text: &str) -> Result<WorldSnapshot, CorruptBlob> {
    let blob: SaveBlob = serde_json::from_str(text)?;
    decode(&blob)
}

fn token(value: Option<u64>) -> Result<Option<TokenValue>, CorruptBlob> {
    match value {
        Some(0) => Err(CorruptBlob::ZeroToken),
        other => Ok(other.map(TokenValue::new)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(cells: &[(&str, Option<u64>)]) -> SaveBlob {
        SaveBlob {
            player_lat: 36.989_493_795_784_01,
            player_lng: -122.062_771_285_485_04,
            held_token: Some(4),
            modified_cells: cells
                .iter()
                .map(|(id, value)| SavedCell {
                    id: (*id).to_owned(),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn layout_uses_camel_case_field_names() {
        let json = serde_json::to_value(blob(&[("3,-4", None)])).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({
                "playerLat": 36.989_493_795_784_01,
                "playerLng": -122.062_771_285_485_04,
                "heldToken": 4,
                "modifiedCells": [{ "id": "3,-4", "value": null }],
            })
        );
    }

    #[test]
    fn encode_stores_token_values_as_plain_numbers() {
        let snapshot = WorldSnapshot {
            player: PlayerSnapshot {
                position: LatLng::new(1.5, -2.5),
                held: Some(TokenValue::new(8)),
            },
            modified_cells: vec![
                (CellIndex::new(-1, 2), None),
                (CellIndex::new(3, 4), Some(TokenValue::new(32))),
            ],
        };

        let saved = encode(&snapshot);

        assert_eq!(saved.held_token, Some(8));
        assert_eq!(saved.modified_cells[0].id, "-1,2");
        assert_eq!(saved.modified_cells[0].value, None);
        assert_eq!(saved.modified_cells[1].value, Some(32));
        assert_eq!(decode(&saved).expect("encoded blob decodes"), snapshot);
    }

    #[test]
    fn decode_sorts_cells_and_keeps_empties() {
        let snapshot = decode(&blob(&[("5,5", Some(8)), ("-1,2", None)])).expect("valid blob");
        assert_eq!(
            snapshot.modified_cells,
            vec![
                (CellIndex::new(-1, 2), None),
                (CellIndex::new(5, 5), Some(TokenValue::new(8))),
            ]
        );
        assert_eq!(snapshot.player.held, Some(TokenValue::new(4)));
    }

    #[test]
    fn one_bad_id_rejects_the_whole_blob() {
        let result = decode(&blob(&[("1,1", Some(2)), ("oops", Some(2))]));
        assert!(matches!(result, Err(CorruptBlob::CellId(_))));
    }

    #[test]
    fn duplicate_cells_are_rejected() {
        let result = decode(&blob(&[("1,1", Some(2)), ("1, 1", None)]));
        assert!(matches!(
            result,
            Err(CorruptBlob::DuplicateCell(cell)) if cell == CellIndex::new(1, 1)
        ));
    }

    #[test]
    fn zero_tokens_are_rejected() {
        let mut zero_held = blob(&[]);
        zero_held.held_token = Some(0);
        assert!(matches!(decode(&zero_held), Err(CorruptBlob::ZeroToken)));
        assert!(matches!(
            decode(&blob(&[("0,0", Some(0))])),
            Err(CorruptBlob::ZeroToken)
        ));
    }

    #[test]
    fn missing_fields_are_corrupt() {
        assert!(matches!(
            from_json(r#"{"playerLat": 1.0, "playerLng": 2.0}"#),
            Err(CorruptBlob::Json(_))
        ));
    }
}
