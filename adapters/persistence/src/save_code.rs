//! Single-line save codes for moving a session between machines.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geotoken_core::WorldSnapshot;
use thiserror::Error;

use crate::codec::{self, CorruptBlob};

const CODE_DOMAIN: &str = "geotoken";
const CODE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded payload.
pub const CODE_HEADER: &str = "geotoken:v1";
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while decoding save codes.
#[derive(Debug, Error)]
pub enum SaveCodeError {
    /// The provided string was empty or contained only whitespace.
    #[error("save code was empty")]
    EmptyPayload,
    /// The code did not contain a version segment.
    #[error("save code is missing the version")]
    MissingVersion,
    /// The code did not include the payload segment.
    #[error("save code is missing the payload")]
    MissingPayload,
    /// The code used an unexpected prefix segment.
    #[error("save code prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The code used an unsupported version identifier.
    #[error("save code version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode save code payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload is not a valid save.
    #[error("save code payload is corrupt")]
    InvalidPayload(#[source] CorruptBlob),
}

/// Encodes the snapshot into a single line suitable for copying.
pub fn encode(snapshot: &WorldSnapshot) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(&codec::encode(snapshot))?;
    Ok(format!("{CODE_HEADER}:{}", STANDARD_NO_PAD.encode(json)))
}

/// Decodes a snapshot from its save code.
pub fn decode(value: &str) -> Result<WorldSnapshot, SaveCodeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SaveCodeError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(SaveCodeError::MissingVersion)?;
    let payload = parts.next().ok_or(SaveCodeError::MissingPayload)?;

    if domain != CODE_DOMAIN {
        return Err(SaveCodeError::InvalidPrefix(domain.to_owned()));
    }
    if version != CODE_VERSION {
        return Err(SaveCodeError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SaveCodeError::InvalidEncoding)?;
    let blob = serde_json::from_slice(&bytes)
        .map_err(|error| SaveCodeError::InvalidPayload(CorruptBlob::Json(error)))?;
    codec::decode(&blob).map_err(SaveCodeError::InvalidPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotoken_core::{CellIndex, LatLng, PlayerSnapshot, TokenValue};

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            player: PlayerSnapshot {
                position: LatLng::new(36.989_5, -122.062_7),
                held: Some(TokenValue::new(2)),
            },
            modified_cells: vec![
                (CellIndex::new(-4, 9), None),
                (CellIndex::new(369_894, -1_220_628), Some(TokenValue::new(16))),
            ],
        }
    }

    #[test]
    fn round_trip_populated_session() {
        let code = encode(&snapshot()).expect("snapshot serialises");
        assert!(code.starts_with(&format!("{CODE_HEADER}:")));
        assert!(!code.contains('\n'));

        assert_eq!(decode(&format!("  {code}\n")).expect("code decodes"), snapshot());
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        let code = encode(&snapshot()).expect("snapshot serialises");
        let foreign = code.replacen(CODE_DOMAIN, "othergame", 1);
        assert!(matches!(
            decode(&foreign),
            Err(SaveCodeError::InvalidPrefix(prefix)) if prefix == "othergame"
        ));
    }

    #[test]
    fn malformed_codes_report_the_missing_part() {
        assert!(matches!(decode("   "), Err(SaveCodeError::EmptyPayload)));
        assert!(matches!(decode("geotoken"), Err(SaveCodeError::MissingVersion)));
        assert!(matches!(decode("geotoken:v1"), Err(SaveCodeError::MissingPayload)));
        assert!(matches!(
            decode("geotoken:v2:e30"),
            Err(SaveCodeError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            decode("geotoken:v1:***"),
            Err(SaveCodeError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode("geotoken:v1:e30"),
            Err(SaveCodeError::InvalidPayload(CorruptBlob::Json(_)))
        ));
    }
}
