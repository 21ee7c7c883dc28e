use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use glam::Vec2;
use platformer_agent_core::{GridError, HostileActors, Observation, TileGrid, TilePos};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier prefix emitted before the encoded observation payload.
pub(crate) const SNAPSHOT_HEADER: &str = "obs:v1";

/// Encodes a single observation into a one-line string that can be pasted
/// into a bug report and replayed with `decide`.
pub(crate) fn encode(observation: &Observation) -> Result<String, SnapshotTransferError> {
    let payload = ObservationPayload {
        position: observation.position.to_array(),
        tile: [observation.tile.column(), observation.tile.row()],
        grounded: observation.grounded,
        hostiles: observation.hostiles.to_flat(),
        columns: observation.grid.to_columns(),
    };
    let json = serde_json::to_vec(&payload)?;
    Ok(format!(
        "{SNAPSHOT_HEADER}:{}x{}:{}",
        observation.grid.columns(),
        observation.grid.rows(),
        STANDARD_NO_PAD.encode(json)
    ))
}

/// Decodes an observation from its transfer string.
///
/// The grid carried in the payload must match the dimensions in the header.
pub(crate) fn decode(value: &str) -> Result<Observation, SnapshotTransferError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SnapshotTransferError::Empty);
    }

    let (declared, payload) = split_header(value)?;
    let bytes = STANDARD_NO_PAD.decode(payload)?;
    let payload: ObservationPayload = serde_json::from_slice(&bytes)?;
    let grid = TileGrid::from_columns(payload.columns)?;

    let found = (grid.columns(), grid.rows());
    if found != declared {
        return Err(SnapshotTransferError::DimensionMismatch { declared, found });
    }

    Ok(Observation {
        position: Vec2::from_array(payload.position),
        tile: TilePos::new(payload.tile[0], payload.tile[1]),
        hostiles: HostileActors::from_flat(&payload.hostiles),
        grid,
        grounded: payload.grounded,
    })
}

/// Splits `obs:v1:<cols>x<rows>:<payload>` into the declared grid size and
/// the base64 payload.
fn split_header(value: &str) -> Result<((u32, u32), &str), SnapshotTransferError> {
    let mut fields = value.rsplitn(3, ':');
    let (Some(payload), Some(dimensions), Some(header)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(SnapshotTransferError::Truncated);
    };
    if header != SNAPSHOT_HEADER {
        return Err(SnapshotTransferError::UnsupportedHeader(header.to_owned()));
    }

    let declared: (u32, u32) = dimensions
        .split_once('x')
        .and_then(|(columns, rows)| Some((columns.parse().ok()?, rows.parse().ok()?)))
        .ok_or_else(|| SnapshotTransferError::InvalidDimensions(dimensions.to_owned()))?;
    Ok((declared, payload))
}

#[derive(Debug, Serialize, Deserialize)]
struct ObservationPayload {
    position: [f32; 2],
    tile: [i32; 2],
    grounded: bool,
    hostiles: Vec<f32>,
    columns: Vec<Vec<i32>>,
}

/// Failures while moving an observation through a transfer string.
#[derive(Debug, Error)]
pub(crate) enum SnapshotTransferError {
    /// Nothing but whitespace was supplied.
    #[error("snapshot string was empty")]
    Empty,
    /// Fewer than the four `:` separated fields were present.
    #[error("snapshot string needs a header, grid dimensions and a payload")]
    Truncated,
    /// The header named another format or version.
    #[error("snapshot header `{0}` is not supported; expected `obs:v1`")]
    UnsupportedHeader(String),
    /// The dimensions field was not `<columns>x<rows>`.
    #[error("could not parse grid dimensions `{0}`")]
    InvalidDimensions(String),
    /// The payload was not valid unpadded base64.
    #[error("snapshot payload is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    /// The payload JSON could not be written or read.
    #[error("snapshot payload is not a valid observation")]
    Payload(#[from] serde_json::Error),
    /// The payload columns did not form a grid.
    #[error("snapshot grid is malformed")]
    Grid(#[from] GridError),
    /// The payload grid disagrees with the header.
    #[error(
        "snapshot header declares {}x{} but the grid is {}x{}",
        .declared.0, .declared.1, .found.0, .found.1
    )]
    DimensionMismatch {
        /// Columns and rows named in the header.
        declared: (u32, u32),
        /// Columns and rows carried by the payload.
        found: (u32, u32),
    },
}
