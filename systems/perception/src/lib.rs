#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure feature extractors that read a single observation.
//!
//! Every probe is bounded by a small fixed cap and reads the tile grid through
//! its bounds-checked accessor, so tiles beyond the screen edge count as empty
//! and never fault.

use glam::Vec2;
use platformer_agent_core::{
    Facing, HostileActor, HostileActors, Observation, Rect, TileGrid, TilePos,
};
use serde::{Deserialize, Serialize};

/// Longest diagonal run inspected by [`staircase_length`].
pub const STAIRCASE_CAP: u32 = 4;

/// Number of columns inspected by [`gap_width`]: the tile ahead plus four more.
pub const GAP_SCAN_COLUMNS: u32 = 5;

/// Rows inspected by [`wall_in_front`], starting at the character's row.
pub const CLASSIC_WALL_PROBE_ROWS: i32 = 3;

/// Half extent of the fixed engagement square used by the classic variant.
pub const CLASSIC_ENGAGEMENT_HALF_EXTENT: f32 = 50.0;

/// Tunables for feature extraction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerceptionConfig {
    /// Horizontal half extent of the engagement rectangle in world units.
    pub engagement_half_width: f32,
    /// Vertical half extent of the engagement rectangle in world units.
    pub engagement_half_height: f32,
    /// Rows below the character's own row included in the gap band.
    pub gap_band_depth: u32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            engagement_half_width: 48.0,
            engagement_half_height: 64.0,
            gap_band_depth: 2,
        }
    }
}

/// Hostile actor found inside the engagement rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatContact {
    /// Actor as reported by the host.
    pub actor: HostileActor,
    /// Actor position minus character position; positive `y` means below.
    pub offset: Vec2,
}

/// Features extracted for the full decision pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Features {
    /// Direction the character heads in this tick; grid probes look this way.
    pub facing: Facing,
    /// First hostile inside the engagement rectangle.
    pub threat: Option<ThreatContact>,
    /// Solid tiles stacked directly ahead.
    pub wall_height: u32,
    /// Diagonal steps rising ahead.
    pub staircase_length: u32,
    /// Empty columns ahead before the ground resumes.
    pub gap_width: u32,
    /// Rows between the character and the nearest solid tile above.
    pub ceiling_clearance: Option<u32>,
}

impl Features {
    /// Extracts every feature from the observation.
    ///
    /// The facing is decided from the threat first, so the grid probes look
    /// in the direction the character is about to move.
    #[must_use]
    pub fn extract(observation: &Observation, config: &PerceptionConfig) -> Self {
        let rect = engagement_rect(observation.position, config);
        let threat = nearest_threat(&observation.hostiles, &rect).map(|actor| ThreatContact {
            actor: *actor,
            offset: actor.position() - observation.position,
        });
        let facing = threat.map_or(Facing::Right, |contact| Facing::toward(contact.offset.x));
        Self::probe(observation, config, facing, threat)
    }

    /// Re-runs the grid probes in another direction, keeping the threat.
    #[must_use]
    pub fn turned(
        &self,
        observation: &Observation,
        config: &PerceptionConfig,
        facing: Facing,
    ) -> Self {
        if facing == self.facing {
            return *self;
        }
        Self::probe(observation, config, facing, self.threat)
    }

    fn probe(
        observation: &Observation,
        config: &PerceptionConfig,
        facing: Facing,
        threat: Option<ThreatContact>,
    ) -> Self {
        let grid = &observation.grid;
        let tile = observation.tile;
        Self {
            facing,
            threat,
            wall_height: wall_height(grid, tile, facing),
            staircase_length: staircase_length(grid, tile, facing),
            gap_width: gap_width(grid, tile, facing, config.gap_band_depth),
            ceiling_clearance: ceiling_clearance(grid, tile, facing),
        }
    }
}

/// Signals consumed by the classic two-rule variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassicFeatures {
    /// Some hostile sits inside the fixed engagement square.
    pub enemy_nearby: bool,
    /// Something solid occupies the three tiles ahead.
    pub wall_in_front: bool,
}

impl ClassicFeatures {
    /// Extracts the classic signals from the observation.
    #[must_use]
    pub fn extract(observation: &Observation) -> Self {
        let rect = Rect::centered(
            observation.position,
            CLASSIC_ENGAGEMENT_HALF_EXTENT,
            CLASSIC_ENGAGEMENT_HALF_EXTENT,
        );
        Self {
            enemy_nearby: nearest_threat(&observation.hostiles, &rect).is_some(),
            wall_in_front: wall_in_front(&observation.grid, observation.tile),
        }
    }
}

/// Engagement rectangle centred on the character.
#[must_use]
pub fn engagement_rect(position: Vec2, config: &PerceptionConfig) -> Rect {
    Rect::centered(
        position,
        config.engagement_half_width,
        config.engagement_half_height,
    )
}

/// Returns the first actor, in host order, whose position lies inside `rect`.
///
/// This is not a nearest-neighbour search: the host order decides ties.
#[must_use]
pub fn nearest_threat<'a>(actors: &'a HostileActors, rect: &Rect) -> Option<&'a HostileActor> {
    actors.iter().find(|actor| rect.contains(actor.x, actor.y))
}

/// Counts contiguous solid tiles in the column ahead, from the character's row
/// upward to the top of the grid.
#[must_use]
pub fn wall_height(grid: &TileGrid, tile: TilePos, facing: Facing) -> u32 {
    let mut probe = tile.offset(facing.step(), 0);
    let mut height = 0;
    while probe.row() >= 0 && grid.is_solid(probe) {
        height += 1;
        probe = probe.offset(0, -1);
    }
    height
}

/// Walks diagonally up and forward from the tile ahead and one row up, counting
/// solid tiles until the first empty one or [`STAIRCASE_CAP`].
#[must_use]
pub fn staircase_length(grid: &TileGrid, tile: TilePos, facing: Facing) -> u32 {
    let step = facing.step();
    let mut probe = tile.offset(step, -1);
    let mut length = 0;
    while length < STAIRCASE_CAP && grid.is_solid(probe) {
        length += 1;
        probe = probe.offset(step, -1);
    }
    length
}

/// Counts empty columns ahead of the character.
///
/// A column is empty when every tile from the character's row down to
/// `band_depth` rows below it is empty. Scanning stops at the first column
/// with ground in the band, or after [`GAP_SCAN_COLUMNS`] columns. Rows
/// outside the grid are never visited, whatever the band depth.
#[must_use]
pub fn gap_width(grid: &TileGrid, tile: TilePos, facing: Facing, band_depth: u32) -> u32 {
    let step = facing.step();
    let first_row = tile.row().max(0);
    let last_row =
        (i64::from(tile.row()) + i64::from(band_depth)).min(i64::from(grid.rows()) - 1);
    let last_row = i32::try_from(last_row).unwrap_or(i32::MAX);
    let mut column = tile.offset(step, 0);
    for scanned in 0..GAP_SCAN_COLUMNS {
        let grounded = (first_row..=last_row)
            .any(|row| grid.is_solid(TilePos::new(column.column(), row)));
        if grounded {
            return scanned;
        }
        column = column.offset(step, 0);
    }
    GAP_SCAN_COLUMNS
}

/// Distance in rows to the nearest solid tile directly above the character or
/// diagonally above in the facing direction.
///
/// Returns `None` when nothing solid sits between the character and the top
/// of the grid.
#[must_use]
pub fn ceiling_clearance(grid: &TileGrid, tile: TilePos, facing: Facing) -> Option<u32> {
    let top_row = i64::from(grid.rows()) - 1;
    let first_row = (i64::from(tile.row()) - 1).min(top_row);
    let diagonal = tile.column().saturating_add(facing.step());

    let mut row = first_row;
    while row >= 0 {
        let probe_row = row as i32;
        if grid.is_solid(TilePos::new(tile.column(), probe_row))
            || grid.is_solid(TilePos::new(diagonal, probe_row))
        {
            return u32::try_from(i64::from(tile.row()) - row).ok();
        }
        row -= 1;
    }
    None
}

/// Reports whether any of the three tiles ahead, from the character's row
/// upward, holds something solid.
#[must_use]
pub fn wall_in_front(grid: &TileGrid, tile: TilePos) -> bool {
    let ahead = tile.offset(1, 0);
    (0..CLASSIC_WALL_PROBE_ROWS).any(|above| grid.is_solid(ahead.offset(0, -above)))
}

#[cfg(test)]
mod tests {
    use super::{
        ceiling_clearance, gap_width, staircase_length, wall_height, wall_in_front, Features,
        PerceptionConfig, GAP_SCAN_COLUMNS, STAIRCASE_CAP,
    };
    use glam::Vec2;
    use platformer_agent_core::{Facing, HostileActors, Observation, TileGrid, TilePos};

    const GROUND_ROW: i32 = 12;

    /// Sixteen by sixteen screen with a floor on rows 12 and below.
    fn floor() -> TileGrid {
        let mut grid = TileGrid::filled(16, 16, 0);
        for column in 0..16 {
            for row in GROUND_ROW..16 {
                let _ = grid.set(TilePos::new(column, row), 1);
            }
        }
        grid
    }

    fn standing_at(column: i32) -> TilePos {
        TilePos::new(column, GROUND_ROW - 1)
    }

    fn stack(grid: &mut TileGrid, column: i32, height: i32) {
        for offset in 0..height {
            let _ = grid.set(TilePos::new(column, GROUND_ROW - 1 - offset), 1);
        }
    }

    fn dig(grid: &mut TileGrid, column: i32) {
        for row in GROUND_ROW..16 {
            let _ = grid.set(TilePos::new(column, row), 0);
        }
    }

    #[test]
    fn wall_height_counts_contiguous_solid_tiles() {
        let mut grid = floor();
        stack(&mut grid, 6, 3);
        assert_eq!(wall_height(&grid, standing_at(5), Facing::Right), 3);
        assert_eq!(wall_height(&grid, standing_at(7), Facing::Left), 3);
        assert_eq!(wall_height(&grid, standing_at(7), Facing::Right), 0);
    }

    #[test]
    fn wall_height_stops_at_first_empty_tile() {
        let mut grid = floor();
        stack(&mut grid, 6, 1);
        let _ = grid.set(TilePos::new(6, GROUND_ROW - 3), 1);
        assert_eq!(wall_height(&grid, standing_at(5), Facing::Right), 1);
    }

    #[test]
    fn wall_height_stops_at_grid_top() {
        let mut grid = floor();
        stack(&mut grid, 6, GROUND_ROW);
        assert_eq!(
            wall_height(&grid, standing_at(5), Facing::Right),
            GROUND_ROW as u32
        );
    }

    #[test]
    fn staircase_is_capped() {
        let mut grid = floor();
        for step in 0..6 {
            stack(&mut grid, 6 + step, 2 + step);
        }
        assert_eq!(
            staircase_length(&grid, standing_at(5), Facing::Right),
            STAIRCASE_CAP
        );
    }

    #[test]
    fn staircase_requires_first_diagonal_tile() {
        let mut grid = floor();
        stack(&mut grid, 6, 1);
        assert_eq!(staircase_length(&grid, standing_at(5), Facing::Right), 0);

        stack(&mut grid, 6, 2);
        stack(&mut grid, 7, 3);
        assert_eq!(staircase_length(&grid, standing_at(5), Facing::Right), 2);
    }

    #[test]
    fn gap_width_is_zero_with_ground_ahead() {
        let grid = floor();
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, 2), 0);
    }

    #[test]
    fn gap_width_counts_empty_columns() {
        let mut grid = floor();
        dig(&mut grid, 6);
        dig(&mut grid, 7);
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, 2), 2);
        assert_eq!(gap_width(&grid, standing_at(8), Facing::Left, 2), 2);
    }

    #[test]
    fn gap_width_is_capped() {
        let mut grid = floor();
        for column in 6..14 {
            dig(&mut grid, column);
        }
        assert_eq!(
            gap_width(&grid, standing_at(5), Facing::Right, 2),
            GAP_SCAN_COLUMNS
        );
    }

    #[test]
    fn deeper_band_reaches_lower_ground() {
        let mut grid = floor();
        for row in GROUND_ROW..GROUND_ROW + 2 {
            let _ = grid.set(TilePos::new(6, row), 0);
        }
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, 2), 1);
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, 3), 0);
    }

    #[test]
    fn oversized_band_is_bounded_by_the_grid() {
        let mut grid = floor();
        for row in GROUND_ROW..15 {
            let _ = grid.set(TilePos::new(6, row), 0);
        }
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, 4), 0);
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, u32::MAX), 0);

        dig(&mut grid, 6);
        assert_eq!(gap_width(&grid, standing_at(5), Facing::Right, u32::MAX), 1);
        assert_eq!(
            gap_width(&grid, TilePos::new(5, -40), Facing::Right, u32::MAX),
            1
        );
    }

    #[test]
    fn turned_features_probe_the_other_way() {
        let mut grid = floor();
        stack(&mut grid, 4, 2);
        dig(&mut grid, 6);
        let observation = Observation {
            position: Vec2::new(88.0, 176.0),
            tile: standing_at(5),
            hostiles: HostileActors::from_flat(&[2.0, 60.0, 176.0]),
            grid,
            grounded: true,
        };
        let config = PerceptionConfig::default();

        let features = Features::extract(&observation, &config);
        assert_eq!(features.facing, Facing::Left);
        assert_eq!(features.wall_height, 2);
        assert_eq!(features.gap_width, 0);

        let turned = features.turned(&observation, &config, Facing::Right);
        assert_eq!(turned.facing, Facing::Right);
        assert_eq!(turned.wall_height, 0);
        assert_eq!(turned.gap_width, 1);
        assert_eq!(turned.threat, features.threat);
        assert_eq!(features.turned(&observation, &config, Facing::Left), features);
    }

    #[test]
    fn ceiling_clearance_prefers_the_closer_tile() {
        let mut grid = floor();
        let _ = grid.set(TilePos::new(5, GROUND_ROW - 6), 1);
        let _ = grid.set(TilePos::new(6, GROUND_ROW - 4), 1);
        assert_eq!(ceiling_clearance(&grid, standing_at(5), Facing::Right), Some(3));
        assert_eq!(ceiling_clearance(&grid, standing_at(5), Facing::Left), Some(5));
    }

    #[test]
    fn open_sky_has_no_ceiling() {
        let grid = floor();
        assert_eq!(ceiling_clearance(&grid, standing_at(5), Facing::Right), None);
    }

    #[test]
    fn probes_past_every_edge_read_as_empty() {
        let grid = TileGrid::filled(4, 4, 1);

        assert_eq!(wall_height(&grid, TilePos::new(3, 2), Facing::Right), 0);
        assert_eq!(wall_height(&grid, TilePos::new(0, 2), Facing::Left), 0);
        assert_eq!(staircase_length(&grid, TilePos::new(3, 2), Facing::Right), 0);
        assert_eq!(staircase_length(&grid, TilePos::new(1, 0), Facing::Right), 0);
        assert_eq!(ceiling_clearance(&grid, TilePos::new(1, 0), Facing::Right), None);
        assert_eq!(
            gap_width(&grid, TilePos::new(3, 1), Facing::Right, 2),
            GAP_SCAN_COLUMNS
        );
        assert!(!wall_in_front(&grid, TilePos::new(3, 1)));
    }

    #[test]
    fn character_far_off_screen_sees_nothing() {
        let grid = floor();
        let tile = TilePos::new(i32::MAX, i32::MIN);
        assert_eq!(wall_height(&grid, tile, Facing::Right), 0);
        assert_eq!(staircase_length(&grid, tile, Facing::Right), 0);
        assert_eq!(ceiling_clearance(&grid, tile, Facing::Right), None);
    }

    #[test]
    fn ceiling_probe_starts_inside_grid_when_character_is_below_it() {
        let mut grid = floor();
        let _ = grid.set(TilePos::new(5, 15), 0);
        let _ = grid.set(TilePos::new(6, 15), 0);
        let clearance = ceiling_clearance(&grid, TilePos::new(5, 20), Facing::Right);
        assert_eq!(clearance, Some(6));
    }

    #[test]
    fn wall_in_front_checks_three_rows() {
        let mut grid = floor();
        let _ = grid.set(TilePos::new(6, GROUND_ROW - 3), 1);
        assert!(wall_in_front(&grid, standing_at(5)));
        assert!(!wall_in_front(&grid, standing_at(4)));
    }

    #[test]
    fn threat_to_the_left_turns_probes_around() {
        let mut grid = floor();
        stack(&mut grid, 4, 2);
        let observation = Observation {
            position: Vec2::new(88.0, 176.0),
            tile: standing_at(5),
            hostiles: HostileActors::from_flat(&[2.0, 60.0, 176.0]),
            grid,
            grounded: true,
        };

        let features = Features::extract(&observation, &PerceptionConfig::default());
        assert_eq!(features.facing, Facing::Left);
        assert_eq!(features.wall_height, 2);
        let threat = features.threat.expect("threat in range");
        assert_eq!(threat.offset, Vec2::new(-28.0, 0.0));
    }

    #[test]
    fn distant_hostiles_are_ignored() {
        let observation = Observation {
            position: Vec2::new(88.0, 176.0),
            tile: standing_at(5),
            hostiles: HostileActors::from_flat(&[2.0, 200.0, 176.0]),
            grid: floor(),
            grounded: true,
        };

        let features = Features::extract(&observation, &PerceptionConfig::default());
        assert!(features.threat.is_none());
        assert_eq!(features.facing, Facing::Right);
    }
}
