use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use glam::Vec2;
use platformer_agent::{decide, AgentConfig, AgentState};
use platformer_agent_core::{Action, HostileActors, Observation, TileGrid, TilePos};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

/// Chance that a generated observation carries a non-finite position.
const MALFORMED_PROBABILITY: f64 = 0.01;

/// Aggregate counts collected while soaking the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct SoakReport {
    /// Seed the observations were generated from.
    pub(crate) seed: u64,
    /// Ticks simulated.
    pub(crate) ticks: u64,
    /// Observations rejected as malformed.
    pub(crate) malformed: u64,
    /// Jumps started, keyed by cause label.
    pub(crate) jumps_started: BTreeMap<&'static str, u64>,
    /// Ticks each action was pressed, keyed by action label.
    pub(crate) pressed: BTreeMap<&'static str, u64>,
}

/// Drives the pipeline with seeded random observations, failing on the first
/// tick that breaks a state invariant or decides differently when repeated.
pub(crate) fn soak(config: &AgentConfig, seed: u64, ticks: u64) -> Result<SoakReport> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = AgentState::default();
    let mut report = SoakReport {
        seed,
        ticks,
        ..SoakReport::default()
    };

    for tick in 0..ticks {
        let observation = random_observation(&mut rng);
        if observation.validate().is_err() {
            report.malformed += 1;
        }

        let decision = decide(config, &observation, &state);
        let repeated = decide(config, &observation, &state);
        ensure!(decision == repeated, "tick {tick}: decision is not repeatable");
        ensure!(
            decision.state.jump.holds_invariant(),
            "tick {tick}: jump state {:?} breaks its invariant",
            decision.state.jump
        );
        ensure!(
            decision.state.drift < config.composer.drift_cap,
            "tick {tick}: drift counter {} reached the cap",
            decision.state.drift
        );
        ensure!(
            !decision.actions.is_pressed(Action::Down),
            "tick {tick}: DOWN was pressed"
        );

        if let Some((cause, _)) = decision.jump.started {
            *report.jumps_started.entry(cause.label()).or_default() += 1;
        }
        for action in decision.actions.pressed() {
            *report.pressed.entry(action.label()).or_default() += 1;
        }
        state = decision.state;
    }

    info!(seed, ticks, malformed = report.malformed, "soak finished");
    Ok(report)
}

fn random_observation(rng: &mut ChaCha8Rng) -> Observation {
    let columns = rng.gen_range(1..=32);
    let rows = rng.gen_range(1..=16);
    let mut grid = TileGrid::filled(columns, rows, 0);
    let ground = rng.gen_range(0..rows as i32);
    for column in 0..columns as i32 {
        for row in 0..rows as i32 {
            let solid = if row >= ground {
                rng.gen_bool(0.8)
            } else {
                rng.gen_bool(0.1)
            };
            if solid {
                let _ = grid.set(TilePos::new(column, row), rng.gen_range(1..=8));
            }
        }
    }

    let tile = TilePos::new(
        rng.gen_range(-2..columns as i32 + 2),
        rng.gen_range(-2..rows as i32 + 2),
    );
    let mut position = Vec2::new(
        tile.column() as f32 * 16.0 + rng.gen_range(0.0..16.0),
        tile.row() as f32 * 16.0 + rng.gen_range(0.0..16.0),
    );
    if rng.gen_bool(MALFORMED_PROBABILITY) {
        position.x = f32::NAN;
    }

    let mut flat = Vec::new();
    for id in 0..rng.gen_range(0..5) {
        flat.extend([
            id as f32,
            position.x + rng.gen_range(-96.0..96.0),
            position.y + rng.gen_range(-96.0..96.0),
        ]);
    }

    Observation {
        position,
        tile,
        hostiles: HostileActors::from_flat(&flat),
        grid,
        grounded: rng.gen_bool(0.6),
    }
}
