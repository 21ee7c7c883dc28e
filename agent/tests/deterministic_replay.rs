use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use glam::Vec2;
use platformer_agent::{decide, Agent, AgentConfig, AgentState, Variant};
use platformer_agent_core::{ActionVector, HostileActors, JumpCause, Observation, TileGrid, TilePos};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[test]
fn deterministic_replay_produces_identical_traces() {
    for variant in [Variant::Full, Variant::Classic] {
        let config = AgentConfig {
            variant,
            ..AgentConfig::default()
        };
        let first = replay(config, &scripted_frames());
        let second = replay(config, &scripted_frames());

        assert_eq!(first, second, "{variant:?} replay diverged between runs");
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.ticks.len(), scripted_frames().len());
    }
}

#[test]
fn scripted_course_exercises_every_jump_cause() {
    let outcome = replay(AgentConfig::default(), &scripted_frames());
    let causes: Vec<JumpCause> = outcome.ticks.iter().map(|tick| tick.cause).collect();

    for expected in [JumpCause::Threat, JumpCause::Wall, JumpCause::Gap, JumpCause::Stairs] {
        assert!(causes.contains(&expected), "{expected:?} never started");
    }
}

#[test]
fn pipeline_is_a_pure_function_of_its_inputs() {
    let config = AgentConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut state = AgentState::default();

    for tick in 0..2_000 {
        let observation = random_observation(&mut rng);
        let first = decide(&config, &observation, &state);
        let second = decide(&config, &observation, &state);
        assert_eq!(first, second, "tick {tick}");

        assert!(first.state.jump.holds_invariant(), "tick {tick}");
        assert!(first.state.drift < config.composer.drift_cap, "tick {tick}");
        state = first.state;
    }
}

fn replay(config: AgentConfig, frames: &[Observation]) -> ReplayOutcome {
    let mut agent = Agent::new(config);
    let mut ticks = Vec::with_capacity(frames.len());
    let Some(first) = frames.first() else {
        return ReplayOutcome { ticks };
    };
    agent.initialize(first);

    for frame in frames {
        let actions = *agent.get_actions(frame);
        let state = agent.state();
        ticks.push(TickRecord {
            actions,
            cause: state.jump.cause(),
            elapsed: state.jump.elapsed(),
            target: state.jump.target_duration_raw(),
            drift: state.drift,
        });
    }

    ReplayOutcome { ticks }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    ticks: Vec<TickRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TickRecord {
    actions: ActionVector,
    cause: JumpCause,
    elapsed: u32,
    target: i32,
    drift: u32,
}

const GROUND_ROW: i32 = 12;

fn course() -> TileGrid {
    let mut grid = TileGrid::filled(64, 16, 0);
    for column in 0..64 {
        for row in GROUND_ROW..16 {
            let _ = grid.set(TilePos::new(column, row), 1);
        }
    }
    for row in (GROUND_ROW - 2)..GROUND_ROW {
        let _ = grid.set(TilePos::new(14, row), 1);
    }
    for column in 24..30 {
        for row in GROUND_ROW..16 {
            let _ = grid.set(TilePos::new(column, row), 0);
        }
    }
    for (step, column) in (40..44).enumerate() {
        let height = step as i32 + 2;
        for offset in 0..height {
            let _ = grid.set(TilePos::new(column, GROUND_ROW - 1 - offset), 1);
        }
    }
    grid
}

fn scripted_frames() -> Vec<Observation> {
    let grid = course();
    let mut frames = Vec::new();
    let mut y = 176.0;

    for column in 2..48 {
        let x = column as f32 * 16.0 + 8.0;
        let hostiles = if column == 6 {
            HostileActors::from_flat(&[2.0, x + 20.0, y - 30.0])
        } else {
            HostileActors::default()
        };
        let over_gap = (24..30).contains(&column);
        if over_gap {
            y += 2.0;
        } else {
            y = 176.0;
        }

        for _ in 0..3 {
            frames.push(Observation {
                position: Vec2::new(x, y),
                tile: TilePos::new(column, GROUND_ROW - 1),
                hostiles: hostiles.clone(),
                grid: grid.clone(),
                grounded: !over_gap,
            });
        }
    }
    frames
}

fn random_observation(rng: &mut ChaCha8Rng) -> Observation {
    let columns = rng.gen_range(1..24);
    let rows = rng.gen_range(1..16);
    let mut grid = TileGrid::filled(columns, rows, 0);
    for column in 0..columns as i32 {
        for row in 0..rows as i32 {
            if rng.gen_bool(0.35) {
                let _ = grid.set(TilePos::new(column, row), rng.gen_range(-2..4));
            }
        }
    }

    let position = Vec2::new(rng.gen_range(0.0..400.0), rng.gen_range(0.0..260.0));
    let mut flat = Vec::new();
    for id in 0..rng.gen_range(0..4) {
        flat.extend([
            id as f32,
            position.x + rng.gen_range(-80.0..80.0),
            position.y + rng.gen_range(-80.0..80.0),
        ]);
    }

    Observation {
        position,
        tile: TilePos::new(rng.gen_range(-2..26), rng.gen_range(-2..18)),
        hostiles: HostileActors::from_flat(&flat),
        grid,
        grounded: rng.gen_bool(0.5),
    }
}
