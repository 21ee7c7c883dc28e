#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combines features and the jump decision into the final action vector.

use platformer_agent_core::{Action, ActionVector, Facing};
use platformer_agent_system_perception::Features;
use serde::{Deserialize, Serialize};

/// Tunables for the composer's guards and run thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposerConfig {
    /// Consecutive leftward ticks after which LEFT is force-released.
    pub drift_cap: u32,
    /// Walls at least this tall make the character run.
    pub run_wall_height: u32,
    /// Gaps strictly wider than this make the character run.
    pub run_gap_width: u32,
    /// Staircases at least this long make the character run.
    pub run_staircase_length: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            drift_cap: 15,
            run_wall_height: 4,
            run_gap_width: 4,
            run_staircase_length: 4,
        }
    }
}

/// Horizontal heading chosen after the drift limiter ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Steering {
    /// LEFT stays pressed this tick.
    pub left: bool,
    /// The drift limiter released LEFT this tick.
    pub drift_clamped: bool,
}

impl Steering {
    /// Direction the character actually moves in.
    #[must_use]
    pub const fn heading(self) -> Facing {
        if self.left {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// Side effects of composing a single tick, reported for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    /// The drift limiter released LEFT this tick.
    pub drift_clamped: bool,
    /// Forward movement was withheld over a gap while falling.
    pub held_back: bool,
}

/// Reports whether the character moved down since the previous tick.
///
/// Y grows downward. Without a previous sample the character is not falling.
#[must_use]
pub fn is_falling(previous_y: Option<f32>, current_y: f32) -> bool {
    previous_y.map_or(false, |previous| previous < current_y)
}

/// Applies the drift limiter and returns whether LEFT stays pressed.
///
/// The counter grows on every leftward tick and resets otherwise. The tick on
/// which it reaches `cap` releases LEFT and starts the count over.
pub fn limit_drift(counter: &mut u32, left: bool, cap: u32) -> bool {
    if !left {
        *counter = 0;
        return false;
    }

    *counter = counter.saturating_add(1);
    if *counter >= cap {
        *counter = 0;
        return false;
    }
    true
}

/// Pure system that writes the per-tick action vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionComposer {
    config: ComposerConfig,
}

impl ActionComposer {
    /// Creates a composer with the provided configuration.
    #[must_use]
    pub const fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Configuration applied by the composer.
    #[must_use]
    pub const fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Reports whether any obstacle is large enough to trade caution for speed.
    #[must_use]
    pub fn wants_speed(&self, features: &Features) -> bool {
        features.wall_height >= self.config.run_wall_height
            || features.gap_width > self.config.run_gap_width
            || features.staircase_length >= self.config.run_staircase_length
    }

    /// Runs the drift limiter for a character that wants to face `facing`.
    pub fn steer(&self, facing: Facing, drift: &mut u32) -> Steering {
        let wants_left = facing == Facing::Left;
        let left = limit_drift(drift, wants_left, self.config.drift_cap);
        Steering {
            left,
            drift_clamped: wants_left && !left,
        }
    }

    /// Overwrites `out` with this tick's controls.
    ///
    /// `features` should be probed along `steering.heading()`. RIGHT stays
    /// pressed unless the character is falling toward a gap while heading
    /// right, so it is held alongside LEFT as well.
    pub fn handle(
        &self,
        features: &Features,
        steering: Steering,
        jump_held: bool,
        falling: bool,
        out: &mut ActionVector,
    ) -> Composition {
        out.clear();

        let held_back = features.gap_width > 0 && falling && !steering.left;

        out.set(Action::Left, steering.left);
        out.set(Action::Right, !held_back);
        out.set(Action::Speed, self.wants_speed(features));
        out.set(Action::Jump, jump_held);

        Composition {
            drift_clamped: steering.drift_clamped,
            held_back,
        }
    }

    /// Overwrites `out` with the classic variant's controls: always right,
    /// jumping as decided.
    pub fn handle_classic(&self, jump_held: bool, out: &mut ActionVector) {
        out.clear();
        out.set(Action::Right, true);
        out.set(Action::Jump, jump_held);
    }
}
