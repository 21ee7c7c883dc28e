#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Jump state machine that turns detected hazards into held jump input.
//!
//! At most one [`JumpCause`] is active at a time. Initiation rules are
//! evaluated in a fixed priority order and only while no jump is in progress,
//! except that a staircase may take over a wall jump. Only a wall jump needs
//! the character on the ground. Once started, a jump holds the button for
//! exactly its target duration.
//!
//! The classic design requires the ground for both of its rules and lets go of
//! the button on the tick its counter reaches the duration.

use platformer_agent_core::JumpCause;
use platformer_agent_system_perception::{ClassicFeatures, Features, ThreatContact};
use serde::{Deserialize, Serialize};

/// Host convention for "no target duration".
pub const UNSET_DURATION: i32 = -1;

/// Durations and thresholds used by the initiation rules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JumpTuning {
    /// Vertical distance within which a threat counts as level with the character.
    pub threat_level_band: f32,
    /// Horizontal distance within which a threat above counts as close.
    pub threat_close_range: f32,
    /// Deepest a threat below may sit and still warrant a medium jump.
    pub threat_medium_below: f32,
    /// Ticks held for a level threat.
    pub threat_short_duration: u32,
    /// Ticks held for a threat moderately below or far above.
    pub threat_medium_duration: u32,
    /// Ticks held for a close threat above when nothing caps the jump.
    pub threat_high_duration: u32,
    /// Walls at least this tall are cleared with a height-scaled jump.
    pub wall_tall_height: u32,
    /// Ticks held for short walls.
    pub wall_short_duration: u32,
    /// Extra ticks added to the height of tall walls.
    pub wall_margin: u32,
    /// Staircases must be strictly longer than this to take over.
    pub stairs_min_length: u32,
    /// Extra ticks added to the staircase length.
    pub stairs_margin: u32,
    /// Ticks held when a gap opens ahead.
    pub gap_duration: u32,
    /// Ticks held by the classic variant for a nearby enemy.
    pub classic_threat_duration: u32,
    /// Ticks held by the classic variant for a wall in front.
    pub classic_wall_duration: u32,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            threat_level_band: 8.0,
            threat_close_range: 24.0,
            threat_medium_below: 32.0,
            threat_short_duration: 1,
            threat_medium_duration: 4,
            threat_high_duration: 10,
            wall_tall_height: 2,
            wall_short_duration: 4,
            wall_margin: 5,
            stairs_min_length: 2,
            stairs_margin: 6,
            gap_duration: 5,
            classic_threat_duration: 4,
            classic_wall_duration: 10,
        }
    }
}

/// Jump currently in progress, if any.
///
/// While idle the cause is [`JumpCause::None`], nothing has elapsed and the
/// target duration is unset. While active, `elapsed < target` holds between
/// ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct JumpState {
    cause: JumpCause,
    target: u32,
    elapsed: u32,
}

impl JumpState {
    /// State with no jump in progress.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            cause: JumpCause::None,
            target: 0,
            elapsed: 0,
        }
    }

    /// Reason the current jump started.
    #[must_use]
    pub const fn cause(&self) -> JumpCause {
        self.cause
    }

    /// Reports whether a jump is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.cause, JumpCause::None)
    }

    /// Ticks the jump button has been held for the current jump.
    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Ticks the current jump holds the button for, or `None` while idle.
    #[must_use]
    pub const fn target_duration(&self) -> Option<u32> {
        if self.is_active() {
            Some(self.target)
        } else {
            None
        }
    }

    /// Target duration in the host's signed convention, [`UNSET_DURATION`]
    /// while idle.
    #[must_use]
    pub fn target_duration_raw(&self) -> i32 {
        self.target_duration()
            .map_or(UNSET_DURATION, |target| {
                i32::try_from(target).unwrap_or(i32::MAX)
            })
    }

    /// Checks the tick-boundary invariant.
    #[must_use]
    pub const fn holds_invariant(&self) -> bool {
        if self.is_active() {
            self.elapsed < self.target
        } else {
            self.elapsed == 0 && self.target == 0
        }
    }

    fn begin(&mut self, cause: JumpCause, duration: u32) {
        if matches!(cause, JumpCause::None) {
            *self = Self::idle();
            return;
        }
        *self = Self {
            cause,
            target: duration.max(1),
            elapsed: 0,
        };
    }

    /// Holds the button for one tick. Returns `true` when this tick completed
    /// the jump and the state fell back to idle.
    fn advance(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.target {
            *self = Self::idle();
            return true;
        }
        false
    }
}

/// Outcome of a single tick of the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JumpStep {
    /// Whether the jump button is held this tick.
    pub held: bool,
    /// Jump started this tick, with its target duration.
    pub started: Option<(JumpCause, u32)>,
    /// Jump that finished this tick.
    pub resolved: Option<JumpCause>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    Threat,
    Wall,
    Stairs,
    Gap,
}

/// Initiation rules of the full design in priority order.
const RULES: [Rule; 4] = [Rule::Threat, Rule::Wall, Rule::Stairs, Rule::Gap];

/// Initiation rules of the classic design in priority order.
const CLASSIC_RULES: [Rule; 2] = [Rule::Threat, Rule::Wall];

impl Rule {
    const fn cause(self) -> JumpCause {
        match self {
            Self::Threat => JumpCause::Threat,
            Self::Wall => JumpCause::Wall,
            Self::Stairs => JumpCause::Stairs,
            Self::Gap => JumpCause::Gap,
        }
    }

    /// Transition table: which active causes this rule may replace.
    const fn may_replace(self, current: JumpCause, grounded: bool) -> bool {
        match (self, current) {
            (Self::Wall, JumpCause::None) => grounded,
            (_, JumpCause::None) | (Self::Stairs, JumpCause::Wall) => true,
            _ => false,
        }
    }
}

/// Arbitrates which hazard may start a jump and for how long.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JumpArbiter {
    tuning: JumpTuning,
}

impl JumpArbiter {
    /// Creates an arbiter with the provided tuning.
    #[must_use]
    pub const fn new(tuning: JumpTuning) -> Self {
        Self { tuning }
    }

    /// Tuning applied by the arbiter.
    #[must_use]
    pub const fn tuning(&self) -> &JumpTuning {
        &self.tuning
    }

    /// Runs one tick of the full design against the extracted features.
    pub fn handle(&self, state: &mut JumpState, features: &Features, grounded: bool) -> JumpStep {
        let mut started = None;
        for rule in RULES {
            if !rule.may_replace(state.cause(), grounded) {
                continue;
            }
            if let Some(duration) = self.proposal(rule, features) {
                state.begin(rule.cause(), duration);
                started = Some((state.cause(), state.target));
            }
        }
        Self::finish(state, started)
    }

    /// Runs one tick of the classic design.
    pub fn handle_classic(
        &self,
        state: &mut JumpState,
        features: &ClassicFeatures,
        grounded: bool,
    ) -> JumpStep {
        let mut started = None;
        for rule in CLASSIC_RULES {
            if state.is_active() || !grounded {
                continue;
            }
            let proposal = match rule {
                Rule::Threat if features.enemy_nearby => Some(self.tuning.classic_threat_duration),
                Rule::Wall if features.wall_in_front => Some(self.tuning.classic_wall_duration),
                _ => None,
            };
            if let Some(duration) = proposal {
                state.begin(rule.cause(), duration);
                started = Some((state.cause(), state.target));
            }
        }

        let mut step = Self::finish(state, started);
        if step.resolved.is_some() {
            step.held = false;
        }
        step
    }

    /// Duration of a threat-triggered jump, or `None` when the threat sits too
    /// far below to be worth jumping at.
    #[must_use]
    pub fn threat_duration(&self, contact: &ThreatContact, clearance: Option<u32>) -> Option<u32> {
        let tuning = &self.tuning;
        let dx = contact.offset.x.abs();
        let dy = contact.offset.y;

        if dy.abs() <= tuning.threat_level_band {
            return Some(tuning.threat_short_duration);
        }
        if dy < 0.0 {
            if dx <= tuning.threat_close_range {
                return Some(clearance.map_or(tuning.threat_high_duration, |rows| {
                    rows.saturating_sub(1).max(1)
                }));
            }
            return Some(tuning.threat_medium_duration);
        }
        if dy <= tuning.threat_medium_below {
            return Some(tuning.threat_medium_duration);
        }
        None
    }

    /// Duration of a wall-triggered jump for a wall of the provided height.
    #[must_use]
    pub fn wall_duration(&self, height: u32) -> u32 {
        if height >= self.tuning.wall_tall_height {
            height.saturating_add(self.tuning.wall_margin)
        } else {
            self.tuning.wall_short_duration
        }
    }

    fn proposal(&self, rule: Rule, features: &Features) -> Option<u32> {
        match rule {
            Rule::Threat => features
                .threat
                .and_then(|contact| self.threat_duration(&contact, features.ceiling_clearance)),
            Rule::Wall => {
                (features.wall_height > 0).then(|| self.wall_duration(features.wall_height))
            }
            Rule::Stairs => (features.staircase_length > self.tuning.stairs_min_length)
                .then(|| {
                    features
                        .staircase_length
                        .saturating_add(self.tuning.stairs_margin)
                }),
            Rule::Gap => (features.gap_width > 0).then_some(self.tuning.gap_duration),
        }
    }

    fn finish(state: &mut JumpState, started: Option<(JumpCause, u32)>) -> JumpStep {
        if !state.is_active() {
            return JumpStep {
                held: false,
                started,
                resolved: None,
            };
        }

        let cause = state.cause();
        let resolved = state.advance().then_some(cause);
        JumpStep {
            held: true,
            started,
            resolved,
        }
    }
}
