#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Episode-owning agent that runs the decision pipeline once per tick.
//!
//! [`decide`] is the pure pipeline: it reads an [`Observation`] and the state
//! carried over from the previous tick, and returns the action vector together
//! with the next state. [`Agent`] owns that state for the length of an
//! episode and exposes the hooks the host calls.

mod config;

pub use config::{AgentConfig, ConfigError, Variant, MAX_GAP_BAND_DEPTH};

use platformer_agent_core::{Action, ActionVector, Observation, AGENT_NAME};
use platformer_agent_system_composer::{is_falling, ActionComposer};
use platformer_agent_system_jump::{JumpArbiter, JumpState, JumpStep};
use platformer_agent_system_perception::{ClassicFeatures, Features};
use tracing::{debug, trace, warn};

/// State carried from one tick to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentState {
    /// Jump in progress.
    pub jump: JumpState,
    /// Consecutive ticks LEFT has been pressed.
    pub drift: u32,
    /// Character y from the previous tick.
    pub previous_y: Option<f32>,
}

/// Output of a single pass through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// Controls for this tick.
    pub actions: ActionVector,
    /// State to carry into the next tick.
    pub state: AgentState,
    /// What the jump state machine did this tick.
    pub jump: JumpStep,
}

/// Runs the decision pipeline for one tick without touching `state`.
///
/// A malformed observation releases every control and drops the jump in
/// progress rather than failing.
#[must_use]
pub fn decide(config: &AgentConfig, observation: &Observation, state: &AgentState) -> Decision {
    let mut next = *state;
    let mut actions = ActionVector::released();

    if let Err(error) = observation.validate() {
        warn!(%error, "discarding malformed observation");
        next.jump = JumpState::idle();
        next.drift = 0;
        return Decision {
            actions,
            state: next,
            jump: JumpStep::default(),
        };
    }

    let arbiter = JumpArbiter::new(config.jump);
    let composer = ActionComposer::new(config.composer);

    let step = match config.variant {
        Variant::Full => {
            let features = Features::extract(observation, &config.perception);
            trace!(?features, "extracted features");

            let step = arbiter.handle(&mut next.jump, &features, observation.grounded);
            log_step(&step);

            let steering = composer.steer(features.facing, &mut next.drift);
            let heading = features.turned(observation, &config.perception, steering.heading());
            let falling = is_falling(state.previous_y, observation.position.y);
            let composition =
                composer.handle(&heading, steering, step.held, falling, &mut actions);
            if composition.drift_clamped {
                debug!(cap = config.composer.drift_cap, "drift limiter released LEFT");
            }
            step
        }
        Variant::Classic => {
            let features = ClassicFeatures::extract(observation);
            trace!(?features, "extracted classic features");

            let step = arbiter.handle_classic(&mut next.jump, &features, observation.grounded);
            log_step(&step);

            composer.handle_classic(step.held, &mut actions);
            next.drift = 0;
            step
        }
    };

    next.previous_y = Some(observation.position.y);
    Decision {
        actions,
        state: next,
        jump: step,
    }
}

fn log_step(step: &JumpStep) {
    if let Some((cause, duration)) = step.started {
        debug!(cause = cause.label(), duration, "jump started");
    }
    if let Some(cause) = step.resolved {
        debug!(cause = cause.label(), "jump resolved");
    }
}

/// Reactive agent driven by the host once per tick.
#[derive(Clone, Debug, Default)]
pub struct Agent {
    config: AgentConfig,
    state: AgentState,
    actions: ActionVector,
}

impl Agent {
    /// Creates an agent that will run with the provided configuration.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            state: AgentState::default(),
            actions: ActionVector::released(),
        }
    }

    /// Validates the configuration before creating the agent.
    pub fn try_new(config: AgentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Starts a new episode: clears carried state, faces right and records the
    /// starting height.
    pub fn initialize(&mut self, observation: &Observation) {
        self.state = AgentState {
            previous_y: observation
                .validate()
                .ok()
                .map(|()| observation.position.y),
            ..AgentState::default()
        };
        self.actions.clear();
        self.actions.set(Action::Right, true);
        debug!(agent = AGENT_NAME, variant = ?self.config.variant, "episode initialised");
    }

    /// Decides this tick's controls. The returned vector is overwritten on the
    /// next call.
    pub fn get_actions(&mut self, observation: &Observation) -> &ActionVector {
        let decision = decide(&self.config, observation, &self.state);
        self.state = decision.state;
        self.actions = decision.actions;
        &self.actions
    }

    /// Identifier reported to the host.
    #[must_use]
    pub const fn agent_name(&self) -> &'static str {
        AGENT_NAME
    }

    /// Configuration the agent runs with.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// State carried into the next tick.
    #[must_use]
    pub const fn state(&self) -> &AgentState {
        &self.state
    }

    /// Controls produced by the most recent tick.
    #[must_use]
    pub const fn actions(&self) -> &ActionVector {
        &self.actions
    }
}
