use std::{fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use glam::Vec2;
use platformer_agent_core::{HostileActors, Observation, TileGrid, TilePos};
use serde::Deserialize;

/// Scenario file version understood by the loader.
const SUPPORTED_SCENARIO_VERSION: u32 = 1;

/// Ordered list of observations replayed through the agent.
#[derive(Clone, Debug)]
pub(crate) struct Scenario {
    frames: Vec<Observation>,
}

impl Scenario {
    /// Reads and parses a scenario from the provided TOML file.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses scenario TOML contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if file.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                file.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }

        let mut frames = Vec::new();
        let mut grid: Option<TileGrid> = None;
        for (index, spec) in file.frames.into_iter().enumerate() {
            if let Some(rows) = &spec.rows {
                grid = Some(parse_rows(rows).with_context(|| format!("frame {index}"))?);
            }
            let Some(current) = grid.as_ref() else {
                bail!("frame {index} has no tile rows and no earlier frame to inherit them from");
            };
            ensure!(spec.repeat > 0, "frame {index} repeats zero times");

            let observation = Observation {
                position: Vec2::from_array(spec.position),
                tile: TilePos::new(spec.tile[0], spec.tile[1]),
                hostiles: HostileActors::from_flat(&spec.hostiles),
                grid: current.clone(),
                grounded: spec.grounded,
            };
            for _ in 0..spec.repeat {
                frames.push(observation.clone());
            }
        }

        ensure!(!frames.is_empty(), "scenario contains no frames");
        Ok(Self { frames })
    }

    /// Observations in replay order, with repeats expanded.
    pub(crate) fn frames(&self) -> &[Observation] {
        &self.frames
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    version: u32,
    frames: Vec<FrameSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameSpec {
    position: [f32; 2],
    tile: [i32; 2],
    #[serde(default = "grounded_by_default")]
    grounded: bool,
    #[serde(default)]
    hostiles: Vec<f32>,
    #[serde(default)]
    rows: Option<Vec<String>>,
    #[serde(default = "single_tick")]
    repeat: u32,
}

const fn grounded_by_default() -> bool {
    true
}

const fn single_tick() -> u32 {
    1
}

/// Converts top-to-bottom text rows into a grid.
///
/// `.` and spaces are passable, `#` is solid ground and a digit stores that
/// code verbatim.
fn parse_rows(rows: &[String]) -> Result<TileGrid> {
    let mut parsed = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let mut codes = Vec::with_capacity(row.len());
        for (column, symbol) in row.chars().enumerate() {
            let code = match symbol {
                '.' | ' ' => 0,
                '#' => 1,
                digit if digit.is_ascii_digit() => i32::from(digit as u8 - b'0'),
                other => bail!("unknown tile symbol `{other}` at row {row_index}, column {column}"),
            };
            codes.push(code);
        }
        parsed.push(codes);
    }
    TileGrid::from_rows(parsed).context("tile rows do not form a rectangle")
}
