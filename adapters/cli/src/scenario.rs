use std::{fs, path::Path, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use skull_event_core::{EntityTemplate, SpawnArea, StageConfig};

/// Designer-authored description of one skull event scene.
///
/// A file without an `[area]` or `[template]` table leaves that reference
/// unset, which stops spawning with a warning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Scheduler tuning.
    #[serde(default)]
    pub(crate) stage: StageConfig,
    /// Region entities spawn above.
    pub(crate) area: Option<SpawnArea>,
    /// Prefab entities are instantiated from.
    pub(crate) template: Option<EntityTemplate>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            stage: StageConfig::default(),
            area: Some(SpawnArea::new(-8.0, 8.0, -4.0, 0.0)),
            template: Some(EntityTemplate::default()),
        }
    }
}

impl Scenario {
    /// Loads and validates a scenario from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario in {}", path.display()))
    }

    /// Parses and validates scenario TOML contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.stage.validate()?;
        if let Some(area) = &scenario.area {
            area.validate()?;
        }
        if let Some(template) = &scenario.template {
            template.validate()?;
        }
        Ok(scenario)
    }
}

/// Stage change scheduled at a point on the simulated clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StageCue {
    /// Simulated time the stage becomes active.
    pub(crate) at: Duration,
    /// Stage to activate.
    pub(crate) stage: i32,
}

/// Parses `seconds:stage` pairs separated by commas, e.g. `0:1,30:2,60:0`.
///
/// Cues are returned in time order; cues sharing a time keep their written order.
pub(crate) fn parse_stage_cues(value: &str) -> Result<Vec<StageCue>> {
    let mut cues = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((at, stage)) = entry.split_once(':') else {
            bail!("stage cue `{entry}` must look like `seconds:stage`");
        };
        let at: f32 = at
            .trim()
            .parse()
            .with_context(|| format!("invalid time in stage cue `{entry}`"))?;
        let Ok(at) = Duration::try_from_secs_f32(at) else {
            bail!("stage cue `{entry}` must start at a representable non-negative time");
        };
        let stage: i32 = stage
            .trim()
            .parse()
            .with_context(|| format!("invalid stage in stage cue `{entry}`"))?;
        cues.push(StageCue { at, stage });
    }

    ensure!(!cues.is_empty(), "at least one stage cue is required");
    cues.sort_by_key(|cue| cue.at);
    Ok(cues)
}
