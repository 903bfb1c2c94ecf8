//! Layered run configuration.
//!
//! Settings are resolved from, in increasing priority:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. an optional TOML/YAML/JSON file (`--config`)
//! 3. `JOURNEY_SANKEY_*` environment variables; nested keys use `__`,
//!    e.g. `JOURNEY_SANKEY_EVENTS__DATE=onset`
//! 4. command-line flags, applied by the binary
//!
//! ```toml
//! format = "events"
//! stages = 4
//! policy = "strict"
//! weight = "total-days"
//!
//! [events]
//! patient = "PATIENT"
//! label = "DESCRIPTION"
//! date = "START"
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::{AggregateOptions, MalformedPolicy};
use crate::render::{LinkWeight, Palette, DEFAULT_TITLE};
use crate::source::{EventColumns, InputFormat, WideLayout};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "JOURNEY_SANKEY";

/// Everything a run needs besides the input path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub format: InputFormat,
    /// Stage count; inferred from the input when unset.
    pub stages: Option<usize>,
    pub policy: MalformedPolicy,
    /// Single-byte field delimiter.
    pub delimiter: String,
    pub wide: WideLayout,
    pub events: EventColumns,
    pub weight: LinkWeight,
    pub title: String,
    /// Node palette as hex colors; the default palette when empty.
    pub colors: Vec<String>,
    /// Number of aggregation shards. 1 aggregates on the calling thread.
    pub jobs: usize,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: InputFormat::default(),
            stages: None,
            policy: MalformedPolicy::default(),
            delimiter: ",".to_string(),
            wide: WideLayout::default(),
            events: EventColumns::default(),
            weight: LinkWeight::default(),
            title: DEFAULT_TITLE.to_string(),
            colors: Vec::new(),
            jobs: 1,
            log_level: "info".to_string(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("colors")
        .with_list_parse_key("wide.stage_columns")
}

impl Settings {
    /// Load settings from defaults, an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| match path {
                Some(p) => format!("loading configuration from {}", p.display()),
                None => "loading configuration".to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that the type system does not enforce.
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if let Some(stages) = self.stages {
            if stages < 2 {
                bail!("stages must be at least 2, got {}", stages);
            }
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => bail!("delimiter must be a single byte, got {:?}", self.delimiter),
        }
    }

    /// Aggregation options for a batch with the given resolved stage count.
    pub fn aggregate_options(&self, stages: usize) -> AggregateOptions {
        AggregateOptions {
            stages,
            policy: self.policy,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::new(self.colors.clone())
    }
}
