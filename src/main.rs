use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use journey_sankey::pipeline;
use journey_sankey::{
    AggregationWarning, DiagramRenderer, HtmlRenderer, InputFormat, JsonRenderer, LinkWeight,
    MalformedPolicy, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "journey-sankey")]
#[command(about = "Aggregate patient condition journeys into a Sankey diagram")]
struct Args {
    /// Delimited input file
    input: PathBuf,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input layout
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// Number of stages every journey must have. Inferred when omitted:
    /// the stage columns of a wide file, the longest journey of an event
    /// log (shorter event histories are then skipped)
    #[arg(short, long)]
    stages: Option<usize>,

    /// Fail on the first journey with the wrong number of stages
    #[arg(long)]
    strict: bool,

    /// Patient id column (wide format)
    #[arg(long)]
    id_column: Option<String>,

    /// Stage columns in order, comma separated (wide format)
    #[arg(long, value_delimiter = ',')]
    stage_columns: Vec<String>,

    /// Patient column (events format)
    #[arg(long)]
    patient_column: Option<String>,

    /// Condition label column (events format)
    #[arg(long)]
    label_column: Option<String>,

    /// Observation date column (events format)
    #[arg(long)]
    date_column: Option<String>,

    /// Field delimiter
    #[arg(short, long)]
    delimiter: Option<String>,

    /// What link width represents
    #[arg(short, long, value_enum)]
    weight: Option<LinkWeight>,

    /// Diagram title
    #[arg(long)]
    title: Option<String>,

    /// Write the Sankey diagram as an HTML page
    #[arg(long)]
    html: Option<PathBuf>,

    /// Export the transition links as JSON
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Aggregate across this many parallel shards
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Do not print the transition table
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Command-line flags take precedence over file and environment settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(stages) = self.stages {
            settings.stages = Some(stages);
        }
        if self.strict {
            settings.policy = MalformedPolicy::Strict;
        }
        if let Some(ref column) = self.id_column {
            settings.wide.id_column = Some(column.clone());
        }
        if !self.stage_columns.is_empty() {
            settings.wide.stage_columns = self.stage_columns.clone();
        }
        if let Some(ref column) = self.patient_column {
            settings.events.patient = column.clone();
        }
        if let Some(ref column) = self.label_column {
            settings.events.label = column.clone();
        }
        if let Some(ref column) = self.date_column {
            settings.events.date = column.clone();
        }
        if let Some(ref delimiter) = self.delimiter {
            settings.delimiter = delimiter.clone();
        }
        if let Some(weight) = self.weight {
            settings.weight = weight;
        }
        if let Some(ref title) = self.title {
            settings.title = title.clone();
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    init_tracing(&settings.log_level);

    let mut source = pipeline::open_source(&settings, &args.input)?;
    let aggregation = pipeline::run(&settings, source.as_mut())?;
    let diagram = pipeline::diagram(&settings, &aggregation);

    if !args.quiet {
        print!("{}", pipeline::report(&aggregation)?);
        for record in &aggregation.skipped {
            println!("skipped: {}", record);
        }
    }
    if aggregation.warnings.contains(&AggregationWarning::EmptyInput) {
        eprintln!("warning: no journeys were aggregated");
    }

    if let Some(ref path) = args.html {
        HtmlRenderer::default().write_to(&diagram, path)?;
        info!(path = %path.display(), "wrote Sankey diagram");
    }
    if let Some(ref path) = args.export {
        JsonRenderer.write_to(&diagram, path)?;
        info!(path = %path.display(), "exported transition links");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let args = Args::parse_from([
            "journey-sankey",
            "conditions.csv",
            "--format",
            "events",
            "--stages",
            "3",
            "--strict",
            "--date-column",
            "onset",
            "--weight",
            "total-days",
            "--stage-columns",
            "v1,v2,v3",
            "-j",
            "4",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.format, InputFormat::Events);
        assert_eq!(settings.stages, Some(3));
        assert_eq!(settings.policy, MalformedPolicy::Strict);
        assert_eq!(settings.events.date, "onset");
        assert_eq!(settings.events.patient, "PATIENT");
        assert_eq!(settings.weight, LinkWeight::TotalDays);
        assert_eq!(settings.wide.stage_columns, vec!["v1", "v2", "v3"]);
        assert_eq!(settings.jobs, 4);
    }

    #[test]
    fn unset_flags_keep_settings() {
        let args = Args::parse_from(["journey-sankey", "cohort.csv"]);
        let mut settings = Settings {
            stages: Some(5),
            policy: MalformedPolicy::Strict,
            ..Settings::default()
        };
        args.apply(&mut settings);

        assert_eq!(settings.stages, Some(5));
        assert_eq!(settings.policy, MalformedPolicy::Strict);
        assert_eq!(settings.format, InputFormat::Wide);
    }
}
