//! Jobpulse CLI - Command-line interface for the dashboard core
//!
//! Commands:
//! - render: Aggregate rows and emit the render command for one scene
//! - validate: Check rows against the expected dataset columns
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use jobpulse::normalizer::{
    FIELD_BENEFITS_SCORE, FIELD_JOB_TITLE, FIELD_POSTING_DATE, FIELD_SALARY_USD,
    FIELD_YEARS_EXPERIENCE,
};
use jobpulse::present::RENDER_SCHEMA_VERSION;
use jobpulse::{
    DashboardConfig, DashboardSession, MissingValuePolicy, MonthKey, MonthWindow, RawRecord,
    RecordNormalizer, Scene, UiEvent, CORE_VERSION, PRODUCER_NAME,
};

/// Jobpulse - Aggregation and scene-state core for the AI job postings dashboard
#[derive(Parser)]
#[command(name = "jobpulse")]
#[command(version = CORE_VERSION)]
#[command(about = "Aggregate job posting rows into dashboard render commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate rows and emit the render command for one scene
    Render {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Scene to render (1 = postings, 2 = salary trend, 3 = top titles)
        #[arg(long, default_value = "1")]
        scene: u8,

        /// Selected month for scene 3 (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// First month of the timeline window (YYYY-MM)
        #[arg(long, default_value = "2024-01")]
        window_start: String,

        /// Last month of the timeline window (YYYY-MM)
        #[arg(long, default_value = "2025-04")]
        window_end: String,

        /// How missing numeric fields participate in averages
        #[arg(long, default_value = "zero")]
        missing: MissingArg,
    },

    /// Check rows against the expected dataset columns
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row object per line)
    Ndjson,
    /// JSON array of row objects
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingArg {
    /// Missing values count as zero samples (legacy behavior)
    Zero,
    /// Missing values are excluded from the affected average
    Exclude,
}

impl From<MissingArg> for MissingValuePolicy {
    fn from(arg: MissingArg) -> Self {
        match arg {
            MissingArg::Zero => MissingValuePolicy::TreatAsZero,
            MissingArg::Exclude => MissingValuePolicy::ExcludeFromAverage,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input row schema
    Input,
    /// Output render command schema
    Output,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), JobsCliError> {
    match cli.command {
        Commands::Render {
            input,
            output,
            input_format,
            output_format,
            scene,
            month,
            window_start,
            window_end,
            missing,
        } => cmd_render(
            &input,
            &output,
            input_format,
            output_format,
            scene,
            month.as_deref(),
            &window_start,
            &window_end,
            missing,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_render(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    scene: u8,
    month: Option<&str>,
    window_start: &str,
    window_end: &str,
    missing: MissingArg,
) -> Result<(), JobsCliError> {
    let rows = read_rows(input, input_format)?;
    if rows.is_empty() {
        return Err(JobsCliError::NoRows);
    }

    let scene = Scene::from_number(scene).ok_or(JobsCliError::UnknownScene(scene))?;
    let window = MonthWindow::new(parse_key(window_start)?, parse_key(window_end)?)?;

    let mut session = DashboardSession::new(DashboardConfig {
        window,
        missing_policy: missing.into(),
        top_titles: DashboardConfig::DEFAULT_TOP_TITLES,
    });
    session.load_rows(rows);

    if let Some(month) = month {
        session.dispatch(UiEvent::SelectMonth(parse_key(month)?))?;
    }
    session.dispatch(UiEvent::SwitchScene(scene))?;

    let command = session.render()?;
    let rendered = match output_format {
        OutputFormat::Json => serde_json::to_string(&command)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&command)?,
    };

    write_output(output, &rendered)
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), JobsCliError> {
    let rows = read_rows(input, input_format)?;

    let mut errors = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if row.field(FIELD_POSTING_DATE).is_none() {
            errors.push(RowErrorDetail {
                index,
                error: format!("missing {FIELD_POSTING_DATE}"),
            });
        } else if RecordNormalizer::normalize(row).is_none() {
            errors.push(RowErrorDetail {
                index,
                error: format!("unparseable {FIELD_POSTING_DATE}"),
            });
        }
    }

    let report = ValidationReport {
        total_rows: rows.len(),
        valid_rows: rows.len() - errors.len(),
        invalid_rows: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} rows: {} valid, {} invalid",
            report.total_rows, report.valid_rows, report.invalid_rows
        );
        for detail in &report.errors {
            println!("  row {}: {}", detail.index, detail.error);
        }
    }

    if report.invalid_rows > 0 {
        return Err(JobsCliError::ValidationFailed(report.invalid_rows));
    }
    Ok(())
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), JobsCliError> {
    let schema = match schema_type {
        SchemaType::Input => input_json_schema(),
        SchemaType::Output => output_json_schema(),
    };
    println!("{schema}");
    Ok(())
}

fn read_rows(input: &PathBuf, format: InputFormat) -> Result<Vec<RawRecord>, JobsCliError> {
    let data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(JobsCliError::StdinIsTty);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    match format {
        InputFormat::Ndjson => data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| JobsCliError::ParseError(format!("bad row: {e}")))
            })
            .collect(),
        InputFormat::Json => serde_json::from_str(&data)
            .map_err(|e| JobsCliError::ParseError(format!("bad row array: {e}"))),
    }
}

fn write_output(output: &PathBuf, data: &str) -> Result<(), JobsCliError> {
    if output.to_string_lossy() == "-" {
        println!("{data}");
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_key(value: &str) -> Result<MonthKey, JobsCliError> {
    value.parse().map_err(JobsCliError::Core)
}

fn input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "job posting row",
        "description": "One row of the job postings dataset, all fields as decoded strings",
        "type": "object",
        "required": [FIELD_POSTING_DATE],
        "properties": {
            FIELD_POSTING_DATE: { "type": "string", "description": "YYYY-MM-DD (alternate formats accepted)" },
            FIELD_SALARY_USD: { "type": "string", "description": "annual salary in USD" },
            FIELD_YEARS_EXPERIENCE: { "type": "string", "description": "required years of experience" },
            FIELD_BENEFITS_SCORE: { "type": "string", "description": "benefits score" },
            FIELD_JOB_TITLE: { "type": "string" }
        },
        "additionalProperties": { "type": "string" }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": RENDER_SCHEMA_VERSION,
        "description": "Renderer-consumable description of one dashboard scene",
        "type": "object",
        "required": ["schema_version", "kind", "producer", "series", "annotations", "hover", "y_max"],
        "properties": {
            "schema_version": { "type": "string", "const": RENDER_SCHEMA_VERSION },
            "kind": { "type": "string", "enum": ["monthly_bars", "salary_line", "title_bars"] },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "const": PRODUCER_NAME },
                    "version": { "type": "string" },
                    "session_id": { "type": "string" }
                }
            },
            "series": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["label", "value", "draw"],
                    "properties": {
                        "label": { "type": "string" },
                        "date": { "type": "string", "format": "date" },
                        "value": { "type": "number" },
                        "draw": { "type": "boolean" }
                    }
                }
            },
            "annotations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string", "enum": ["peak", "trough"] },
                        "index": { "type": "integer" },
                        "label": { "type": "string" },
                        "value": { "type": "number" }
                    }
                }
            },
            "hover": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": { "type": "integer" },
                        "lines": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "y_max": { "type": "number" },
            "empty": {
                "type": "object",
                "properties": {
                    "reason": { "type": "string", "enum": ["no_data_for_month", "no_month_selected"] },
                    "key": { "type": "string" }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum JobsCliError {
    Io(io::Error),
    Core(jobpulse::DashboardError),
    Json(serde_json::Error),
    ParseError(String),
    NoRows,
    UnknownScene(u8),
    ValidationFailed(usize),
    StdinIsTty,
}

impl From<io::Error> for JobsCliError {
    fn from(e: io::Error) -> Self {
        JobsCliError::Io(e)
    }
}

impl From<jobpulse::DashboardError> for JobsCliError {
    fn from(e: jobpulse::DashboardError) -> Self {
        JobsCliError::Core(e)
    }
}

impl From<serde_json::Error> for JobsCliError {
    fn from(e: serde_json::Error) -> Self {
        JobsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<JobsCliError> for CliError {
    fn from(e: JobsCliError) -> Self {
        match e {
            JobsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            JobsCliError::Core(e) => CliError {
                code: "CORE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check month keys and the configured window".to_string()),
            },
            JobsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            JobsCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Rows must be JSON objects of string fields".to_string()),
            },
            JobsCliError::NoRows => CliError {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            JobsCliError::UnknownScene(n) => CliError {
                code: "UNKNOWN_SCENE".to_string(),
                message: format!("Scene {n} does not exist"),
                hint: Some("Scenes are numbered 1, 2, and 3".to_string()),
            },
            JobsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} rows failed validation"),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            JobsCliError::StdinIsTty => CliError {
                code: "STDIN_IS_TTY".to_string(),
                message: "Refusing to read rows from an interactive terminal".to_string(),
                hint: Some("Pipe NDJSON rows in or pass --input <file>".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<RowErrorDetail>,
}

#[derive(serde::Serialize)]
struct RowErrorDetail {
    index: usize,
    error: String,
}
