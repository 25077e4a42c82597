mod calibration;
mod catalog;
mod reports;
mod scenarios;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use calibration::{CalibrationPlan, DEFAULT_PROBABILITY, run_calibration};
use catalog::{MachineCatalog, record_from_file};
use hikiluck_core::{Evaluation, Evaluator, ScoringSettings, SessionObservation, evaluate};
use scenarios::{ScenarioResult, list_scenarios, run_scenarios, scenario_keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Score one session against one machine
    Evaluate,
    /// Run the built-in acceptance scenarios
    Scenarios,
    /// Monte-Carlo calibration of the hit-frequency estimator
    Calibrate,
}

#[derive(Debug, Parser)]
#[command(name = "hikiluck", version)]
#[command(about = "How lucky was that slot session? Scores sessions against machine baselines")]
struct Args {
    /// What to run
    #[arg(long, value_enum, default_value_t = Mode::Evaluate)]
    mode: Mode,

    /// Machine record file (takes precedence over --machine-id)
    #[arg(long)]
    machine: Option<PathBuf>,

    /// Directory searched recursively for machine records
    #[arg(long, default_value = "data/machines")]
    machines_dir: PathBuf,

    /// Machine id to look up in --machines-dir
    #[arg(long)]
    machine_id: Option<String>,

    /// Session observation file
    #[arg(long)]
    session: Option<PathBuf>,

    /// Optional scoring settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Scenarios to run (comma-separated, `all` for every built-in)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// List the machines found in --machines-dir and exit
    #[arg(long)]
    list_machines: bool,

    /// Seeds for calibration (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Simulated sessions per seed (calibrate mode)
    #[arg(long, default_value_t = 200)]
    iterations: usize,

    /// Spins per simulated session (calibrate mode)
    #[arg(long, default_value_t = 4_000)]
    spins: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? || maybe_list_machines(&args)? {
        return Ok(());
    }

    if shows_banner(&args) {
        announce_banner();
    }

    let start_time = Instant::now();
    match args.mode {
        Mode::Evaluate => {
            let evaluation = run_evaluation(&args)?;
            write_evaluation(&args, &evaluation)?;
        }
        Mode::Scenarios => {
            let names = expand_scenarios(&args.scenarios);
            let results = run_scenarios(&names, args.verbose);
            write_scenario_reports(&args, &results, start_time)?;
            if results.iter().any(|r| !r.passed) {
                std::process::exit(1);
            }
        }
        Mode::Calibrate => run_calibrate(&args)?,
    }
    Ok(())
}

fn shows_banner(args: &Args) -> bool {
    args.output.is_some() || matches!(args.report.as_str(), "console" | "markdown")
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn maybe_list_machines(args: &Args) -> Result<bool> {
    if !args.list_machines {
        return Ok(false);
    }
    let catalog = MachineCatalog::load_dir(&args.machines_dir)?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target.writer(),
        "Available machines ({}):",
        catalog.len()
    )?;
    for entry in catalog.entries() {
        writeln!(
            output_target.writer(),
            "  {:25} - {} [{}]",
            entry.id,
            entry.label,
            entry.kind
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎰 Hikiluck".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_seeds(input: &str) -> Result<Vec<u64>> {
    split_csv(input)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed {token}"))
        })
        .collect()
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {what} {}", path.display()))
}

fn load_settings(args: &Args) -> Result<ScoringSettings> {
    let Some(path) = &args.settings else {
        return Ok(ScoringSettings::default());
    };
    let text = read_text(path, "settings")?;
    ScoringSettings::from_json(&text)
        .with_context(|| format!("invalid settings in {}", path.display()))
}

fn load_session(args: &Args) -> Result<SessionObservation> {
    let Some(path) = &args.session else {
        bail!("--session is required in evaluate mode");
    };
    let text = read_text(path, "session")?;
    SessionObservation::from_json(&text)
        .with_context(|| format!("invalid session in {}", path.display()))
}

fn run_evaluation(args: &Args) -> Result<Evaluation> {
    let session = load_session(args)?;
    let settings = load_settings(args)?;

    if let Some(path) = &args.machine {
        let text = read_text(path, "machine")?;
        let machine = record_from_file(path, &text)
            .with_context(|| format!("invalid machine record {}", path.display()))?;
        log::info!("evaluating {} from {}", machine.machine_id, path.display());
        return Ok(evaluate(&machine, &session, &settings));
    }

    let Some(machine_id) = &args.machine_id else {
        bail!("evaluate mode needs --machine <file> or --machine-id <id>");
    };
    let catalog = MachineCatalog::load_dir(&args.machines_dir)?;
    let evaluator = Evaluator::new(catalog, settings);
    evaluator.evaluate(machine_id, &session).with_context(|| {
        format!(
            "machine {machine_id} not found in {}",
            args.machines_dir.display()
        )
    })
}

fn write_evaluation(args: &Args, evaluation: &Evaluation) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::evaluation_json(&mut output_target, evaluation)?,
        "markdown" => reports::evaluation_markdown(&mut output_target, evaluation)?,
        "csv" => reports::evaluation_csv(&mut output_target, evaluation)?,
        _ => reports::evaluation_console(&mut output_target, evaluation)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn write_scenario_reports(
    args: &Args,
    results: &[ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::scenarios_json(&mut output_target, results)?,
        "markdown" => reports::scenarios_markdown(&mut output_target, results)?,
        "csv" => reports::scenarios_csv(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::scenarios_console(&mut output_target, results, start_time.elapsed())?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

fn calibration_plan(args: &Args) -> Result<CalibrationPlan> {
    let probability = if let Some(path) = &args.machine {
        let text = read_text(path, "machine")?;
        let machine = record_from_file(path, &text)
            .with_context(|| format!("invalid machine record {}", path.display()))?;
        machine
            .baseline()
            .first_hit_probability
            .unwrap_or(DEFAULT_PROBABILITY)
    } else {
        DEFAULT_PROBABILITY
    };
    if args.spins == 0 {
        bail!("--spins must be positive");
    }
    Ok(CalibrationPlan {
        probability,
        spins: args.spins,
        iterations: args.iterations,
    })
}

fn run_calibrate(args: &Args) -> Result<()> {
    let plan = calibration_plan(args)?;
    let seeds = parse_seeds(&args.seeds)?;
    if args.verbose {
        println!(
            "🎲 Calibrating p={:.5} over {} seeds x {} sessions",
            plan.probability,
            seeds.len(),
            plan.iterations
        );
    }
    let records = run_calibration(&plan, &seeds);

    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::calibration_json(&mut output_target, &records)?,
        "markdown" => reports::calibration_markdown(&mut output_target, &records)?,
        "csv" => reports::calibration_csv(&mut output_target, &records)?,
        _ => reports::calibration_console(&mut output_target, &records)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

    fn base_args() -> Args {
        Args {
            mode: Mode::Evaluate,
            machine: None,
            machines_dir: PathBuf::from(DATA_DIR).join("machines"),
            machine_id: None,
            session: None,
            settings: None,
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            list_machines: false,
            seeds: "1337".to_string(),
            iterations: 5,
            spins: 500,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hikiluck-main-{}-{name}", std::process::id()))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("all,smoke");
        assert_eq!(expanded[0], "smoke");
        assert!(expanded.contains(&"break-even".to_string()));
        assert_eq!(expanded.iter().filter(|s| *s == "smoke").count(), 1);
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("hit-extreme, smoke");
        assert_eq!(
            expanded,
            vec!["hit-extreme".to_string(), "smoke".to_string()]
        );
    }

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(
            split_csv(" 1, ,2,"),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn parse_seeds_rejects_garbage() {
        assert_eq!(parse_seeds("1,2").unwrap(), vec![1, 2]);
        assert!(parse_seeds("1,x").is_err());
    }

    #[test]
    fn banner_is_suppressed_for_machine_readable_stdout() {
        let args = base_args();
        assert!(!shows_banner(&args));
        let args = Args {
            report: "console".to_string(),
            ..base_args()
        };
        assert!(shows_banner(&args));
    }

    #[test]
    fn evaluates_machine_file() {
        let args = Args {
            machine: Some(PathBuf::from(DATA_DIR).join("machines/hokuto-at/hokuto-at.json")),
            session: Some(PathBuf::from(DATA_DIR).join("sessions/hokuto-lucky.json")),
            ..base_args()
        };
        let evaluation = run_evaluation(&args).unwrap();
        assert_eq!(evaluation.machine_id, "hokuto-at");
        assert_eq!(evaluation.outputs.tag("poLuckDirection"), Some("up"));
    }

    #[test]
    fn evaluates_catalog_machine_by_id() {
        let args = Args {
            machine_id: Some("juggler-a".to_string()),
            session: Some(PathBuf::from(DATA_DIR).join("sessions/juggler-evening.json")),
            ..base_args()
        };
        let evaluation = run_evaluation(&args).unwrap();
        assert_eq!(evaluation.machine_id, "juggler-a");
        assert_eq!(evaluation.indicators.len(), 3);
    }

    #[test]
    fn evaluate_requires_a_session() {
        let err = run_evaluation(&base_args()).unwrap_err();
        assert!(err.to_string().contains("--session"));
    }

    #[test]
    fn unknown_machine_id_is_reported() {
        let args = Args {
            machine_id: Some("ghost".to_string()),
            session: Some(PathBuf::from(DATA_DIR).join("sessions/juggler-evening.json")),
            ..base_args()
        };
        let err = run_evaluation(&args).unwrap_err();
        assert!(format!("{err:#}").contains("unknown machine id: ghost"));
    }

    #[test]
    fn settings_file_is_parsed_and_validated() {
        let path = temp_file("settings.json");
        fs::write(&path, r#"{ "scheme": "z" }"#).unwrap();
        let args = Args {
            settings: Some(path.clone()),
            ..base_args()
        };
        assert_eq!(
            load_settings(&args).unwrap().scheme,
            hikiluck_core::Scheme::Z
        );

        fs::write(&path, r#"{ "ratioCap": 0.5 }"#).unwrap();
        assert!(load_settings(&args).is_err());
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("break-even"));
    }

    #[test]
    fn maybe_list_machines_writes_catalog() {
        let temp = temp_file("machines.txt");
        let args = Args {
            list_machines: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_machines(&args).unwrap());
        let content = fs::read_to_string(temp).unwrap();
        assert!(content.contains("hokuto-at"));
        assert!(content.contains("juggler-a"));
    }

    #[test]
    fn listing_flags_default_to_off() {
        let args = base_args();
        assert!(!maybe_list_scenarios(&args).unwrap());
        assert!(!maybe_list_machines(&args).unwrap());
    }

    #[test]
    fn write_scenario_reports_emits_markdown() {
        let temp = temp_file("scenarios.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        let results = vec![ScenarioResult {
            scenario_name: "smoke".to_string(),
            passed: true,
            failures: Vec::new(),
            duration: Duration::from_millis(1),
        }];
        write_scenario_reports(&args, &results, Instant::now()).unwrap();
        let content = fs::read_to_string(temp).unwrap();
        assert!(content.contains("# Hikiluck Scenario Results"));
    }

    #[test]
    fn write_scenario_reports_console_without_results() {
        let temp = temp_file("scenarios-empty.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_scenario_reports(&args, &[], Instant::now()).unwrap();
        let content = fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn calibration_uses_machine_first_hit_baseline() {
        let args = Args {
            machine: Some(PathBuf::from(DATA_DIR).join("machines/hokuto-at/hokuto-at.json")),
            ..base_args()
        };
        let plan = calibration_plan(&args).unwrap();
        assert!((plan.probability - 0.003_663).abs() < 1e-12);

        let plan = calibration_plan(&base_args()).unwrap();
        assert!((plan.probability - DEFAULT_PROBABILITY).abs() < f64::EPSILON);
    }

    #[test]
    fn calibration_rejects_zero_spins() {
        let args = Args {
            spins: 0,
            ..base_args()
        };
        assert!(calibration_plan(&args).is_err());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
