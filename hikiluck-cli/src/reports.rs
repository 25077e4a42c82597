use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use colored::{ColoredString, Colorize};
use hikiluck_core::scoring::keys;
use hikiluck_core::{Evaluation, IndicatorRow, OutputValue};

use crate::calibration::{CalibrationRecord, NOMINAL_EXCEED_RATE};
use crate::scenarios::ScenarioResult;

const MISSING: &str = "n/a";

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_value(value: &OutputValue) -> String {
    match value {
        OutputValue::Number(v) => format_number(*v),
        OutputValue::Tag(tag) => tag.clone(),
        OutputValue::Unavailable => MISSING.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn format_option(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), format_number)
}

fn csv_option(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn colored_direction(direction: Option<&str>) -> ColoredString {
    match direction {
        Some("up") => "up".green(),
        Some("down") => "down".red(),
        Some(other) => other.normal(),
        None => MISSING.dimmed(),
    }
}

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = passed as f64 / total as f64 * 100.0;
    rate
}

pub fn evaluation_console(out: &mut dyn Write, evaluation: &Evaluation) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} {} ({}, {})",
        "🎰".bright_cyan(),
        evaluation.machine_label.bright_cyan().bold(),
        evaluation.machine_id,
        evaluation.machine_kind
    )?;
    writeln!(out, "{}", "==============================".cyan())?;

    let luck_lines = [
        (
            "Payout",
            keys::PO_LUCK_PCT,
            keys::PO_LUCK_DIRECTION,
            keys::PO_LUCK_Z,
        ),
        (
            "Hit frequency",
            keys::TS_LUCK_PCT,
            keys::TS_LUCK_DIRECTION,
            keys::TS_LUCK_Z,
        ),
        (
            "Hit value",
            keys::TY_LUCK_PCT,
            keys::TY_LUCK_DIRECTION,
            keys::TY_LUCK_Z,
        ),
    ];
    for (label, pct_key, dir_key, z_key) in luck_lines {
        let pct = format_option(evaluation.outputs.number(pct_key));
        let z = format_option(evaluation.outputs.number(z_key));
        writeln!(
            out,
            "  {label:14} rarity {pct:>8}%  {:5}  z {z}",
            colored_direction(evaluation.outputs.tag(dir_key))
        )?;
    }
    writeln!(
        out,
        "  {:14} {}  (sigma {} via {})",
        "Payout %",
        format_option(evaluation.outputs.number(keys::PAYOUT_PCT)),
        format_option(evaluation.outputs.number(keys::PO_SIGMA_SPIN)),
        evaluation
            .outputs
            .tag(keys::PO_SIGMA_SOURCE)
            .unwrap_or(MISSING)
    )?;
    writeln!(out)?;

    writeln!(out, "{}", "📋 Outputs".bright_yellow().bold())?;
    for (key, value) in evaluation.outputs.iter() {
        writeln!(out, "  {key:22} {}", format_value(value))?;
    }
    writeln!(out)?;

    if !evaluation.indicators.is_empty() {
        writeln!(out, "{}", "📈 Indicators".bright_yellow().bold())?;
        for row in &evaluation.indicators {
            writeln!(out, "{}", indicator_console_line(row))?;
        }
        writeln!(out)?;
    }

    let index = &evaluation.index;
    writeln!(
        out,
        "⭐ Luck index: {} ({}, tier {}/5)",
        index.score.to_string().bold(),
        index.tier,
        index.tier.rank()
    )?;
    writeln!(
        out,
        "Shrunk first-hit rate: {}",
        format_option(evaluation.first_hit_shrunk)
    )?;
    writeln!(out, "Generated: {}", timestamp())?;
    Ok(())
}

fn indicator_console_line(row: &IndicatorRow) -> String {
    let score = match row.score {
        Some(score) if score > 0.0 => format_number(score).green(),
        Some(score) if score < 0.0 => format_number(score).red(),
        Some(score) => format_number(score).normal(),
        None => MISSING.dimmed(),
    };
    format!(
        "  {:14} {:5} value {:>10}  baseline {:>10}  score {score}  z {}",
        row.label,
        row.method.as_str(),
        format_option(row.value),
        format_option(row.baseline),
        format_option(row.z)
    )
}

pub fn evaluation_json(out: &mut dyn Write, evaluation: &Evaluation) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, evaluation)?;
    writeln!(out)?;
    Ok(())
}

pub fn evaluation_markdown(out: &mut dyn Write, evaluation: &Evaluation) -> Result<()> {
    writeln!(out, "# Hikiluck Evaluation: {}\n", evaluation.machine_label)?;
    writeln!(out, "- **Machine id**: {}", evaluation.machine_id)?;
    writeln!(out, "- **Kind**: {}", evaluation.machine_kind)?;
    writeln!(
        out,
        "- **Luck index**: {} ({})",
        evaluation.index.score,
        evaluation.index.tier
    )?;
    writeln!(
        out,
        "- **Shrunk first-hit rate**: {}",
        format_option(evaluation.first_hit_shrunk)
    )?;
    writeln!(out, "- **Generated**: {}\n", timestamp())?;

    writeln!(out, "## Outputs\n")?;
    writeln!(out, "| Key | Value |")?;
    writeln!(out, "| --- | --- |")?;
    for (key, value) in evaluation.outputs.iter() {
        writeln!(out, "| {key} | {} |", format_value(value))?;
    }

    if !evaluation.indicators.is_empty() {
        writeln!(out, "\n## Indicators\n")?;
        writeln!(out, "| Indicator | Method | Value | Baseline | Score | z |")?;
        writeln!(out, "| --- | --- | --- | --- | --- | --- |")?;
        for row in &evaluation.indicators {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                row.label,
                row.method.as_str(),
                format_option(row.value),
                format_option(row.baseline),
                format_option(row.score),
                format_option(row.z)
            )?;
        }
    }
    Ok(())
}

pub fn evaluation_csv(out: &mut dyn Write, evaluation: &Evaluation) -> Result<()> {
    writeln!(out, "section,key,label,method,value,baseline,score,z")?;
    for (key, value) in evaluation.outputs.iter() {
        let cell = match value {
            OutputValue::Number(v) => v.to_string(),
            OutputValue::Tag(tag) => csv_field(tag),
            OutputValue::Unavailable => String::new(),
        };
        writeln!(out, "output,{key},,,{cell},,,")?;
    }
    for row in &evaluation.indicators {
        writeln!(
            out,
            "indicator,{},{},{},{},{},{},{}",
            csv_field(&row.key),
            csv_field(&row.label),
            row.method.as_str(),
            csv_option(row.value),
            csv_option(row.baseline),
            csv_option(row.score),
            csv_option(row.z)
        )?;
    }
    writeln!(
        out,
        "index,score,{},,{},,,",
        evaluation.index.tier,
        evaluation.index.score
    )?;
    writeln!(
        out,
        "index,firstHitShrunk,,,{},,,",
        csv_option(evaluation.first_hit_shrunk)
    )?;
    Ok(())
}

pub fn scenarios_console(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        "📊 Scenario Results Summary".bright_cyan().bold()
    )?;
    writeln!(out, "{}", "===========================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(passed, total))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{status} {} ({:?})",
            result.scenario_name.bold(),
            result.duration
        )?;
        for failure in &result.failures {
            writeln!(out, "     • {}", failure.red())?;
        }
    }
    Ok(())
}

pub fn scenarios_json(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn scenarios_markdown(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Hikiluck Scenario Results\n")?;
    if results.is_empty() {
        writeln!(out, "_No scenarios executed._")?;
        return Ok(());
    }

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(
        out,
        "- **Success rate**: {:.1}%",
        success_rate(passed, total)
    )?;
    writeln!(out, "- **Generated**: {}\n", timestamp())?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {status} {}\n", result.scenario_name)?;
        writeln!(out, "- **Time**: {:?}", result.duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn scenarios_csv(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "scenario,passed,duration_ms,failures")?;
    for result in results {
        writeln!(
            out,
            "{},{},{},{}",
            csv_field(&result.scenario_name),
            result.passed,
            result.duration.as_millis(),
            csv_field(&result.failures.join("; "))
        )?;
    }
    Ok(())
}

pub fn calibration_console(out: &mut dyn Write, records: &[CalibrationRecord]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🎲 Calibration Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "======================".cyan())?;
    writeln!(
        out,
        "Nominal rate of rarity > 95: {:.1}%",
        NOMINAL_EXCEED_RATE * 100.0
    )?;
    for record in records {
        let rate = format!("{:.2}%", record.exceed_95_rate * 100.0);
        let rate = if record.exceed_error().abs() <= 0.02 {
            rate.green()
        } else {
            rate.yellow()
        };
        writeln!(
            out,
            "seed {:>8}: {} sessions x {} spins at p={:.5} -> exceed {rate}, mean z {:+.3}, sd z {:.3}",
            record.seed,
            record.iterations,
            record.spins,
            record.probability,
            record.mean_z,
            record.std_z
        )?;
    }
    Ok(())
}

pub fn calibration_json(out: &mut dyn Write, records: &[CalibrationRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, records)?;
    writeln!(out)?;
    Ok(())
}

pub fn calibration_markdown(out: &mut dyn Write, records: &[CalibrationRecord]) -> Result<()> {
    writeln!(out, "# Hikiluck Calibration Results\n")?;
    writeln!(out, "- **Generated**: {}", timestamp())?;
    writeln!(
        out,
        "- **Nominal exceedance**: {:.1}%\n",
        NOMINAL_EXCEED_RATE * 100.0
    )?;
    writeln!(
        out,
        "| Seed | Sessions | Spins | p | Exceed > 95 | Mean z | SD z |"
    )?;
    writeln!(out, "| --- | --- | --- | --- | --- | --- | --- |")?;
    for record in records {
        writeln!(
            out,
            "| {} | {} | {} | {:.5} | {:.2}% | {:.3} | {:.3} |",
            record.seed,
            record.iterations,
            record.spins,
            record.probability,
            record.exceed_95_rate * 100.0,
            record.mean_z,
            record.std_z
        )?;
    }
    Ok(())
}

pub fn calibration_csv(out: &mut dyn Write, records: &[CalibrationRecord]) -> Result<()> {
    writeln!(
        out,
        "seed,iterations,spins,probability,exceed_95_rate,mean_z,std_z"
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            record.seed,
            record.iterations,
            record.spins,
            record.probability,
            record.exceed_95_rate,
            record.mean_z,
            record.std_z
        )?;
    }
    Ok(())
}
