//! Result output formatting and writing.

use crate::orchestrator::RunResults;
use crate::OutputFormat;
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write the trajectory and summary into `output_dir`.
pub fn write_results(results: &RunResults, output_dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    let trajectory_path = match format {
        OutputFormat::Text => output_dir.join("trajectory.txt"),
        OutputFormat::Json => output_dir.join("trajectory.json"),
        OutputFormat::Csv => output_dir.join("trajectory.csv"),
    };
    let mut f = std::fs::File::create(&trajectory_path)?;

    match format {
        OutputFormat::Text => write_text(&mut f, results)?,
        OutputFormat::Json => {
            writeln!(f, "{}", serde_json::to_string_pretty(results)?)?;
        }
        OutputFormat::Csv => write_csv(&mut f, results)?,
    }
    tracing::info!("Wrote trajectory to {:?}", trajectory_path);

    let summary_path = output_dir.join("summary.txt");
    let mut f = std::fs::File::create(&summary_path)?;
    write_summary(&mut f, results)?;
    tracing::info!("Wrote summary to {:?}", summary_path);

    Ok(trajectory_path)
}

fn header(results: &RunResults) -> Vec<String> {
    let names = &results.output_names;
    let mut columns = vec!["time".to_string(), "status".to_string()];
    columns.extend(names.reals.iter().cloned());
    columns.extend(names.integers.iter().cloned());
    columns.extend(names.booleans.iter().cloned());
    columns.extend(names.strings.iter().cloned());
    columns
}

fn write_csv(f: &mut impl Write, results: &RunResults) -> Result<()> {
    writeln!(f, "{}", header(results).join(","))?;
    for point in &results.trajectory {
        let mut row = vec![point.time.to_string(), point.status.to_string()];
        row.extend(point.outputs.reals.iter().map(f64::to_string));
        row.extend(point.outputs.integers.iter().map(i32::to_string));
        row.extend(point.outputs.booleans.iter().map(bool::to_string));
        row.extend(point.outputs.strings.iter().map(|s| csv_field(s)));
        writeln!(f, "{}", row.join(","))?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_text(f: &mut impl Write, results: &RunResults) -> Result<()> {
    writeln!(f, "Trajectory: {}", results.name)?;
    writeln!(f, "{}", header(results).join("  "))?;
    for point in &results.trajectory {
        write!(f, "{:>10.4}  {:<7}", point.time, point.status.as_str())?;
        for v in &point.outputs.reals {
            write!(f, "  {:>12.6}", v)?;
        }
        for v in &point.outputs.integers {
            write!(f, "  {:>6}", v)?;
        }
        for v in &point.outputs.booleans {
            write!(f, "  {:>5}", v)?;
        }
        for v in &point.outputs.strings {
            write!(f, "  {}", v)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn write_summary(f: &mut impl Write, results: &RunResults) -> Result<()> {
    writeln!(f, "FMI Co-Simulation Run Summary")?;
    writeln!(f, "=============================")?;
    writeln!(f)?;
    writeln!(f, "Run:          {}", results.name)?;
    writeln!(f, "Policy:       {}", results.policy)?;
    writeln!(f, "Queries:      {}", results.trajectory.len().saturating_sub(1))?;
    writeln!(f, "Final point:  {}", results.final_point)?;
    writeln!(f, "Final state:  {}", results.final_state)?;
    writeln!(f, "Last status:  {}", results.final_status)?;

    if !results.slave_messages.is_empty() {
        writeln!(f)?;
        writeln!(f, "Slave messages ({}):", results.slave_messages.len())?;
        for message in &results.slave_messages {
            writeln!(f, "  {}", message)?;
        }
    }

    let worst = results
        .trajectory
        .iter()
        .fold(lib_types::FmiStatus::Ok, |acc, p| acc.worst(p.status));
    writeln!(f)?;
    if worst.is_failure() {
        writeln!(f, "Status: FAIL - slave reported {}", worst)?;
    } else {
        writeln!(f, "Status: PASS")?;
    }
    Ok(())
}

/// Print results to stdout.
pub fn print_results(results: &RunResults) {
    println!("\n=== Run Results ===\n");
    println!("  Run:         {}", results.name);
    println!("  Policy:      {}", results.policy);
    println!("  Queries:     {}", results.trajectory.len().saturating_sub(1));
    println!("  Final point: {}", results.final_point);
    println!("  Last status: {}", results.final_status);

    if let Some(last) = results.trajectory.last() {
        let names = &results.output_names;
        for (name, value) in names.reals.iter().zip(&last.outputs.reals) {
            println!("  {} = {}", name, value);
        }
        for (name, value) in names.integers.iter().zip(&last.outputs.integers) {
            println!("  {} = {}", name, value);
        }
        for (name, value) in names.booleans.iter().zip(&last.outputs.booleans) {
            println!("  {} = {}", name, value);
        }
        for (name, value) in names.strings.iter().zip(&last.outputs.strings) {
            println!("  {} = {:?}", name, value);
        }
    }

    println!();
}
