//! fuzzdx CLI
//!
//! Diagnoses one patient from raw symptom values and prints the ranked
//! diagnoses, using the reference configuration or a TOML file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fuzzdx::{DiagnosticConfig, DiagnosticEngine, PatientRecord, StrengthClassifier};

#[derive(Parser, Debug)]
#[command(name = "fuzzdx")]
#[command(about = "Intuitionistic fuzzy diagnosis from raw symptom values")]
#[command(version)]
struct Args {
    /// TOML configuration (default: reference configuration)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Patient identifier
    #[arg(long, default_value = "cli")]
    id: String,

    /// Patient display name
    #[arg(long, default_value = "anonymous")]
    name: String,

    /// Print the ranking as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Classify a 0-100 diagnosis strength and exit
    #[arg(long, allow_negative_numbers = true)]
    strength: Option<f64>,

    /// Raw symptom values, in configured symptom order
    #[arg(
        value_name = "VALUE",
        allow_negative_numbers = true,
        required_unless_present = "strength"
    )]
    values: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(strength) = args.strength {
        let label = StrengthClassifier::reference().classify(strength)?.to_string();
        println!("{strength} -> {label}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => DiagnosticConfig::from_file(path)?,
        None => DiagnosticConfig::default(),
    };
    let engine = DiagnosticEngine::from_config(&config)?;

    let patient = PatientRecord::parse(
        args.id.as_str(),
        args.name.as_str(),
        engine.symptoms(),
        args.values.as_slice(),
    )?;
    let result = engine
        .diagnose_patient(&patient)?
        .presented(engine.display_precision());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Patient: {} ({})", result.patient_name, result.patient_id);
    for (symptom, value) in engine.symptoms().iter().zip(&patient.symptoms) {
        println!("  {symptom:<12} {value}");
    }
    println!();
    println!(
        "{:<4} {:<14} {:>10} {:>14} {:>8}",
        "#", "Diagnosis", "Membership", "Non-member", "SR"
    );
    let p = engine.display_precision() as usize;
    for (position, score) in result.ranking.iter().enumerate() {
        println!(
            "{:<4} {:<14} {:>10.p$} {:>14.p$} {:>8.p$}",
            position + 1,
            score.diagnosis,
            score.membership,
            score.non_membership,
            score.score,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_values_and_flags() {
        let args = Args::try_parse_from([
            "fuzzdx", "--name", "Ada", "--json", "36.2", "1", "1", "1", "1",
        ])
        .unwrap();
        assert_eq!(args.name, "Ada");
        assert_eq!(args.id, "cli");
        assert!(args.json);
        assert_eq!(args.values, vec!["36.2", "1", "1", "1", "1"]);
    }

    #[test]
    fn test_unknown_short_flag_rejected() {
        assert!(Args::try_parse_from(["fuzzdx", "-j", "36.2", "1", "1", "1", "1"]).is_err());
        assert!(Args::try_parse_from(["fuzzdx", "36.2", "-x"]).is_err());
    }

    #[test]
    fn test_negative_values_are_positional() {
        let args = Args::try_parse_from(["fuzzdx", "36.2", "-1", "1", "1", "1"]).unwrap();
        assert_eq!(args.values[1], "-1");
    }

    #[test]
    fn test_values_required_without_strength() {
        assert!(Args::try_parse_from(["fuzzdx"]).is_err());

        let args = Args::try_parse_from(["fuzzdx", "--strength", "42"]).unwrap();
        assert_eq!(args.strength, Some(42.0));
        assert!(args.values.is_empty());
    }
}
