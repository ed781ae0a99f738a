//! `egopose-cli` – command line front end for the trajectory converter.
//!
//! Reads settings from `~/.egopose/config.toml` (plus `EGOPOSE_*` env
//! overrides), lets flags override them, and exchanges trajectories as JSON
//! on stdin/stdout:
//!
//! - `egopose validate` – round-trip a seeded random trajectory and report
//!   the reconstruction error.
//! - `egopose convert` – `[[9]...]` rows in, `Ts_world_cpf` `[[7]...]` out.
//! - `egopose invert` – `[[7]...]` rows in, `[[9]...]` rows out.
//! - `egopose schema` – JSON Schema of the exchange records.
//! - `egopose config` – show (and optionally persist) the effective config.

mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use egopose_trajectory::synthetic::random_trajectory;
use egopose_trajectory::{
    ConversionConfig, DEFAULT_TOLERANCE, RoundTripReport, TrajectoryAssembler,
    frame_interval_ns_from_fps, invert_trajectory, validate_round_trip,
};
use egopose_types::{InitialFramePolicy, PoseTrajectory, RawPose6D, TrajectoryWarning};
use serde::Serialize;
use std::io::Read;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "egopose", version)]
#[command(about = "Convert 6D-rotation trajectories to wxyz+xyz SE3 pose buffers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Round-trip a random trajectory and report the reconstruction error
    Validate {
        /// Number of frames (default from config: 80)
        #[arg(long)]
        frames: Option<usize>,
        /// Floor height in metres
        #[arg(long, allow_negative_numbers = true)]
        floor: Option<f64>,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Initial frame policy: extrapolate, repeat_first, identity
        #[arg(long)]
        policy: Option<InitialFramePolicy>,
        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Read `[[r0..r5, x, y, z], ...]` on stdin, write the pose trajectory on stdout
    Convert {
        #[arg(long, allow_negative_numbers = true)]
        floor: Option<f64>,
        /// Frame rate used for the timestamps
        #[arg(long)]
        fps: Option<f64>,
        #[arg(long)]
        policy: Option<InitialFramePolicy>,
        /// Remove q → −q sign flips between consecutive frames
        #[arg(long)]
        continuity: bool,
    },
    /// Read `[[w, x, y, z, x, y, z], ...]` (T + 1 rows) on stdin, write raw rows on stdout
    Invert {
        #[arg(long, allow_negative_numbers = true)]
        floor: Option<f64>,
    },
    /// Print the JSON Schema of the exchange records
    Schema,
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to ~/.egopose/config.toml
        #[arg(long)]
        save: bool,
    },
}

/// Output of `egopose validate --json`.
#[derive(Serialize)]
struct ValidateOutput {
    #[serde(flatten)]
    report: RoundTripReport,
    floor_offset: f64,
    initial_frame: InitialFramePolicy,
    tolerance: f64,
    passes: bool,
}

/// Output of `egopose convert`, keyed the way the body-pose model expects.
#[derive(Serialize)]
struct ConvertOutput {
    #[serde(rename = "Ts_world_cpf")]
    ts_world_cpf: Vec<[f64; 7]>,
    timestamps_ns: Vec<u64>,
    warnings: Vec<TrajectoryWarning>,
}

impl From<&PoseTrajectory> for ConvertOutput {
    fn from(traj: &PoseTrajectory) -> Self {
        Self {
            ts_world_cpf: traj.to_rows(),
            timestamps_ns: traj.timestamps_ns().to_vec(),
            warnings: traj.warnings().to_vec(),
        }
    }
}

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG sets the filter (default "info"); EGOPOSE_LOG_FORMAT=json
    // switches to newline-delimited JSON.  Logs go to stderr so stdout stays
    // a clean JSON stream.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("EGOPOSE_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    let cli = Cli::parse();

    let mut cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config unreadable; using defaults");
            config::Config::default()
        }
    };

    let result = match cli.command {
        Command::Validate {
            frames,
            floor,
            seed,
            policy,
            json,
        } => {
            if let Some(h) = floor {
                cfg.floor_offset = h;
            }
            if let Some(p) = policy {
                cfg.initial_frame = p;
            }
            run_validate(
                &cfg,
                frames.unwrap_or(cfg.validation_frames),
                seed.unwrap_or(cfg.validation_seed),
                json,
            )
        }
        Command::Convert {
            floor,
            fps,
            policy,
            continuity,
        } => {
            if let Some(h) = floor {
                cfg.floor_offset = h;
            }
            if let Some(f) = fps {
                cfg.fps = f;
            }
            if let Some(p) = policy {
                cfg.initial_frame = p;
            }
            cfg.enforce_sign_continuity |= continuity;
            run_convert(&cfg)
        }
        Command::Invert { floor } => run_invert(floor.unwrap_or(cfg.floor_offset)),
        Command::Schema => run_schema(),
        Command::Config { save } => run_config(&cfg, save),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn run_validate(
    cfg: &config::Config,
    frames: usize,
    seed: u64,
    json: bool,
) -> Result<ExitCode, String> {
    let conversion = cfg.conversion().map_err(|e| e.to_string())?;
    info!(
        frames,
        seed,
        floor = conversion.floor_offset,
        policy = %conversion.initial_frame,
        "validating round trip"
    );

    let raw = random_trajectory(frames, seed);
    let report = validate_round_trip(&raw, &conversion).map_err(|e| e.to_string())?;
    let passes = report.passes(DEFAULT_TOLERANCE);
    let code = if passes {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if json {
        write_stdout_json(&ValidateOutput {
            report,
            floor_offset: conversion.floor_offset,
            initial_frame: conversion.initial_frame,
            tolerance: DEFAULT_TOLERANCE,
            passes,
        })?;
        return Ok(code);
    }

    println!("  {}", "Round-trip validation".bold());
    println!("    frames:               {}", report.frames);
    println!("    floor offset:         {:.3} m", conversion.floor_offset);
    println!("    initial frame:        {}", conversion.initial_frame);
    println!("    max error:            {:.2e}", report.max_abs_error);
    println!("    mean error:           {:.2e}", report.mean_abs_error);
    println!("    |q| deviation (max):  {:.2e}", report.max_quaternion_norm_error);

    if passes {
        println!("  {} conversion is accurate", "✓".green().bold());
    } else {
        println!(
            "  {} error exceeds {:.0e}",
            "✗".red().bold(),
            DEFAULT_TOLERANCE
        );
    }
    Ok(code)
}

fn run_convert(cfg: &config::Config) -> Result<ExitCode, String> {
    let conversion = cfg.conversion().map_err(|e| e.to_string())?;
    let rows: Vec<Vec<f64>> = read_stdin_json()?;
    let raw = RawPose6D::from_rows(&rows).map_err(|e| e.to_string())?;

    let traj = TrajectoryAssembler::new(conversion)
        .and_then(|a| a.assemble(&raw))
        .map_err(|e| e.to_string())?;
    for w in traj.warnings() {
        warn!(warning = %w, "conversion warning");
    }

    write_stdout_json(&ConvertOutput::from(&traj))?;
    Ok(ExitCode::SUCCESS)
}

fn run_invert(floor_offset: f64) -> Result<ExitCode, String> {
    let rows: Vec<Vec<f64>> = read_stdin_json()?;
    let traj = PoseTrajectory::from_rows(&rows).map_err(|e| e.to_string())?;
    let raw: Vec<[f64; 9]> = invert_trajectory(&traj, floor_offset)
        .iter()
        .map(RawPose6D::to_row)
        .collect();
    write_stdout_json(&raw)?;
    Ok(ExitCode::SUCCESS)
}

fn run_schema() -> Result<ExitCode, String> {
    let schemas = serde_json::json!({
        "raw_pose_6d": schemars::schema_for!(RawPose6D),
        "pose_trajectory": schemars::schema_for!(PoseTrajectory),
        "conversion_config": schemars::schema_for!(ConversionConfig),
    });
    write_stdout_json(&schemas)?;
    Ok(ExitCode::SUCCESS)
}

fn run_config(cfg: &config::Config, save: bool) -> Result<ExitCode, String> {
    let path = config::config_path();
    println!("  Config file: {}", path.display().to_string().bold());
    let rendered =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to render config: {}", e))?;
    println!("{}", rendered);

    match frame_interval_ns_from_fps(cfg.fps) {
        Ok(ns) => println!("  frame interval: {} ns", ns),
        Err(e) => println!("  {}: {}", "invalid".yellow(), e),
    }

    if save {
        config::save(cfg)?;
        println!("  {} Config saved to {}", "✓".green().bold(), path.display());
    }
    Ok(ExitCode::SUCCESS)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn read_stdin_json<T: serde::de::DeserializeOwned>() -> Result<T, String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    serde_json::from_str(&buf).map_err(|e| format!("Failed to parse JSON input: {}", e))
}

fn write_stdout_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_accepts_negative_floor_and_policy() {
        let cli = Cli::try_parse_from([
            "egopose", "validate", "--floor", "-1.5", "--policy", "identity",
        ])
        .unwrap();
        match cli.command {
            Command::Validate { floor, policy, .. } => {
                assert_eq!(floor, Some(-1.5));
                assert_eq!(policy, Some(InitialFramePolicy::Identity));
            }
            _ => panic!("unexpected subcommand"),
        }
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["egopose", "convert", "--policy", "sideways"]).is_err());
    }

    #[test]
    fn validate_json_output_flattens_the_report() {
        let cli = Cli::try_parse_from(["egopose", "validate", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { json: true, .. }));

        let conversion = ConversionConfig::default().with_floor_offset(1.3);
        let report = validate_round_trip(&random_trajectory(4, 2), &conversion).unwrap();
        let out = ValidateOutput {
            report,
            floor_offset: conversion.floor_offset,
            initial_frame: conversion.initial_frame,
            tolerance: DEFAULT_TOLERANCE,
            passes: report.passes(DEFAULT_TOLERANCE),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["frames"], 4);
        assert_eq!(json["initial_frame"], "extrapolate");
        assert_eq!(json["passes"], true);
    }

    #[test]
    fn invert_input_with_zero_quaternion_is_rejected() {
        let rows = vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5],
        ];
        assert!(PoseTrajectory::from_rows(&rows).is_err());
    }

    #[test]
    fn convert_output_uses_model_key() {
        let raw = random_trajectory(2, 0);
        let traj = egopose_trajectory::convert_trajectory(&raw, 0.0, 100).unwrap();
        let json = serde_json::to_value(ConvertOutput::from(&traj)).unwrap();
        assert_eq!(json["Ts_world_cpf"].as_array().unwrap().len(), 3);
        assert_eq!(json["timestamps_ns"], serde_json::json!([0, 100]));
    }
}
