//! Offline replay harness: run a recorded session file through the pipeline
//! and print the analysis result as JSON.
//!
//! The input file holds raw recorded buffers (angle samples and/or force
//! samples); subject and protocol come from flags so the same capture can be
//! re-analyzed under different configurations.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use jump_analyzer::config::{
    CameraAngle, DetectionMethod, JumpProtocol, PipelineConfig, Subject, TestConfig,
};
use jump_analyzer::metrics::MetricsEngine;
use jump_analyzer::session::series::{ForceSample, JointAngleSample};
use jump_analyzer::session::CaptureSession;

fn main() -> ExitCode {
    jump_analyzer::init_logging();
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jump-replay error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "jump-replay", about = "Offline jump analysis replay harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Analyze(args) => analyze_command(args),
            Command::Hint(args) => hint_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded session file and print the analysis result.
    Analyze(AnalyzeArgs),
    /// Print the coaching hint for a protocol.
    Hint(HintArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Recorded session file (JSON with "angles" and/or "forces" arrays).
    #[arg(long)]
    input: PathBuf,
    /// Optional pipeline config file; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    protocol: ProtocolArg,
    #[arg(long, value_enum)]
    method: MethodArg,
    #[arg(long, value_enum, default_value_t = AngleArg::Sagittal)]
    camera_angle: AngleArg,
    /// Box height in cm (drop jumps).
    #[arg(long)]
    drop_height: Option<f64>,
    /// Subject weight in kg.
    #[arg(long)]
    weight: f64,
    /// Subject height in cm.
    #[arg(long, default_value_t = 175.0)]
    height: f64,
    #[arg(long, default_value_t = 25)]
    age: u32,
    #[arg(long, default_value = "unspecified")]
    gender: String,
    /// Destination file for the result JSON (stdout when omitted).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HintArgs {
    #[arg(long, value_enum)]
    protocol: ProtocolArg,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ProtocolArg {
    Cmj,
    Sj,
    Dj,
}

impl From<ProtocolArg> for JumpProtocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Cmj => JumpProtocol::Cmj,
            ProtocolArg::Sj => JumpProtocol::Sj,
            ProtocolArg::Dj => JumpProtocol::Dj,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum MethodArg {
    Camera,
    Imu,
}

impl From<MethodArg> for DetectionMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Camera => DetectionMethod::Camera,
            MethodArg::Imu => DetectionMethod::Imu,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum AngleArg {
    Sagittal,
    Frontal,
}

impl From<AngleArg> for CameraAngle {
    fn from(arg: AngleArg) -> Self {
        match arg {
            AngleArg::Sagittal => CameraAngle::Sagittal,
            AngleArg::Frontal => CameraAngle::Frontal,
        }
    }
}

/// On-disk format for recorded session buffers
#[derive(Deserialize, Debug, Default)]
struct ReplayFile {
    #[serde(default)]
    angles: Vec<JointAngleSample>,
    #[serde(default)]
    left_angles: Vec<JointAngleSample>,
    #[serde(default)]
    forces: Vec<ForceSample>,
}

fn analyze_command(args: AnalyzeArgs) -> Result<()> {
    if args.weight <= 0.0 {
        bail!("subject weight must be positive (got {} kg)", args.weight);
    }

    let contents = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read session file {:?}", args.input))?;
    let replay: ReplayFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse session file {:?}", args.input))?;

    let pipeline = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path),
        None => PipelineConfig::default(),
    };

    let config = TestConfig {
        protocol: args.protocol.into(),
        method: args.method.into(),
        camera_angle: args.camera_angle.into(),
        drop_height_cm: args.drop_height,
    };
    let subject = Subject {
        height_cm: args.height,
        weight_kg: args.weight,
        age_years: args.age,
        gender: args.gender.clone(),
    };

    let engine = MetricsEngine::new(pipeline);
    let mut session = CaptureSession::new(config, subject);
    session.start().context("failed to start replay session")?;

    for sample in &replay.angles {
        session.push_angle(sample.time_seconds, sample.angle_degrees);
    }
    for sample in &replay.left_angles {
        session.push_left_angle(sample.time_seconds, sample.angle_degrees);
    }
    for sample in &replay.forces {
        session.push_force(sample.time_millis, sample.force_newtons);
    }

    let result = session
        .stop(&engine)
        .context("metrics derivation failed for the replayed session")?;

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write result to {:?}", path))?;
            eprintln!("result written to {:?}", path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn hint_command(args: HintArgs) -> Result<()> {
    let protocol: JumpProtocol = args.protocol.into();
    println!("{}", protocol.hint());
    Ok(())
}
