mod cli;

use std::path::Path;

use anyhow::{anyhow, Context};
use clap::Parser;
use itertools::Itertools;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynacoat::{
    Config, DynaCoat, DynaCoatParams, MeasurementHistory, OutputMode, ProgramDiff, ProgramDocument,
    SpeedLimits,
};

use cli::{AdjustArgs, Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynacoat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cmd = Cli::parse();
    let config = load_config(cmd.config.as_deref())?;

    match cmd.command {
        Command::Adjust(args) => adjust(config.as_ref(), args),
        Command::Diff { first, second } => {
            let first = load_program(&first)?;
            let second = load_program(&second)?;
            print!("{}", ProgramDiff::new(&first, &second));
            Ok(())
        }
        Command::Info { program } => {
            info(&load_program(&program)?);
            Ok(())
        }
        Command::Renumber { program, output } => {
            let mut doc = load_program(&program)?;
            doc.renumber_points().context("Failed to renumber points")?;
            let mode = config.as_ref().map_or(OutputMode::default(), Config::output_mode);
            let output = output.unwrap_or(program);
            doc.save_as(&output, mode)
                .with_context(|| format!("Failed to write {:?}", output))
        }
    }
}

/// An explicit path must load, the default location is optional.
fn load_config(path: Option<&Path>) -> anyhow::Result<Option<Config>> {
    let config = match path {
        Some(path) => Config::load_from(path).with_context(|| format!("Failed to read {:?}", path))?,
        None => match Config::load() {
            Ok((config, path)) => {
                tracing::debug!("Config loaded from {:?}", path);
                config
            }
            Err(e) => {
                tracing::debug!("No config file: {}", e);
                return Ok(None);
            }
        },
    };
    tracing::info!("{}", config);
    Ok(Some(config))
}

fn load_program(path: &Path) -> anyhow::Result<ProgramDocument> {
    ProgramDocument::load(path).with_context(|| format!("Failed to read program {:?}", path))
}

fn params(config: Option<&Config>, args: &AdjustArgs) -> anyhow::Result<DynaCoatParams> {
    let base = config.map(Config::params);
    let pick = |cli: Option<f32>, cfg: Option<f32>, name: &str| {
        cli.or(cfg)
            .ok_or_else(|| anyhow!("--{} is required without a config file", name))
    };
    Ok(DynaCoatParams {
        coats_to_apply: args
            .coats
            .or(base.map(|p| p.coats_to_apply))
            .ok_or_else(|| anyhow!("--coats is required without a config file"))?,
        target_thickness: pick(args.target, base.map(|p| p.target_thickness), "target")?,
        min_deposition_rate: pick(args.min_rate, base.map(|p| p.min_deposition_rate), "min-rate")?,
        max_deposition_rate: pick(args.max_rate, base.map(|p| p.max_deposition_rate), "max-rate")?,
        speed_change_warning_percent: pick(
            args.warn_percent,
            base.map(|p| p.speed_change_warning_percent),
            "warn-percent",
        )?,
    })
}

fn adjust(config: Option<&Config>, args: AdjustArgs) -> anyhow::Result<()> {
    let params = params(config, &args)?;

    let mut program = load_program(&args.program)?;
    let history = MeasurementHistory::load(&args.history)
        .with_context(|| format!("Failed to read history {:?}", args.history))?;
    let limits = SpeedLimits::load(&args.limits)
        .with_context(|| format!("Failed to read limits {:?}", args.limits))?
        .with_fallback(config.and_then(|c| c.default_limits));

    tracing::info!(
        "{} iterations, {} series, {} point limits",
        history.iterations().len(),
        history.series_count(),
        limits.len()
    );

    let report = DynaCoat::new(params, &limits, &history)
        .run(&mut program)
        .context("DynaCoat failed")?;

    tracing::info!(
        "{} points adjusted, {} changes, flags: {}",
        report.adjusted.len(),
        report.changes.len(),
        report.flags
    );
    if !report.skipped.is_empty() {
        tracing::warn!("Points left as they are: {:?}", report.skipped);
    }

    if let Some(csv) = args
        .change_log
        .as_ref()
        .or(config.and_then(|c| c.change_log_file.as_ref()))
    {
        report
            .changes
            .save_csv(csv)
            .with_context(|| format!("Failed to write change log {:?}", csv))?;
        tracing::info!("Change log written to {:?}", csv);
    }

    let mode = if args.non_paint {
        OutputMode::NonPaint
    } else {
        config.map_or(OutputMode::default(), Config::output_mode)
    };
    let output = args.output.as_ref().unwrap_or(&args.program);
    program
        .save_as(output, mode)
        .with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!("Saved {:?}", output);
    Ok(())
}

fn info(doc: &ProgramDocument) {
    println!("Name: {}", doc.program_name().unwrap_or("?"));
    println!("Comment: {}", doc.comment().unwrap_or(""));
    if let Some(modified) = doc.modified_date() {
        println!("Modified: {}", modified);
    }
    println!("Axes: {}", doc.axes());
    println!("Points: {}", doc.number_of_points());
    println!("User frames: {}", doc.user_frames_used().iter().join(", "));
    println!("Tool frames: {}", doc.tool_frames_used().iter().join(", "));
    println!("Calls: {}", doc.called_programs().join(", "));
    println!("Travel order: {}", doc.travel_order().iter().join(" "));
}
