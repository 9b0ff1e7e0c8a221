mod options;

use anyhow::Error as AnyError;
use clap::Parser;
use contour::{synth::Generator, SpatialIndex};
use log::debug;
use options::{Cli, Command as CliCmd, Output};
use serde::Serialize;
use std::{io::Write, sync::Arc};
use terrain::{catalog::demo_bbox, MemoryCatalog, Profile, ProfileConfig, Profiler};
use textplots::{Chart, Plot, Shape};
use uuid::Uuid;

fn main() -> Result<(), AnyError> {
    let Cli {
        seed,
        levels,
        config,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let config = match config {
        Some(path) => ProfileConfig::from_json_file(path)?,
        None => ProfileConfig::default(),
    };
    debug!("{config:?}");

    let generator = match seed {
        Some(seed) => Generator::new(levels).seed(seed),
        None => Generator::new(levels),
    };
    let catalog = Arc::new(MemoryCatalog::new());
    let project = catalog.seed_project(Uuid::nil(), "demo", &generator, demo_bbox())?;

    match cmd {
        CliCmd::Isolines => {
            let json = serde_json::to_string(&catalog.project_contours(project.id))?;
            println!("{json}");
        }
        CliCmd::Profile {
            start,
            dest,
            step,
            output,
        } => {
            let index = Arc::new(SpatialIndex::new(catalog.contours()));
            let profiler = Profiler::new(config, index, catalog.clone(), catalog.clone())?;
            let mut builder = Profile::builder()
                .project(project.id)
                .start(start.0)
                .end(dest.0);
            if let Some(step) = step {
                builder = builder.step_size(step);
            }
            let profile = builder.build(&profiler)?;
            match output {
                Output::Display => display(&profile)?,
                Output::Json => json(&profile)?,
                Output::Chart => chart(&profile),
            }
        }
    }
    Ok(())
}

fn display(profile: &Profile) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "profile {} ({:.1} m)", profile.id, profile.length_m)?;
    for point in &profile.points {
        let marker = if point.on_isoline { "*" } else { "" };
        writeln!(
            stdout,
            "{:4}: {:9.2} m {:8.2} m {marker}",
            point.seq, point.distance_m, point.elevation_m
        )?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn chart(profile: &Profile) {
    let plot_data: Vec<(f32, f32)> = profile
        .series()
        .map(|(distance, elevation)| (distance as f32, elevation as f32))
        .collect();
    Chart::new(300, 150, 0.0, profile.length_m as f32)
        .lineplot(&Shape::Lines(&plot_data))
        .display();
}

fn json(profile: &Profile) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        distance: f64,
        elevation: f64,
        isoline: bool,
    }

    let reshaped: Vec<JsonEntry> = profile
        .points
        .iter()
        .map(|point| JsonEntry {
            distance: point.distance_m,
            elevation: point.elevation_m,
            isoline: point.on_isoline,
        })
        .collect();
    let json = serde_json::to_string(&reshaped)?;
    println!("{json}");
    Ok(())
}
