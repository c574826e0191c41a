// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GamiFlow driver - compiles a scene document into its derived sets.
//!
//! Reads a JSON scene document, runs the requested set builders in build
//! order and prints one build report per set as JSON on stdout. With
//! `--output`, the generated collections are written back as a scene
//! document.
//!
//! # Environment
//!
//! - `GAMIFLOW_SETS` - default set list (`low,cage`, `all`, ...)
//! - `GAMIFLOW_OUTPUT` - default output path
//! - `GAMIFLOW_SETTINGS` - settings file replacing the document settings
//! - `RUST_LOG` - log filter

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use gamiflow_pipeline::{
    build_set, clear_generated_sets, BuildReport, SceneDocument, Settings, TargetSet,
};

mod config;

use config::Config;

fn run(config: &Config) -> Result<Vec<BuildReport>> {
    let json = fs::read_to_string(&config.scene)
        .with_context(|| format!("cannot read {}", config.scene.display()))?;
    let doc = SceneDocument::from_json(&json)
        .with_context(|| format!("cannot parse {}", config.scene.display()))?;
    let settings = match &config.settings {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            Settings::from_json(&json)?
        }
        None => doc.settings.clone(),
    };
    let mut scene = doc.to_scene()?;

    tracing::info!(
        scene = %scene.name,
        objects = scene.object_count(),
        sets = ?config.sets,
        "compiling scene"
    );

    let mut reports = Vec::with_capacity(config.sets.len());
    if config.clear {
        let cleared = clear_generated_sets(&mut scene, &settings);
        tracing::info!(cleared, "cleared generated sets");
    } else {
        for &target in &config.sets {
            let report = build_set(&mut scene, &settings, target)
                .with_context(|| format!("building the {target} set failed"))?;
            for message in &report.diagnostics {
                tracing::warn!(target_set = %target, "{message}");
            }
            reports.push(report);
        }
    }

    if let Some(path) = &config.output {
        let collections: Vec<_> = TargetSet::ALL
            .into_iter()
            .filter_map(|t| scene.output_collection(t))
            .collect();
        let out = SceneDocument::from_scene(&scene, &settings, &collections);
        fs::write(path, out.to_json()?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        tracing::info!(path = %path.display(), objects = out.objects.len(), "wrote generated sets");
    }

    Ok(reports)
}

fn main() -> ExitCode {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    match run(&config).and_then(|reports| Ok(serde_json::to_string_pretty(&reports)?)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
