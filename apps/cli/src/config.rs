// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver configuration: environment variables, overridden by arguments.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use gamiflow_pipeline::TargetSet;

const USAGE: &str = "usage: gamiflow <scene.json> [--set low|high|cage|export|all]... \
                     [--settings settings.json] [--output out.json] [--clear]";

/// Driver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Scene document to compile.
    pub scene: PathBuf,
    /// Sets to build, in build order.
    pub sets: Vec<TargetSet>,
    /// Where the generated sets are written as a scene document.
    pub output: Option<PathBuf>,
    /// Settings file replacing the settings stored in the document.
    pub settings: Option<PathBuf>,
    /// Clear the generated sets instead of building.
    pub clear: bool,
    /// Tracing filter directives.
    pub log_filter: String,
}

/// Parses a comma-separated set list. `all` expands to every set.
pub fn parse_sets(list: &str) -> Result<Vec<TargetSet>> {
    let mut sets = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if item.eq_ignore_ascii_case("all") {
            sets.extend(TargetSet::ALL);
        } else {
            sets.push(item.parse::<TargetSet>()?);
        }
    }
    Ok(in_build_order(sets))
}

/// Deduplicates and sorts so the cage always follows the low set.
fn in_build_order(mut sets: Vec<TargetSet>) -> Vec<TargetSet> {
    sets.sort_by_key(|t| t.index());
    sets.dedup();
    sets
}

impl Config {
    /// Loads configuration from the environment, then applies `args`
    /// (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut sets = match std::env::var("GAMIFLOW_SETS") {
            Ok(list) => parse_sets(&list).context("invalid GAMIFLOW_SETS")?,
            Err(_) => TargetSet::ALL.to_vec(),
        };
        let mut output = std::env::var("GAMIFLOW_OUTPUT").ok().map(PathBuf::from);
        let mut settings = std::env::var("GAMIFLOW_SETTINGS").ok().map(PathBuf::from);
        let log_filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,gamiflow_pipeline=info".into());

        let mut scene = None;
        let mut cli_sets = Vec::new();
        let mut clear = false;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set" | "-s" => {
                    let value = args.next().context("--set needs a value")?;
                    cli_sets.extend(parse_sets(&value)?);
                }
                "--output" | "-o" => {
                    output = Some(args.next().context("--output needs a path")?.into());
                }
                "--settings" => {
                    settings = Some(args.next().context("--settings needs a path")?.into());
                }
                "--clear" => clear = true,
                "--help" | "-h" => bail!("{USAGE}"),
                flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
                path => {
                    if scene.replace(PathBuf::from(path)).is_some() {
                        bail!("only one scene document can be compiled at a time\n{USAGE}");
                    }
                }
            }
        }

        if !cli_sets.is_empty() {
            sets = in_build_order(cli_sets);
        }
        let scene = scene.with_context(|| format!("no scene document given\n{USAGE}"))?;

        Ok(Self {
            scene,
            sets,
            output,
            settings,
            clear,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_lists_follow_build_order() {
        assert_eq!(
            parse_sets("export, cage,low,cage").unwrap(),
            vec![TargetSet::Low, TargetSet::Cage, TargetSet::Export]
        );
        assert_eq!(parse_sets("all").unwrap(), TargetSet::ALL.to_vec());
        assert!(parse_sets("mid").is_err());
    }

    #[test]
    fn arguments_override_defaults() {
        let config = Config::from_args(args(&[
            "crate.json",
            "--set",
            "export",
            "-s",
            "low",
            "--output",
            "out.json",
        ]))
        .unwrap();
        assert_eq!(config.scene, PathBuf::from("crate.json"));
        assert_eq!(config.sets, vec![TargetSet::Low, TargetSet::Export]);
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
        assert!(!config.clear);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Config::from_args(args(&[])).is_err());
        assert!(Config::from_args(args(&["a.json", "b.json"])).is_err());
        assert!(Config::from_args(args(&["a.json", "--frobnicate"])).is_err());
        assert!(Config::from_args(args(&["a.json", "--set"])).is_err());
    }
}
