// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run state threaded through every builder step.

use serde::Serialize;

use crate::config::Settings;
use crate::sets::TargetSet;
use crate::template::TemplateCache;

/// Outcome of one builder run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub target: TargetSet,
    /// Objects left in the destination collection.
    pub generated: usize,
    /// Instance templates compiled during the run.
    pub template_builds: usize,
    /// Objects stamped from templates.
    pub stamped: usize,
    /// Chunks of two or more objects joined into one.
    pub merged_chunks: usize,
    pub anchors_applied: usize,
    pub diagnostics: Vec<String>,
}

impl BuildReport {
    pub fn new(target: TargetSet) -> Self {
        Self {
            target,
            generated: 0,
            template_builds: 0,
            stamped: 0,
            merged_chunks: 0,
            anchors_applied: 0,
            diagnostics: Vec::new(),
        }
    }
}

/// Settings, template cache and report of a running builder.
#[derive(Debug)]
pub struct CompilationContext<'a> {
    pub settings: &'a Settings,
    pub templates: TemplateCache,
    pub report: BuildReport,
}

impl<'a> CompilationContext<'a> {
    pub fn new(settings: &'a Settings, target: TargetSet) -> Self {
        Self {
            settings,
            templates: TemplateCache::default(),
            report: BuildReport::new(target),
        }
    }

    /// Logs a recoverable problem and keeps it in the report.
    pub fn diagnostic(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target_set = self.report.target.as_str(), "{message}");
        self.report.diagnostics.push(message);
    }
}
