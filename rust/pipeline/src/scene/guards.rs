// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host tool settings and the scoped guard that toggles them.

/// Editor-wide tool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolSettings {
    /// Merge vertices that land on each other after a transform.
    pub auto_merge: bool,
}

/// Disables `auto_merge` until dropped, then restores the previous value.
#[derive(Debug)]
pub struct AutoMergeGuard<'a> {
    tools: &'a mut ToolSettings,
    saved: bool,
}

impl<'a> AutoMergeGuard<'a> {
    pub fn disable(tools: &'a mut ToolSettings) -> Self {
        let saved = tools.auto_merge;
        tools.auto_merge = false;
        Self { tools, saved }
    }

    pub fn auto_merge(&self) -> bool {
        self.tools.auto_merge
    }
}

impl Drop for AutoMergeGuard<'_> {
    fn drop(&mut self) {
        self.tools.auto_merge = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_previous_value() {
        let mut tools = ToolSettings { auto_merge: true };
        {
            let guard = AutoMergeGuard::disable(&mut tools);
            assert!(!guard.auto_merge());
        }
        assert!(tools.auto_merge);

        let mut tools = ToolSettings::default();
        drop(AutoMergeGuard::disable(&mut tools));
        assert!(!tools.auto_merge);
    }
}
