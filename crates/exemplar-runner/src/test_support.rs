//! In-memory runner for tests that must not spawn processes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::project::{ExampleRunner, RunOutcome};

/// Returns a scripted outcome per directory name, succeeding by default.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    failures: HashMap<String, String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make runs of any directory whose name starts with `prefix` fail.
    #[must_use]
    pub fn failing(mut self, prefix: impl Into<String>, error: impl Into<String>) -> Self {
        self.failures.insert(prefix.into(), error.into());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExampleRunner for ScriptedRunner {
    async fn run(&self, dir: &Path) -> RunOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(dir.to_path_buf());
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self
            .failures
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix.as_str()))
        {
            Some((_, error)) => RunOutcome::failed(error.clone()),
            None => RunOutcome::succeeded("ok\n"),
        }
    }
}
