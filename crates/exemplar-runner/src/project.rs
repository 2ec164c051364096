//! Example execution: detect the project type of a generated example
//! directory, install its dependencies and run its entry point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::command_spec::CommandSpec;
use crate::process::{ProcessOutput, run_command};
use exemplar_config::Config;
use exemplar_utils::error::RunnerError;

/// Output beyond this many bytes per stream is dropped from outcomes.
const OUTPUT_LIMIT: usize = 8 * 1024;

/// Result of trying to run one example.
///
/// Failing examples are normal outcomes, never errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl RunOutcome {
    #[must_use]
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn from_output(output: &ProcessOutput, timeout: Duration, step: &str) -> Self {
        let error = if output.timed_out {
            Some(format!(
                "{step}: {}",
                RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs()
                }
            ))
        } else if output.success() {
            None
        } else {
            Some(match output.exit_code {
                Some(code) => format!("{step} exited with code {code}"),
                None => format!("{step} was terminated by a signal"),
            })
        };

        Self {
            success: output.success(),
            stdout: clip(&output.stdout_string()),
            stderr: clip(&output.stderr_string()),
            exit_code: output.exit_code,
            error,
            timed_out: output.timed_out,
        }
    }

    /// One-line description of a failure, with the tail of stderr.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = self
            .error
            .clone()
            .unwrap_or_else(|| "execution failed".to_string());
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            text.push_str(": ");
            text.push_str(&tail.join(" | "));
        }
        text
    }
}

fn clip(text: &str) -> String {
    if text.len() <= OUTPUT_LIMIT {
        return text.to_string();
    }
    let mut end = OUTPUT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

/// The code execution capability.
#[async_trait]
pub trait ExampleRunner: Send + Sync {
    async fn run(&self, dir: &Path) -> RunOutcome;
}

/// What kind of project an example directory holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKind {
    /// `package.json` present.
    Node { start_script: bool },
    /// `Cargo.toml` present.
    Cargo,
    /// `requirements.txt` or `pyproject.toml` present.
    Python { manifest: PathBuf },
    /// A bare script with no manifest, run with `interpreter`.
    Script {
        interpreter: &'static str,
        entry: PathBuf,
    },
}

impl ProjectKind {
    /// Detect by the presence of well-known manifest and entry files.
    #[must_use]
    pub fn detect(dir: &Path) -> Option<Self> {
        let package_json = dir.join("package.json");
        if package_json.is_file() {
            return Some(Self::Node {
                start_script: has_start_script(&package_json),
            });
        }
        if dir.join("Cargo.toml").is_file() {
            return Some(Self::Cargo);
        }
        for manifest in ["requirements.txt", "pyproject.toml"] {
            if dir.join(manifest).is_file() {
                return Some(Self::Python {
                    manifest: PathBuf::from(manifest),
                });
            }
        }
        for (entry, interpreter) in [("main.py", "python3"), ("index.js", "node")] {
            if dir.join(entry).is_file() {
                return Some(Self::Script {
                    interpreter,
                    entry: PathBuf::from(entry),
                });
            }
        }
        None
    }
}

fn has_start_script(package_json: &Path) -> bool {
    #[derive(Deserialize)]
    struct Manifest {
        #[serde(default)]
        scripts: std::collections::HashMap<String, String>,
    }

    fs::read_to_string(package_json)
        .ok()
        .and_then(|text| serde_json::from_str::<Manifest>(&text).ok())
        .is_some_and(|m| m.scripts.contains_key("start"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub label: &'static str,
    pub spec: CommandSpec,
    pub timeout: Duration,
}

/// Runs examples as real subprocesses.
#[derive(Debug, Clone)]
pub struct ProjectRunner {
    main_file: String,
    run_timeout: Duration,
    install_timeout: Duration,
}

impl ProjectRunner {
    #[must_use]
    pub fn new(main_file: impl Into<String>, run_timeout: Duration, install_timeout: Duration) -> Self {
        Self {
            main_file: main_file.into(),
            run_timeout,
            install_timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.example.main_file.clone(),
            config.run_timeout(),
            config.install_timeout(),
        )
    }

    /// Install and execute steps for `dir`, or why it cannot run.
    pub(crate) fn plan(&self, dir: &Path) -> Result<Vec<Step>, String> {
        let kind = ProjectKind::detect(dir).ok_or_else(|| {
            format!(
                "no entry point found in {} (expected package.json, Cargo.toml, requirements.txt, pyproject.toml, main.py or index.js)",
                dir.display()
            )
        })?;
        debug!(dir = %dir.display(), kind = ?kind, "Detected project kind");

        let install = |spec: CommandSpec| Step {
            label: "dependency installation",
            spec: spec.cwd(dir),
            timeout: self.install_timeout,
        };
        let execute = |spec: CommandSpec| Step {
            label: "execution",
            spec: spec.cwd(dir),
            timeout: self.run_timeout,
        };

        let steps = match kind {
            ProjectKind::Node { start_script } => {
                let run = if start_script {
                    CommandSpec::new("npm").arg("start")
                } else {
                    if !dir.join(&self.main_file).is_file() {
                        return Err(format!(
                            "package.json has no start script and {} is missing",
                            self.main_file
                        ));
                    }
                    if self.main_file.ends_with(".ts") {
                        CommandSpec::new("npx").args(["--yes", "tsx", self.main_file.as_str()])
                    } else {
                        CommandSpec::new("node").arg(self.main_file.as_str())
                    }
                };
                vec![
                    install(CommandSpec::new("npm").args(["install", "--no-audit", "--no-fund"])),
                    execute(run),
                ]
            }
            ProjectKind::Cargo => vec![
                install(CommandSpec::new("cargo").args(["build", "--quiet"])),
                execute(CommandSpec::new("cargo").args(["run", "--quiet"])),
            ],
            ProjectKind::Python { manifest } => {
                let entry = if self.main_file.ends_with(".py") {
                    self.main_file.as_str()
                } else {
                    "main.py"
                };
                if !dir.join(entry).is_file() {
                    return Err(format!("{} is missing", entry));
                }
                let install_args: Vec<String> = if manifest.as_os_str() == "requirements.txt" {
                    vec!["-m".into(), "pip".into(), "install".into(), "-r".into(), "requirements.txt".into()]
                } else {
                    vec!["-m".into(), "pip".into(), "install".into(), ".".into()]
                };
                vec![
                    install(CommandSpec::new("python3").args(install_args)),
                    execute(CommandSpec::new("python3").arg(entry)),
                ]
            }
            ProjectKind::Script { interpreter, entry } => {
                vec![execute(CommandSpec::new(interpreter).arg(entry))]
            }
        };
        Ok(steps)
    }
}

#[async_trait]
impl ExampleRunner for ProjectRunner {
    async fn run(&self, dir: &Path) -> RunOutcome {
        let steps = match self.plan(dir) {
            Ok(steps) => steps,
            Err(reason) => return RunOutcome::failed(reason),
        };

        for step in &steps {
            let program = step.spec.program.to_string_lossy().into_owned();
            if which::which(&program).is_err() {
                return RunOutcome::failed(RunnerError::ToolNotFound { tool: program }.to_string());
            }
        }

        let mut last = RunOutcome::failed("no steps to run");
        for step in steps {
            info!(dir = %dir.display(), command = %step.spec.display(), "Running {}", step.label);
            let outcome = match run_command(&step.spec, step.timeout).await {
                Ok(output) => RunOutcome::from_output(&output, step.timeout, step.label),
                Err(e) => RunOutcome::failed(e.to_string()),
            };
            if !outcome.success {
                warn!(dir = %dir.display(), error = ?outcome.error, "Example {} failed", step.label);
                return outcome;
            }
            last = outcome;
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn runner() -> ProjectRunner {
        ProjectRunner::new("index.ts", Duration::from_secs(30), Duration::from_secs(180))
    }

    #[test]
    fn detects_node_with_and_without_start_script() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"scripts":{"start":"tsx index.ts"}}"#).unwrap();
        assert_eq!(
            ProjectKind::detect(dir.path()),
            Some(ProjectKind::Node { start_script: true })
        );

        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(
            ProjectKind::detect(dir.path()),
            Some(ProjectKind::Node { start_script: false })
        );
    }

    #[test]
    fn detects_cargo_python_and_scripts() {
        let cargo = TempDir::new().unwrap();
        fs::write(cargo.path().join("Cargo.toml"), "[package]").unwrap();
        assert_eq!(ProjectKind::detect(cargo.path()), Some(ProjectKind::Cargo));

        let py = TempDir::new().unwrap();
        fs::write(py.path().join("requirements.txt"), "").unwrap();
        assert!(matches!(ProjectKind::detect(py.path()), Some(ProjectKind::Python { .. })));

        let script = TempDir::new().unwrap();
        fs::write(script.path().join("index.js"), "console.log(1)").unwrap();
        assert!(matches!(
            ProjectKind::detect(script.path()),
            Some(ProjectKind::Script { interpreter: "node", .. })
        ));

        let empty = TempDir::new().unwrap();
        assert_eq!(ProjectKind::detect(empty.path()), None);
    }

    #[test]
    fn node_plan_installs_then_runs_main_with_tsx() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("index.ts"), "console.log('hi')").unwrap();

        let steps = runner().plan(dir.path()).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].spec.display(), "npm install --no-audit --no-fund");
        assert_eq!(steps[0].timeout, Duration::from_secs(180));
        assert_eq!(steps[1].spec.display(), "npx --yes tsx index.ts");
        assert_eq!(steps[1].timeout, Duration::from_secs(30));
        assert_eq!(steps[1].spec.cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn node_plan_without_entry_point_is_refused() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let err = runner().plan(dir.path()).unwrap_err();
        assert!(err.contains("index.ts"));
    }

    #[test]
    fn python_plan_uses_requirements() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();
        fs::write(dir.path().join("main.py"), "print(1)").unwrap();

        let steps = runner().plan(dir.path()).unwrap();
        assert_eq!(steps[0].spec.args.last(), Some(&OsString::from("requirements.txt")));
        assert_eq!(steps[1].spec.display(), "python3 main.py");
    }

    #[tokio::test]
    async fn empty_directory_fails_without_spawning() {
        let dir = TempDir::new().unwrap();
        let outcome = runner().run(dir.path()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("no entry point"));
    }

    #[test]
    fn outcome_from_timeout_mentions_seconds() {
        let output = ProcessOutput::new(Vec::new(), Vec::new(), None, true);
        let outcome = RunOutcome::from_output(&output, Duration::from_secs(30), "execution");
        assert!(outcome.timed_out);
        assert!(!outcome.success);
        assert!(outcome.describe().contains("30 seconds"));
    }

    #[test]
    fn describe_includes_stderr_tail() {
        let output = ProcessOutput::new(Vec::new(), b"line1\nTypeError: boom\n".to_vec(), Some(1), false);
        let outcome = RunOutcome::from_output(&output, Duration::from_secs(30), "execution");
        let text = outcome.describe();
        assert!(text.starts_with("execution exited with code 1"));
        assert!(text.contains("TypeError: boom"));
    }
}
