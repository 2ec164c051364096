//! Argv-style command specification.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// A program invocation with discrete arguments.
///
/// Arguments are never joined into a shell string, so a value containing
/// `;` or `$(...)` reaches the child process verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Extra variables layered over the inherited environment.
    pub env: Option<HashMap<OsString, OsString>>,
    /// Bytes written to the child's stdin, which is then closed.
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Human-readable rendering for logs and failure messages.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Convert into a `tokio::process::Command` with piped stdio.
    #[must_use]
    pub fn to_tokio_command(&self) -> tokio::process::Command {
        use std::process::Stdio;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            cmd.envs(env);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_args_in_order() {
        let cmd = CommandSpec::new("npm")
            .arg("install")
            .args(["--no-audit", "--no-fund"])
            .cwd("/tmp/example");

        assert_eq!(cmd.program, OsString::from("npm"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.args[0], OsString::from("install"));
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp/example")));
        assert_eq!(cmd.display(), "npm install --no-audit --no-fund");
    }

    #[test]
    fn shell_metacharacters_stay_one_argument() {
        let cmd = CommandSpec::new("echo").arg("a; rm -rf /");
        assert_eq!(cmd.args, vec![OsString::from("a; rm -rf /")]);
    }

    #[test]
    fn env_and_stdin_are_optional() {
        let plain = CommandSpec::new("node");
        assert!(plain.env.is_none());
        assert!(plain.stdin.is_none());

        let cmd = CommandSpec::new("claude")
            .env("NO_COLOR", "1")
            .stdin("prompt");
        assert_eq!(cmd.env.as_ref().map(HashMap::len), Some(1));
        assert_eq!(cmd.stdin.as_deref(), Some(&b"prompt"[..]));
    }
}
