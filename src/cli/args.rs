//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// exemplar - turn a test suite into runnable, validated examples
#[derive(Parser, Debug)]
#[command(name = "exemplar")]
#[command(about = "Turn a codebase's test suite into runnable, validated documentation examples")]
#[command(long_about = r#"
exemplar reads a repository's tests, decides which of them show something a
user would want to do, and generates a small runnable example project for
each. Examples are checked for completeness, correct package usage, leftover
test code and whether they actually run; failing ones are refined.

EXAMPLES:
  # Run every phase against the current repository
  exemplar all --repo . --output .exemplar/out

  # Only look at the first 10 test files
  exemplar all --repo . --output .exemplar/out --limit 10

  # Run a single phase (reads upstream documents from --input)
  exemplar distill --output .exemplar/out

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .exemplar/config.toml
  Use --config to specify an explicit config file path

PHASES:
  Discovery → Extraction → Distillation → Generation → Quality ⇄ Refinement
  Each phase writes a numbered JSON document (01-discovery.json ... 06-refinement.json)
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model to use for LLM provider calls
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// LLM provider (claude-cli or anthropic)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Locations shared by every phase command.
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Directory the phase writes its document to
    #[arg(long)]
    pub output: PathBuf,

    /// Directory upstream documents are read from (defaults to --output)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Repository root to read tests from
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExamplesArgs {
    /// Directory generated examples live in (defaults to <output>/examples)
    #[arg(long)]
    pub examples_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find test files and classify them against the previous run
    Discover {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        docs: DocumentArgs,
        /// Only keep the first N test files by path
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Break changed test files into annotated test blocks
    Extract {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        docs: DocumentArgs,
        /// Files analysed concurrently per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Plan examples from the extracted test blocks
    Distill {
        #[command(flatten)]
        docs: DocumentArgs,
    },

    /// Materialize one directory per planned example
    Generate {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        docs: DocumentArgs,
        #[command(flatten)]
        examples: ExamplesArgs,
    },

    /// Check every generated example
    Quality {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        docs: DocumentArgs,
        #[command(flatten)]
        examples: ExamplesArgs,
        /// Iteration number recorded in the quality document
        #[arg(long, default_value_t = 0)]
        iteration: u32,
    },

    /// Fix examples with critical or high severity issues
    Refine {
        #[command(flatten)]
        docs: DocumentArgs,
        #[command(flatten)]
        examples: ExamplesArgs,
        /// Iteration number (defaults to one past the quality iteration)
        #[arg(long)]
        iteration: Option<u32>,
    },

    /// Run every phase, then quality and refinement until clean
    All {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        docs: DocumentArgs,
        #[command(flatten)]
        examples: ExamplesArgs,
        /// Only keep the first N test files by path
        #[arg(long)]
        limit: Option<usize>,
        /// Maximum refinement iterations
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Files analysed concurrently per extraction batch
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

impl Commands {
    /// Subcommand name, used in failure banners.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discover { .. } => "discover",
            Self::Extract { .. } => "extract",
            Self::Distill { .. } => "distill",
            Self::Generate { .. } => "generate",
            Self::Quality { .. } => "quality",
            Self::Refine { .. } => "refine",
            Self::All { .. } => "all",
        }
    }

    /// Whether the command calls an LLM and needs a backend.
    #[must_use]
    pub fn needs_llm(&self) -> bool {
        !matches!(self, Self::Discover { .. } | Self::Quality { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "exemplar", "all", "--output", "out", "--limit", "5", "-v", "--model", "m",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.model.as_deref(), Some("m"));
        match cli.command {
            Commands::All { repo, docs, limit, .. } => {
                assert_eq!(repo.repo, PathBuf::from("."));
                assert_eq!(docs.output, PathBuf::from("out"));
                assert!(docs.input.is_none());
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["exemplar", "distill"]).is_err());
    }

    #[test]
    fn only_llm_commands_need_a_backend() {
        let discover = Cli::try_parse_from(["exemplar", "discover", "--output", "o"]).unwrap();
        assert!(!discover.command.needs_llm());
        let refine = Cli::try_parse_from(["exemplar", "refine", "--output", "o"]).unwrap();
        assert!(refine.command.needs_llm());
    }
}
