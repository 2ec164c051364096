use serde::{Deserialize, Serialize};
use std::fmt;

/// The six pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Discovery,
    Extraction,
    Distillation,
    Generation,
    Quality,
    Refinement,
}

impl PhaseId {
    pub const ALL: [PhaseId; 6] = [
        PhaseId::Discovery,
        PhaseId::Extraction,
        PhaseId::Distillation,
        PhaseId::Generation,
        PhaseId::Quality,
        PhaseId::Refinement,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Extraction => "extraction",
            Self::Distillation => "distillation",
            Self::Generation => "generation",
            Self::Quality => "quality",
            Self::Refinement => "refinement",
        }
    }

    /// CLI subcommand that runs this phase.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Discovery => "discover",
            Self::Extraction => "extract",
            Self::Distillation => "distill",
            Self::Generation => "generate",
            Self::Quality => "quality",
            Self::Refinement => "refine",
        }
    }

    /// One-based position in the pipeline.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Self::Discovery => 1,
            Self::Extraction => 2,
            Self::Distillation => 3,
            Self::Generation => 4,
            Self::Quality => 5,
            Self::Refinement => 6,
        }
    }

    /// Name of the document this phase owns, e.g. `02-extraction`.
    #[must_use]
    pub fn document_name(&self) -> String {
        format!("{:02}-{}", self.ordinal(), self.as_str())
    }

    /// Parse a document name such as `03-distillation` back to its phase.
    #[must_use]
    pub fn from_document_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.document_name() == name)
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}
