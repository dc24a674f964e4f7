use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InterviewError;

/// Interview track selected before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Track {
    Frontend,
    Backend,
    Mern,
    Ml,
    SystemDesign,
    Hr,
}

impl Track {
    pub const ALL: [Track; 6] = [
        Track::Frontend,
        Track::Backend,
        Track::Mern,
        Track::Ml,
        Track::SystemDesign,
        Track::Hr,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Track::Frontend => "frontend",
            Track::Backend => "backend",
            Track::Mern => "mern",
            Track::Ml => "ml",
            Track::SystemDesign => "system-design",
            Track::Hr => "hr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Track::Frontend => "Frontend Developer",
            Track::Backend => "Backend Developer",
            Track::Mern => "MERN Stack",
            Track::Ml => "Machine Learning",
            Track::SystemDesign => "System Design",
            Track::Hr => "HR / Behavioral",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Track {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Track::ALL
            .iter()
            .copied()
            .find(|t| t.id() == needle)
            .ok_or_else(|| InterviewError::InvalidRequest(format!("Unknown track: {}", s)))
    }
}
