//! CPU architecture detection.
//!
//! Raw architecture names come from very different sources (`uname -m`,
//! `std::env::consts::ARCH`, JVM-style `os.arch` values). They are normalised
//! to lower-case alphanumerics and then matched against one pattern per
//! canonical architecture.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical CPU architectures hugo is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    Amd64,
    Arm32,
    Arm64,
}

static PATTERNS: LazyLock<[(Architecture, Regex); 4]> = LazyLock::new(|| {
    let compile = |pattern: &str| Regex::new(pattern).expect("static architecture pattern");
    [
        (Architecture::X86, compile(r"^(x8632|x86|i[3-6]86|ia32|x32)$")),
        (Architecture::Amd64, compile(r"^(x8664|amd64|ia32e|em64t|x64)$")),
        (Architecture::Arm32, compile(r"^(arm|arm32)$")),
        (Architecture::Arm64, compile(r"^(aarch64|arm64)$")),
    ]
});

impl Architecture {
    /// Detects the canonical architecture for a raw architecture name.
    ///
    /// Returns `None` if the name matches no known architecture.
    pub fn detect(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(&normalized))
            .map(|(arch, _)| *arch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::Amd64 => "amd64",
            Self::Arm32 => "arm32",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
