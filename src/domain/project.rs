use std::fmt;

/// Trading venue the Trader API routes a request to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Project {
    #[default]
    Unknown,
    Jupiter,
    Raydium,
    Serum,
    All,
    Openbook,
}

pub const SELECTABLE_PROJECTS: [Project; 5] = [
    Project::Jupiter,
    Project::Raydium,
    Project::Serum,
    Project::All,
    Project::Openbook,
];

impl Project {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "P_UNKNOWN",
            Self::Jupiter => "P_JUPITER",
            Self::Raydium => "P_RAYDIUM",
            Self::Serum => "P_SERUM",
            Self::All => "P_ALL",
            Self::Openbook => "P_OPENBOOK",
        }
    }

    /// Looks up a selectable venue by its wire name. `P_UNKNOWN` is never selectable.
    pub fn parse(value: &str) -> Option<Self> {
        let needle = value.trim();
        SELECTABLE_PROJECTS
            .iter()
            .copied()
            .find(|project| project.as_str().eq_ignore_ascii_case(needle))
    }

    pub fn is_unknown(self) -> bool {
        self == Self::Unknown
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
