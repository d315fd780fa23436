use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::file_meta::Perspective;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Athlete,
    Match,
    Overall,
    Rotation,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Athlete,
        Domain::Match,
        Domain::Overall,
        Domain::Rotation,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Domain::Athlete => "athlete",
            Domain::Match => "match",
            Domain::Overall => "overall",
            Domain::Rotation => "rotation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Domain::Athlete => "Athlete Data",
            Domain::Match => "Match Data",
            Domain::Overall => "Overall Data",
            Domain::Rotation => "Rotation Data",
        }
    }

    pub fn profile(self) -> &'static DomainProfile {
        match self {
            Domain::Athlete => &ATHLETE,
            Domain::Match => &MATCH,
            Domain::Overall => &OVERALL,
            Domain::Rotation => &ROTATION,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Domain {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_lowercase();
        Domain::ALL
            .into_iter()
            .find(|d| d.key() == key)
            .ok_or_else(|| anyhow!("unknown domain {raw:?}"))
    }
}

/// Drop rows whose `column` cell, trimmed and lower-cased, equals `value`.
#[derive(Debug, Clone, Copy)]
pub struct ExcludeRows {
    pub column: &'static str,
    pub value: &'static str,
}

#[derive(Debug)]
pub struct DomainProfile {
    pub domain: Domain,
    pub source_dir: &'static str,
    pub historical_file: Option<&'static str>,
    pub cache_file: &'static str,
    /// Title rows above the header in per-file exports.
    pub title_rows: usize,
    pub perspective: Perspective,
    pub renames: &'static [(&'static str, &'static str)],
    pub historical_renames: &'static [(&'static str, &'static str)],
    pub exclude_rows: Option<ExcludeRows>,
}

impl DomainProfile {
    pub fn source_dir(&self, root: &Path) -> PathBuf {
        root.join(self.source_dir)
    }

    pub fn historical_path(&self, root: &Path) -> Option<PathBuf> {
        self.historical_file.map(|name| root.join(name))
    }

    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(self.cache_file)
    }
}

const BY_ROTATION: ExcludeRows = ExcludeRows {
    column: "Rotation",
    value: "by rotation",
};

static ATHLETE: DomainProfile = DomainProfile {
    domain: Domain::Athlete,
    source_dir: "Athlete Data",
    historical_file: Some("Historical Athlete Data.csv"),
    cache_file: "athlete_data_cache.parquet",
    title_rows: 1,
    perspective: Perspective::Own,
    renames: &[],
    historical_renames: &[],
    exclude_rows: None,
};

// Match logs may be opponent files; the leading `@ X` / `vs X` names the team.
static MATCH: DomainProfile = DomainProfile {
    domain: Domain::Match,
    source_dir: "Match Data",
    historical_file: None,
    cache_file: "match_data_cache.parquet",
    title_rows: 0,
    perspective: Perspective::Opponent,
    renames: &[],
    historical_renames: &[],
    exclude_rows: None,
};

static OVERALL: DomainProfile = DomainProfile {
    domain: Domain::Overall,
    source_dir: "Overall Data",
    historical_file: Some("Historical Overall Data.csv"),
    cache_file: "overall_data_cache.parquet",
    title_rows: 1,
    perspective: Perspective::Own,
    renames: &[],
    historical_renames: &[("MP", "Matches")],
    exclude_rows: None,
};

static ROTATION: DomainProfile = DomainProfile {
    domain: Domain::Rotation,
    source_dir: "Rotation Data",
    historical_file: Some("Historical Rotation Data.csv"),
    cache_file: "rotation_data_cache.parquet",
    title_rows: 1,
    perspective: Perspective::Own,
    renames: &[("Matches", "Rotation")],
    historical_renames: &[("Matches", "Rotation")],
    exclude_rows: Some(BY_ROTATION),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_keys() {
        assert_eq!("Rotation".parse::<Domain>().unwrap(), Domain::Rotation);
        assert_eq!(" match ".parse::<Domain>().unwrap(), Domain::Match);
        assert!("fitness".parse::<Domain>().is_err());
    }

    #[test]
    fn only_match_has_no_historical_file() {
        for domain in Domain::ALL {
            let profile = domain.profile();
            assert_eq!(profile.domain, domain);
            assert_eq!(
                profile.historical_file.is_none(),
                domain == Domain::Match
            );
        }
    }
}
