use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::table::UNKNOWN;

static PAREN_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4}-\d{2}-\d{2})\)").expect("valid date regex"));
static BARE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid date regex"));
static SEASON_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{4})\b").expect("valid season regex"));
static TOTALS_TEAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Totals\s+(.*?)\s+\(").expect("valid totals regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub season: String,
    pub date: String,
    pub home: String,
    pub away: String,
    pub team: String,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

impl FileMetadata {
    pub fn unknown() -> Self {
        Self {
            season: UNKNOWN.to_string(),
            date: UNKNOWN.to_string(),
            home: UNKNOWN.to_string(),
            away: UNKNOWN.to_string(),
            team: UNKNOWN.to_string(),
        }
    }

    pub fn values(&self) -> [&str; 5] {
        [&self.season, &self.date, &self.home, &self.away, &self.team]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Perspective {
    #[default]
    Own,
    Opponent,
}

pub fn extract(file_name: &str, perspective: Perspective) -> FileMetadata {
    let date = extract_date(file_name);
    let season = SEASON_TOKEN
        .captures(file_name)
        .map(|c| c[1].to_string())
        .or_else(|| date.map(season_for_date))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let (home, away) = extract_matchup(file_name);
    let team = match perspective {
        Perspective::Own => None,
        Perspective::Opponent => opponent_team(file_name),
    }
    .or_else(|| totals_team(file_name))
    .unwrap_or_else(|| UNKNOWN.to_string());

    FileMetadata {
        season,
        date: date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        home,
        away,
        team,
    }
}

pub fn extract_date(file_name: &str) -> Option<NaiveDate> {
    PAREN_DATE
        .captures_iter(file_name)
        .chain(BARE_DATE.captures_iter(file_name))
        .find_map(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
}

/// Seasons start in September.
pub fn season_for_date(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 9 {
        format!("{}-{}", year, year + 1)
    } else {
        format!("{}-{}", year - 1, year)
    }
}

pub fn totals_team(file_name: &str) -> Option<String> {
    let captured = TOTALS_TEAM.captures(file_name)?;
    let team = captured[1].trim();
    if team.is_empty() {
        None
    } else {
        Some(team.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Versus,
    At,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Home,
    Away,
}

struct MatchupRule {
    separator: Token,
    left: Side,
    right: Side,
}

// Rule order decides, not position: `vs` beats `@` anywhere in the name.
static MATCHUP_RULES: [MatchupRule; 2] = [
    MatchupRule {
        separator: Token::Versus,
        left: Side::Home,
        right: Side::Away,
    },
    MatchupRule {
        separator: Token::At,
        left: Side::Away,
        right: Side::Home,
    },
];

fn clean_name(file_name: &str) -> String {
    let stem = strip_csv_extension(file_name);
    stem.replace(['\u{2014}', '\u{2013}'], "-")
}

fn strip_csv_extension(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4 && file_name.is_char_boundary(len - 4) {
        let (stem, ext) = file_name.split_at(len - 4);
        if ext.eq_ignore_ascii_case(".csv") {
            return stem;
        }
    }
    file_name
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut parts = chunk.split('@').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                if part.eq_ignore_ascii_case("vs") || part.eq_ignore_ascii_case("vs.") {
                    tokens.push(Token::Versus);
                } else {
                    tokens.push(Token::Word(part.to_string()));
                }
            }
            if parts.peek().is_some() {
                tokens.push(Token::At);
            }
        }
    }
    tokens
}

fn join_words(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t {
            Token::Word(w) => w.as_str(),
            Token::Versus => "vs",
            Token::At => "@",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_team(raw: &str) -> &str {
    let end = raw.find(['-', '(']).unwrap_or(raw.len());
    raw[..end].trim()
}

fn or_unknown(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn extract_matchup(file_name: &str) -> (String, String) {
    let cleaned = clean_name(file_name);
    let prefix = cleaned.split("Totals").next().unwrap_or_default();
    let tokens = tokenize(prefix);

    for rule in &MATCHUP_RULES {
        let Some(idx) = tokens.iter().position(|t| *t == rule.separator) else {
            continue;
        };
        let left = join_words(&tokens[..idx]);
        let right_raw = join_words(&tokens[idx + 1..]);
        let right = truncate_team(&right_raw);

        let mut home = UNKNOWN.to_string();
        let mut away = UNKNOWN.to_string();
        for (side, value) in [(rule.left, left.as_str()), (rule.right, right)] {
            match side {
                Side::Home => home = or_unknown(value),
                Side::Away => away = or_unknown(value),
            }
        }
        return (home, away);
    }

    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

pub fn opponent_team(file_name: &str) -> Option<String> {
    let cleaned = clean_name(file_name);
    let tokens = tokenize(&cleaned);
    let (first, rest) = tokens.split_first()?;
    if !matches!(first, Token::Versus | Token::At) {
        return None;
    }
    let words = rest
        .iter()
        .take_while(|t| matches!(t, Token::Word(w) if w != "Totals"))
        .cloned()
        .collect::<Vec<_>>();
    let joined = join_words(&words);
    let team = truncate_team(&joined);
    if team.is_empty() {
        None
    } else {
        Some(team.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_splits_attached_at() {
        assert_eq!(
            tokenize("A@B vs. C"),
            vec![
                Token::Word("A".to_string()),
                Token::At,
                Token::Word("B".to_string()),
                Token::Versus,
                Token::Word("C".to_string()),
            ]
        );
    }

    #[test]
    fn versus_rule_beats_earlier_at() {
        let (home, away) = extract_matchup("A @ B vs C Totals A (2024-10-01).csv");
        assert_eq!(home, "A @ B");
        assert_eq!(away, "C");
    }

    #[test]
    fn versus_needs_whole_word() {
        let (home, away) = extract_matchup("Vsevolod Tigers Totals X (2024-01-01).csv");
        assert_eq!(home, UNKNOWN);
        assert_eq!(away, UNKNOWN);
    }

    #[test]
    fn csv_extension_is_stripped_case_insensitively() {
        assert_eq!(strip_csv_extension("a vs b.CSV"), "a vs b");
        assert_eq!(strip_csv_extension("notes"), "notes");
    }

    #[test]
    fn invalid_calendar_date_is_skipped() {
        assert_eq!(extract_date("x (2024-13-40) y"), None);
        assert_eq!(
            extract_date("x (2024-13-40) 2024-10-02"),
            NaiveDate::from_ymd_opt(2024, 10, 2)
        );
    }
}
