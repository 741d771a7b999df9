//! Parse the "year / regions / genres" meta line.

use std::sync::LazyLock;

use regex::Regex;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static REGION_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// Split a meta line into (year, regions, genres).
///
/// Segments are `/`-separated; missing segments yield empty collections and
/// an unparseable year is simply absent. Regions and genres keep first
/// occurrence order but are de-duplicated.
pub fn parse_meta(line: &str) -> (Option<i32>, Vec<String>, Vec<String>) {
    let parts: Vec<&str> = line
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let year = parts
        .first()
        .and_then(|part| YEAR_RE.find(part))
        .and_then(|m| m.as_str().parse().ok());

    let regions = parts
        .get(1)
        .map(|part| collect_unique(REGION_SPLIT_RE.split(part)))
        .unwrap_or_default();

    let genres = parts
        .get(2)
        .map(|part| collect_unique(part.split(' ')))
        .unwrap_or_default();

    (year, regions, genres)
}

fn collect_unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() || out.iter().any(|v| v == value) {
            continue;
        }
        out.push(value.to_string());
    }
    out
}
