//! Extract one `Movie` from a single `.grid_view li` fragment.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{credits::parse_credits, meta::parse_meta, ExtractError};
use crate::db::Movie;

static RANK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pic em").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info .hd .title").unwrap());
static DETAIL_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info .hd a").unwrap());
static POSTER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pic img").unwrap());
static RATING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".star .rating_num").unwrap());
static RATING_SPAN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".star span").unwrap());
static QUOTE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info .bd .inq").unwrap());
static INFO_BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info .bd p").unwrap());

static DIGIT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Extract a validated `Movie` from one list-item fragment.
///
/// Rank, detail URL, rating and the rating-count span are required; any of
/// them missing or unparseable fails only this fragment. Everything else is
/// best-effort and defaults to absent/empty.
pub fn extract(item: ElementRef) -> Result<Movie, ExtractError> {
    let rank_text = required_text(item, &RANK_SELECTOR, "rank")?;
    let rank: u32 = rank_text.parse().map_err(|_| ExtractError::InvalidField {
        field: "rank",
        value: rank_text.clone(),
    })?;

    let detail_link = item
        .select(&DETAIL_LINK_SELECTOR)
        .next()
        .ok_or(ExtractError::MissingField("detail_url"))?;
    let detail_url = detail_link
        .value()
        .attr("href")
        .map(str::to_string)
        .filter(|href| !href.is_empty())
        .ok_or(ExtractError::MissingField("detail_url"))?;

    // First .title span is the title, a second one is the original title.
    // Without any .title span, fall back to the detail anchor's text.
    let mut titles = item.select(&TITLE_SELECTOR).map(element_text);
    let title = titles
        .next()
        .unwrap_or_else(|| element_text(detail_link));
    let original_title = titles.next();
    if title.is_empty() {
        return Err(ExtractError::MissingField("title"));
    }

    let rating_text = required_text(item, &RATING_SELECTOR, "rating")?;
    let rating: f64 = rating_text.parse().map_err(|_| ExtractError::InvalidField {
        field: "rating",
        value: rating_text.clone(),
    })?;

    let rating_count = item
        .select(&RATING_SPAN_SELECTOR)
        .last()
        .map(|span| parse_rating_count(&element_text(span)))
        .ok_or(ExtractError::MissingField("rating_count"))?;

    let poster_url = item
        .select(&POSTER_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .unwrap_or("")
        .to_string();

    let quote = item
        .select(&QUOTE_SELECTOR)
        .next()
        .map(element_text)
        .filter(|quote| !quote.is_empty());

    let mut year = None;
    let mut regions = Vec::new();
    let mut genres = Vec::new();
    let mut directors = Vec::new();
    let mut actors = Vec::new();

    if let Some(block) = item.select(&INFO_BLOCK_SELECTOR).next() {
        let lines: Vec<String> = block
            .text()
            .flat_map(|node| node.split('\n'))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(credits_line) = lines.first() {
            (directors, actors) = parse_credits(credits_line);
        }
        if let Some(meta_line) = lines.get(1) {
            (year, regions, genres) = parse_meta(meta_line);
        }
    }

    Ok(Movie {
        rank,
        title,
        original_title,
        year,
        rating,
        rating_count,
        quote,
        poster_url,
        detail_url,
        regions,
        genres,
        directors,
        actors,
    })
}

fn required_text(
    item: ElementRef,
    selector: &Selector,
    field: &'static str,
) -> Result<String, ExtractError> {
    item.select(selector)
        .next()
        .map(element_text)
        .ok_or(ExtractError::MissingField(field))
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Rating-count text looks like "3,056,940人评价": strip thousands
/// separators, take the first digit run, default to 0 when none exists.
fn parse_rating_count(text: &str) -> u32 {
    let cleaned = text.replace(',', "");
    DIGIT_RUN_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_count_with_separator_and_suffix() {
        assert_eq!(parse_rating_count("3,056,940人评价"), 3_056_940);
    }

    #[test]
    fn rating_count_without_digits_defaults_to_zero() {
        assert_eq!(parse_rating_count("人评价"), 0);
        assert_eq!(parse_rating_count(""), 0);
    }
}
