//! Turn one ranking page into movie records, skipping unparseable items.

pub mod credits;
pub mod fragment;
pub mod meta;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::warn;

use crate::db::Movie;

static ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".grid_view li").unwrap());

/// A required sub-field of one list item was missing or unparseable. This
/// only ever fails the single fragment; sibling items keep parsing.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing required element: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

pub struct ParsedPage {
    pub movies: Vec<Movie>,
    pub skipped: Vec<ExtractError>,
}

impl ParsedPage {
    pub fn fragments_seen(&self) -> usize {
        self.movies.len() + self.skipped.len()
    }
}

/// Parse a full listing document into zero-or-one record per list item.
pub fn parse_document(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut movies = Vec::new();
    let mut skipped = Vec::new();

    for item in document.select(&ITEM_SELECTOR) {
        match fragment::extract(item) {
            Ok(movie) => movies.push(movie),
            Err(err) => {
                warn!("Skipping list item: {}", err);
                skipped.push(err);
            }
        }
    }

    ParsedPage { movies, skipped }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/top250_page.html").unwrap()
    }

    fn wrap_item(item: &str) -> String {
        format!("<ol class=\"grid_view\">{item}</ol>")
    }

    const VALID_ITEM: &str = r#"
        <li>
          <div class="pic">
            <em class="">42</em>
            <a href="https://movie.douban.com/subject/1292001/">
              <img alt="海上钢琴师" src="https://img.example/p511146807.jpg">
            </a>
          </div>
          <div class="info">
            <div class="hd">
              <a href="https://movie.douban.com/subject/1292001/">
                <span class="title">海上钢琴师</span>
                <span class="title">&nbsp;/&nbsp;La leggenda del pianista sull'oceano</span>
              </a>
            </div>
            <div class="bd">
              <p class="">
                导演: 朱塞佩·托纳多雷 主演: 蒂姆·罗斯 / 比尔·努恩<br>
                1998&nbsp;/&nbsp;意大利&nbsp;/&nbsp;剧情 音乐
              </p>
              <div class="star">
                <span class="rating_num">9.3</span>
                <span>1,676,543人评价</span>
              </div>
              <p class="quote"><span class="inq">每个人都要走一条自己坚定了的路。</span></p>
            </div>
          </div>
        </li>"#;

    #[test]
    fn valid_fragment_matches_source_text() {
        let page = parse_document(&wrap_item(VALID_ITEM));
        assert!(page.skipped.is_empty());
        assert_eq!(page.movies.len(), 1);

        let movie = &page.movies[0];
        assert_eq!(movie.rank, 42);
        assert_eq!(movie.title, "海上钢琴师");
        assert!(movie
            .original_title
            .as_deref()
            .unwrap()
            .ends_with("La leggenda del pianista sull'oceano"));
        assert_eq!(movie.detail_url, "https://movie.douban.com/subject/1292001/");
        assert!((movie.rating - 9.3).abs() < f64::EPSILON);
        assert_eq!(movie.rating_count, 1_676_543);
        assert_eq!(movie.year, Some(1998));
        assert_eq!(movie.regions, vec!["意大利"]);
        assert_eq!(movie.genres, vec!["剧情", "音乐"]);
        assert_eq!(movie.directors, vec!["朱塞佩·托纳多雷"]);
        assert_eq!(movie.actors, vec!["蒂姆·罗斯", "比尔·努恩"]);
        assert_eq!(movie.quote.as_deref(), Some("每个人都要走一条自己坚定了的路。"));
        assert_eq!(movie.poster_url, "https://img.example/p511146807.jpg");
    }

    #[test]
    fn missing_rank_fails_only_that_fragment() {
        let broken = VALID_ITEM.replace(r#"<em class="">42</em>"#, "");
        let page = parse_document(&wrap_item(&format!("{broken}{VALID_ITEM}")));
        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert!(matches!(page.skipped[0], ExtractError::MissingField("rank")));
    }

    #[test]
    fn non_numeric_rank_is_invalid_field() {
        let broken = VALID_ITEM.replace(r#"<em class="">42</em>"#, r#"<em class="">TOP</em>"#);
        let page = parse_document(&wrap_item(&broken));
        assert!(page.movies.is_empty());
        assert!(matches!(
            page.skipped[0],
            ExtractError::InvalidField { field: "rank", .. }
        ));
    }

    #[test]
    fn missing_rating_fails_fragment() {
        let broken = VALID_ITEM.replace(r#"<span class="rating_num">9.3</span>"#, "");
        let page = parse_document(&wrap_item(&broken));
        assert!(page.movies.is_empty());
        assert_eq!(page.skipped.len(), 1);
    }

    #[test]
    fn title_falls_back_to_anchor_text() {
        let no_titles = VALID_ITEM
            .replace(r#"<span class="title">海上钢琴师</span>"#, "1900")
            .replace(
                r#"<span class="title">&nbsp;/&nbsp;La leggenda del pianista sull'oceano</span>"#,
                "",
            );
        let page = parse_document(&wrap_item(&no_titles));
        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.movies[0].title, "1900");
        assert!(page.movies[0].original_title.is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let bare = r#"
            <li>
              <div class="pic"><em>7</em></div>
              <div class="info">
                <div class="hd">
                  <a href="https://movie.douban.com/subject/3011091/">千与千寻</a>
                </div>
                <div class="bd">
                  <div class="star">
                    <span class="rating_num">9.4</span>
                    <span>评价</span>
                  </div>
                </div>
              </div>
            </li>"#;
        let page = parse_document(&wrap_item(bare));
        assert_eq!(page.movies.len(), 1);

        let movie = &page.movies[0];
        assert_eq!(movie.title, "千与千寻");
        assert_eq!(movie.rating_count, 0);
        assert_eq!(movie.poster_url, "");
        assert!(movie.quote.is_none());
        assert!(movie.year.is_none());
        assert!(movie.regions.is_empty());
        assert!(movie.directors.is_empty());
    }

    #[test]
    fn fixture_page_skips_item_without_detail_link() {
        let page = parse_document(&fixture());
        assert_eq!(page.fragments_seen(), 3);
        assert_eq!(page.movies.len(), 2);
        assert_eq!(page.skipped.len(), 1);
        assert!(matches!(
            page.skipped[0],
            ExtractError::MissingField("detail_url")
        ));

        let ranks: Vec<u32> = page.movies.iter().map(|m| m.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(page.movies[0].title, "肖申克的救赎");
        assert_eq!(page.movies[1].title, "霸王别姬");
        assert_eq!(
            page.movies[1].regions,
            vec!["中国大陆", "中国香港"]
        );
    }

    #[test]
    fn empty_document_yields_no_fragments() {
        let page = parse_document("<html><body><p>没有内容</p></body></html>");
        assert_eq!(page.fragments_seen(), 0);
    }
}
