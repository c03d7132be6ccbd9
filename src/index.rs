use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::parser::patterns::DATE_RE;
use crate::scraper::{build_client, FetchConfig};

const BASE_URL: &str = "https://www.jw.org";
const GUIDE_PATH: &str = "/es/biblioteca/guia-actividades-reunion-testigos-jehova/";

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a\s[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap());
static INNER_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static SORT_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})[- ].*?de\s+(\w+)").unwrap());

const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

#[derive(Debug, Clone)]
pub struct WeekLink {
    pub title: String,
    pub url: String,
}

/// Fetch the index page and return the week links it announces, sorted
/// chronologically by the date span in each link's text.
pub async fn fetch_week_links(index_url: &str, config: &FetchConfig) -> Result<Vec<WeekLink>> {
    let client = build_client(config)?;

    info!("Fetching index page: {}", index_url);
    let html = client
        .get(index_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .context("Failed to fetch index page")?;

    let mut links = harvest_links(&html, index_url);
    links.sort_by_key(|l| date_sort_key(&l.title));

    info!("Week links after filtering: {}", links.len());
    Ok(links)
}

/// Keep anchors under the activity-guide path whose text carries a date span,
/// excluding the index itself and bare issue links; relative hrefs are
/// absolutized against the site root.
pub fn harvest_links(html: &str, index_url: &str) -> Vec<WeekLink> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps[1].to_string();
            let title = INNER_TAG_RE.replace_all(&caps[2], " ");
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

            if title.is_empty() || !href.contains(GUIDE_PATH) {
                return None;
            }
            if href == index_url || href.ends_with("/mwb/") {
                return None;
            }
            if !DATE_RE.is_match(&title) {
                return None;
            }

            let url = if href.starts_with("http") {
                href
            } else {
                format!("{}{}", BASE_URL, href)
            };
            Some(WeekLink { title, url })
        })
        .collect()
}

/// (month, day) of the leading date in the link text; unknown sorts first.
pub fn date_sort_key(title: &str) -> (u32, u32) {
    let Some(caps) = SORT_KEY_RE.captures(title) else {
        return (0, 0);
    };
    let day = caps[1].parse().unwrap_or(0);
    let month_name = caps[2].to_lowercase();
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_name)
        .map(|(_, n)| *n)
        .unwrap_or(0);
    (month, day)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_URL: &str =
        "https://www.jw.org/es/biblioteca/guia-actividades-reunion-testigos-jehova/mwb-septiembre-octubre-2025/";

    #[test]
    fn harvest_keeps_dated_guide_links() {
        let html = r#"
            <a href="/es/biblioteca/guia-actividades-reunion-testigos-jehova/mwb-sep/programa-8-14-de-septiembre/">8-14 de septiembre</a>
            <a href="/es/noticias/ultimas/">Últimas noticias</a>
            <a href="/es/biblioteca/guia-actividades-reunion-testigos-jehova/mwb/">Guía</a>
        "#;
        let links = harvest_links(html, INDEX_URL);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "8-14 de septiembre");
        assert!(links[0].url.starts_with("https://www.jw.org/es/"));
    }

    #[test]
    fn harvest_skips_the_index_itself() {
        let html = format!(r#"<a href="{}">1-7 de septiembre</a>"#, INDEX_URL);
        assert!(harvest_links(&html, INDEX_URL).is_empty());
    }

    #[test]
    fn harvest_skips_links_without_date_text() {
        let html = r#"<a href="/es/biblioteca/guia-actividades-reunion-testigos-jehova/mwb-sep/semana/">Ver programa</a>"#;
        assert!(harvest_links(html, INDEX_URL).is_empty());
    }

    #[test]
    fn harvest_flattens_nested_markup_in_text() {
        let html = r#"<a href="/es/biblioteca/guia-actividades-reunion-testigos-jehova/mwb-sep/s2/"><span>15-21</span> <span>de septiembre</span></a>"#;
        let links = harvest_links(html, INDEX_URL);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "15-21 de septiembre");
    }

    #[test]
    fn sort_key_orders_across_months() {
        assert_eq!(date_sort_key("8-14 de septiembre"), (9, 8));
        assert_eq!(date_sort_key("29 de septiembre a 5 de octubre"), (9, 29));
        assert!(date_sort_key("3-9 de febrero") < date_sort_key("6-12 de octubre"));
        assert_eq!(date_sort_key("sin fecha"), (0, 0));
    }

    #[test]
    fn sort_is_chronological() {
        let mut links = vec![
            WeekLink { title: "6-12 de octubre".into(), url: "u1".into() },
            WeekLink { title: "8-14 de septiembre".into(), url: "u2".into() },
            WeekLink { title: "29 de septiembre a 5 de octubre".into(), url: "u3".into() },
        ];
        links.sort_by_key(|l| date_sort_key(&l.title));
        let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "8-14 de septiembre",
                "29 de septiembre a 5 de octubre",
                "6-12 de octubre"
            ]
        );
    }
}
