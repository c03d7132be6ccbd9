use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::FetchRow;

/// Retrieval settings, passed in explicitly rather than read from process
/// globals. The defaults mirror a desktop browser against the es-ES site.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
            accept_language: "es-ES,es;q=0.9".into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_backoff: Duration::from_millis(2000),
            concurrency: 10,
        }
    }
}

pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_str(&config.accept)?);
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout)
        .build()?;
    Ok(client)
}

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Fetch week pages concurrently, saving each result to DB as it arrives.
pub async fn fetch_pages_streaming(
    conn: &Connection,
    pages: Vec<(i64, String, String)>,
    config: &FetchConfig,
) -> Result<FetchStats> {
    let client = build_client(config)?;
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop saves to DB
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(config.concurrency * 2);

    for (week_id, url, title) in pages {
        let client = client.clone();
        let config = config.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let row = fetch_with_retry(&client, &config, week_id, &url, &title).await;
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    // Prepare statements once, reuse for each row
    let mut insert_stmt = conn.prepare(
        "INSERT INTO page_data (week_id, url, title, text, status, error, latency_ms, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut update_stmt =
        conn.prepare("UPDATE weeks SET visited = 1, visited_at = datetime('now') WHERE id = ?1")?;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }

        insert_stmt.execute(rusqlite::params![
            row.week_id,
            row.url,
            row.title,
            row.text,
            row.status,
            row.error,
            row.latency_ms,
            row.fetched_at,
        ])?;
        update_stmt.execute(rusqlite::params![row.week_id])?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    config: &FetchConfig,
    week_id: i64,
    url: &str,
    title: &str,
) -> FetchRow {
    let mut row = fetch_one(client, week_id, url, title).await;

    for attempt in 0..config.max_retries {
        let should_retry = match &row.error {
            Some(e) if e.contains("timed out") => true,
            Some(e) if e.contains("429") || e.contains("500") || e.contains("502") || e.contains("503") => true,
            _ => false,
        };
        if !should_retry {
            return row;
        }

        let backoff = config.base_backoff * 2u32.pow(attempt);
        warn!(
            "Retrying {} (attempt {}/{}), backing off {:.1}s",
            title,
            attempt + 1,
            config.max_retries,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        row = fetch_one(client, week_id, url, title).await;
    }

    row
}

async fn fetch_one(client: &reqwest::Client, week_id: i64, url: &str, title: &str) -> FetchRow {
    let start = Instant::now();
    let fetched_at = chrono::Utc::now().to_rfc3339();

    let result = async {
        let response = client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    }
    .await;
    let elapsed = start.elapsed().as_millis() as i64;

    match result {
        Ok((status, body)) if status.is_success() => FetchRow {
            week_id,
            url: url.to_string(),
            title: title.to_string(),
            text: Some(flatten_html(&body)),
            status: Some(status.as_u16() as i32),
            error: None,
            latency_ms: Some(elapsed),
            fetched_at,
        },
        Ok((status, _)) => FetchRow {
            week_id,
            url: url.to_string(),
            title: title.to_string(),
            text: None,
            status: Some(status.as_u16() as i32),
            error: Some(format!("HTTP {}", status.as_u16())),
            latency_ms: Some(elapsed),
            fetched_at,
        },
        Err(e) => FetchRow {
            week_id,
            url: url.to_string(),
            title: title.to_string(),
            text: None,
            status: None,
            error: Some(e.to_string()),
            latency_ms: Some(elapsed),
            fetched_at,
        },
    }
}

// ── HTML flattening ──

static MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main[\s>].*?</main>").unwrap());
static DROP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<!--.*?-->").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());

/// Flatten an HTML document to plain text: the main element region when
/// present, every text node on its own trimmed line, no scripts or styles.
/// The parser patterns anchor on these line starts.
pub fn flatten_html(html: &str) -> String {
    let region = MAIN_RE
        .find(html)
        .map(|m| m.as_str())
        .unwrap_or(html);
    let cleaned = DROP_RE.replace_all(region, "");
    let text = TAG_RE.replace_all(&cleaned, "\n");
    let decoded = decode_entities(&text);

    decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_prefers_main_region() {
        let html = "<html><body><nav>Menú</nav>\
                    <main><h1>8-14 de septiembre</h1><p>SALMOS 92</p></main>\
                    <footer>pie</footer></body></html>";
        let text = flatten_html(html);
        assert_eq!(text, "8-14 de septiembre\nSALMOS 92");
    }

    #[test]
    fn flatten_whole_document_without_main() {
        let html = "<p>Canción 2</p><p>Canción 139</p>";
        let text = flatten_html(html);
        assert_eq!(text, "Canción 2\nCanción 139");
    }

    #[test]
    fn flatten_drops_scripts_styles_comments() {
        let html = "<main><script>var x = 1;</script><style>p { color: red }</style>\
                    <!-- oculto --><p>visible</p></main>";
        assert_eq!(flatten_html(html), "visible");
    }

    #[test]
    fn flatten_decodes_entities() {
        let html = "<main><p>Preguntas&nbsp;y respuestas &amp; notas</p></main>";
        assert_eq!(flatten_html(html), "Preguntas y respuestas & notas");
    }

    #[test]
    fn flatten_trims_every_line() {
        let html = "<main><p>  1. Lectura de la Biblia (4 min)  </p></main>";
        assert_eq!(flatten_html(html), "1. Lectura de la Biblia (4 min)");
    }
}
