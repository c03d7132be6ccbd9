use std::sync::LazyLock;

use regex::Regex;

use super::patterns::{BOOK_REFS, DATE_RE, HYMN_RE, REMARKS_RE, SCRIPTURE_LABEL_RE};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The date sits near the top of the page, but stray date spans can appear in
/// the body, so the first 20 lines are scanned before the whole text.
pub fn extract_date(text: &str) -> String {
    for line in text.lines().take(20) {
        if let Some(m) = DATE_RE.find(line) {
            return m.as_str().trim().to_string();
        }
    }
    DATE_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// First catalogued book with a chapter/verse reference wins, in catalogue
/// order. Falls back to whatever follows a "Lectura bíblica" label.
pub fn extract_scripture(text: &str) -> String {
    for re in BOOK_REFS.iter() {
        if let Some(m) = re.find(text) {
            return WS_RE.replace_all(m.as_str(), " ").trim().to_string();
        }
    }
    SCRIPTURE_LABEL_RE
        .captures(text)
        .map(|caps| WS_RE.replace_all(&caps[1], " ").trim().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct Hymns {
    pub opening: String,
    pub middle: String,
    pub closing: String,
}

/// Hymn markers in document order fill the opening/middle/closing slots.
/// Missing occurrences leave their slot empty; there is no interpolation.
pub fn extract_hymns(text: &str) -> Hymns {
    let nums: Vec<String> = HYMN_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    let slot = |i: usize| {
        nums.get(i)
            .map(|n| format!("Canción {}", n))
            .unwrap_or_default()
    };
    Hymns {
        opening: slot(0),
        middle: slot(1),
        closing: slot(2),
    }
}

#[derive(Debug, Default)]
pub struct Remarks {
    pub intro: String,
    pub closing: String,
}

/// Remarks are keyed by subtype, not position; either may be absent.
pub fn extract_remarks(text: &str) -> Remarks {
    let mut remarks = Remarks::default();
    for caps in REMARKS_RE.captures_iter(text) {
        let formatted = format!("Palabras de {} ({} min)", &caps[1], &caps[2]);
        match caps[1].to_lowercase().as_str() {
            "introducción" => remarks.intro = formatted,
            "conclusión" => remarks.closing = formatted,
            _ => {}
        }
    }
    remarks
}

// ── Tests ──
