use std::sync::LazyLock;

use regex::Regex;

// The fetched pages arrive as flat text with one trimmed line per text node,
// so every recognizer works on line shape, not markup.

/// Week date span: "8-14 de septiembre" or "29 de septiembre al 5 de octubre".
pub static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d{1,2}\s*(?:-\s*\d{1,2}|de\s+\w+\s+(?:a|al)\s+\d{1,2})\s+de\s+\w+").unwrap()
});

/// Hymn marker: "Canción 12". Three per week (opening, middle, closing).
pub static HYMN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Canción\s+(\d+)").unwrap());

/// Introductory/concluding remarks with their minute count.
pub static REMARKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Palabras\s+de\s+(introducción|conclusión)\s*[:(]?\s*(\d+)\s*min").unwrap()
});

/// Numbered program part at line start: "4. Empiece conversaciones (3 min)".
pub static NUMBERED_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^(\d+)\.\s*([^\n(]+?)\s*\((\d+)\s*min").unwrap());

/// The five part names that appear without a leading number.
pub static UNNUMBERED_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(Empiece conversaciones|Haga revisitas|Estudio bíblico|Necesidades de la congregación|Canción del Reino y oración final)\s*\(?\s*(\d+)\s*min").unwrap()
});

/// Fallback label when no catalogued book reference is present.
pub static SCRIPTURE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Lectura\s+b[ií]blica\s*[:\-]?\s*([A-Za-zÁÉÍÓÚáéíóúñÑ0-9\s:–\-]+)").unwrap()
});

/// Canonical book names, matched case-insensitively. Catalogue order decides
/// which book wins when several appear in the same text.
pub const BIBLE_BOOKS: &[&str] = &[
    "ECLESIASTÉS", "GÉNESIS", "ÉXODO", "LEVÍTICO", "NÚMEROS", "DEUTERONOMIO",
    "JOSUÉ", "JUECES", "RUT", "SAMUEL", "REYES", "CRÓNICAS", "ESDRAS",
    "NEHEMÍAS", "ESTER", "JOB", "SALMOS", "PROVERBIOS", "CANTARES",
    "ISAÍAS", "JEREMÍAS", "LAMENTACIONES", "EZEQUIEL", "DANIEL",
    "OSEAS", "JOEL", "AMÓS", "ABDÍAS", "JONÁS", "MIQUEAS", "NAHÚM",
    "HABACUC", "SOFONÍAS", "HAGEO", "ZACARÍAS", "MALAQUÍAS",
    "MATEO", "MARCOS", "LUCAS", "JUAN", "HECHOS", "ROMANOS",
    "CORINTIOS", "GÁLATAS", "EFESIOS", "FILIPENSES", "COLOSENSES",
    "TESALONICENSES", "TIMOTEO", "TITO", "FILEMÓN", "HEBREOS",
    "SANTIAGO", "PEDRO", "JUDAS", "APOCALIPSIS",
];

/// One reference matcher per book: "SALMOS 92", "Job 6:1", "Nehemías 9:20-10:39".
pub static BOOK_REFS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BIBLE_BOOKS
        .iter()
        .map(|book| {
            Regex::new(&format!(
                r"(?is)({})\s*\d+(?::\d+)?(?:[-–]\d+(?::\d+)?)?",
                book
            ))
            .unwrap()
        })
        .collect()
});

// ── Tests ──
