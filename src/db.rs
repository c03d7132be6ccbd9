use anyhow::Result;
use rusqlite::Connection;

use crate::index::WeekLink;
use crate::parser::ScheduleRecord;

const DB_PATH: &str = "data/mwb.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS weeks (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            title      TEXT NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_weeks_visited ON weeks(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            week_id    INTEGER NOT NULL REFERENCES weeks(id),
            url        TEXT NOT NULL,
            title      TEXT NOT NULL,
            text       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_week ON page_data(week_id);

        CREATE TABLE IF NOT EXISTS schedules (
            id              INTEGER PRIMARY KEY,
            page_id         INTEGER NOT NULL REFERENCES page_data(id),
            url             TEXT UNIQUE NOT NULL,
            title           TEXT NOT NULL,
            date            TEXT NOT NULL,
            scripture       TEXT NOT NULL,
            hymn_opening    TEXT NOT NULL,
            hymn_middle     TEXT NOT NULL,
            hymn_closing    TEXT NOT NULL,
            intro_remarks   TEXT NOT NULL,
            closing_remarks TEXT NOT NULL,
            cutoff          INTEGER NOT NULL,
            processed_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS segments (
            id           INTEGER PRIMARY KEY,
            schedule_id  INTEGER NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
            seq          INTEGER NOT NULL,
            section      TEXT NOT NULL CHECK(section IN ('opening','teaching','application')),
            title        TEXT NOT NULL,
            duration_min INTEGER NOT NULL,
            UNIQUE(schedule_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_segments_schedule ON segments(schedule_id);
        ",
    )?;
    Ok(())
}

// ── Week queue ──

pub fn insert_weeks(conn: &Connection, links: &[WeekLink]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO weeks (url, title) VALUES (?1, ?2)")?;
        for link in links {
            count += stmt.execute(rusqlite::params![link.url, link.title])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<(i64, String, String)>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, url, title FROM weeks WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, url, title FROM weeks WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Fetching ──

pub struct FetchRow {
    pub week_id: i64,
    pub url: String,
    pub title: String,
    pub text: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
    pub fetched_at: String,
}

// ── Processing ──

pub struct FetchedPage {
    pub page_data_id: i64,
    pub title: String,
    pub url: String,
    pub text: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedPage>> {
    let sql = format!(
        "SELECT pd.id, pd.title, pd.url, pd.text
         FROM page_data pd
         LEFT JOIN schedules s ON s.url = pd.url
         WHERE pd.text IS NOT NULL AND s.url IS NULL
         ORDER BY pd.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FetchedPage {
                page_data_id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                text: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Parsed schedules ──

pub struct ScheduleRow {
    pub page_data_id: i64,
    pub url: String,
    pub title: String,
    pub record: ScheduleRecord,
}

pub fn save_schedules(conn: &Connection, rows: &[ScheduleRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut s_stmt = tx.prepare(
            "INSERT OR REPLACE INTO schedules
             (page_id, url, title, date, scripture, hymn_opening, hymn_middle, hymn_closing,
              intro_remarks, closing_remarks, cutoff)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        let mut g_stmt = tx.prepare(
            "INSERT INTO segments (schedule_id, seq, section, title, duration_min)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for row in rows {
            let r = &row.record;
            s_stmt.execute(rusqlite::params![
                row.page_data_id,
                row.url,
                row.title,
                r.date,
                r.scripture,
                r.hymn_opening,
                r.hymn_middle,
                r.hymn_closing,
                r.intro_remarks,
                r.closing_remarks,
                r.cutoff,
            ])?;
            let schedule_id = tx.last_insert_rowid();
            for (section, segments) in &r.sections {
                for seg in segments {
                    g_stmt.execute(rusqlite::params![
                        schedule_id,
                        seg.sequence,
                        section.as_str(),
                        seg.title,
                        seg.duration_min,
                    ])?;
                }
            }
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Export / overview ──

pub struct ExportRow {
    pub title: String,
    pub date: String,
    pub scripture: String,
    pub hymn_opening: String,
    pub hymn_middle: String,
    pub hymn_closing: String,
    pub intro_remarks: String,
    pub closing_remarks: String,
    pub cutoff: u32,
    /// (title, duration_min) pairs in sequence order.
    pub segments: Vec<(String, u32)>,
}

pub fn fetch_schedules(conn: &Connection, limit: Option<usize>) -> Result<Vec<ExportRow>> {
    let sql = format!(
        "SELECT id, title, date, scripture, hymn_opening, hymn_middle, hymn_closing,
                intro_remarks, closing_remarks, cutoff
         FROM schedules ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = Vec::new();
    let mut ids = Vec::new();
    let mapped = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            ExportRow {
                title: row.get(1)?,
                date: row.get(2)?,
                scripture: row.get(3)?,
                hymn_opening: row.get(4)?,
                hymn_middle: row.get(5)?,
                hymn_closing: row.get(6)?,
                intro_remarks: row.get(7)?,
                closing_remarks: row.get(8)?,
                cutoff: row.get(9)?,
                segments: Vec::new(),
            },
        ))
    })?;
    for item in mapped {
        let (id, row) = item?;
        ids.push(id);
        rows.push(row);
    }

    let mut seg_stmt = conn.prepare(
        "SELECT title, duration_min FROM segments WHERE schedule_id = ?1 ORDER BY seq",
    )?;
    for (id, row) in ids.iter().zip(rows.iter_mut()) {
        row.segments = seg_stmt
            .query_map([id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub parsed: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM weeks", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM weeks WHERE visited = 1", [], |r| r.get(0))?;
    let fetched: usize = conn.query_row("SELECT COUNT(*) FROM page_data", [], |r| r.get(0))?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let parsed: usize = conn.query_row("SELECT COUNT(*) FROM schedules", [], |r| r.get(0))?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched,
        errors,
        parsed,
    })
}
