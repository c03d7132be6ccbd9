use std::path::Path;

use anyhow::{Context, Result};

use crate::db::ExportRow;

/// The sheet holds room for nine program parts; longer weeks are truncated.
pub const SEGMENT_COLUMNS: usize = 9;

pub fn headers() -> Vec<String> {
    let mut cols = vec![
        "Semana".to_string(),
        "Fecha".to_string(),
        "Lectura Bíblica".to_string(),
        "Canción Inicial".to_string(),
        "Palabras Introducción".to_string(),
    ];
    for i in 1..=SEGMENT_COLUMNS {
        cols.push(format!("Parte {}", i));
        cols.push(format!("Duración {}", i));
    }
    cols.push("Canción Intermedia".to_string());
    cols.push("Palabras Conclusión".to_string());
    cols.push("Canción Final".to_string());
    cols
}

pub fn build_row(week_no: usize, row: &ExportRow) -> Vec<String> {
    let mut out = vec![
        week_no.to_string(),
        row.date.clone(),
        row.scripture.clone(),
        row.hymn_opening.clone(),
        row.intro_remarks.clone(),
    ];
    for i in 0..SEGMENT_COLUMNS {
        match row.segments.get(i) {
            Some((title, mins)) => {
                out.push(title.clone());
                out.push(format!("{} min", mins));
            }
            None => {
                out.push(String::new());
                out.push(String::new());
            }
        }
    }
    out.push(row.hymn_middle.clone());
    out.push(row.closing_remarks.clone());
    out.push(row.hymn_closing.clone());
    out
}

pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(headers())?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record(build_row(i + 1, row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let headers = headers();
    let objects: Vec<serde_json::Value> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let object: serde_json::Map<String, serde_json::Value> = headers
                .iter()
                .cloned()
                .zip(build_row(i + 1, row).into_iter().map(serde_json::Value::from))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    let json = serde_json::to_string_pretty(&objects)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(segments: usize) -> ExportRow {
        ExportRow {
            title: "8-14 de septiembre".into(),
            date: "8-14 de septiembre".into(),
            scripture: "SALMOS 92".into(),
            hymn_opening: "Canción 2".into(),
            hymn_middle: "Canción 139".into(),
            hymn_closing: "Canción 89".into(),
            intro_remarks: "Palabras de introducción (1 min)".into(),
            closing_remarks: "Palabras de conclusión (3 min)".into(),
            cutoff: 6,
            segments: (1..=segments)
                .map(|i| (format!("Parte {}", i), i as u32))
                .collect(),
        }
    }

    #[test]
    fn header_layout_is_fixed() {
        let cols = headers();
        assert_eq!(cols.len(), 5 + SEGMENT_COLUMNS * 2 + 3);
        assert_eq!(cols[0], "Semana");
        assert_eq!(cols[4], "Palabras Introducción");
        assert_eq!(cols[5], "Parte 1");
        assert_eq!(cols[cols.len() - 3], "Canción Intermedia");
        assert_eq!(cols[cols.len() - 1], "Canción Final");
    }

    #[test]
    fn short_weeks_leave_trailing_pairs_blank() {
        let row = build_row(1, &sample(2));
        assert_eq!(row.len(), headers().len());
        assert_eq!(row[5], "Parte 1");
        assert_eq!(row[6], "1 min");
        assert_eq!(row[7], "Parte 2");
        // Pairs 3..9 blank
        assert!(row[9..5 + SEGMENT_COLUMNS * 2].iter().all(|c| c.is_empty()));
        assert_eq!(row[row.len() - 3], "Canción 139");
    }

    #[test]
    fn long_weeks_are_truncated_to_nine_pairs() {
        let row = build_row(3, &sample(11));
        assert_eq!(row.len(), headers().len());
        assert_eq!(row[5 + (SEGMENT_COLUMNS - 1) * 2], "Parte 9");
        assert!(!row.iter().any(|c| c == "Parte 10"));
        assert_eq!(row[0], "3");
    }

    #[test]
    fn trailing_columns_follow_the_segment_block() {
        let row = build_row(1, &sample(9));
        let n = row.len();
        assert_eq!(row[n - 3], "Canción 139");
        assert_eq!(row[n - 2], "Palabras de conclusión (3 min)");
        assert_eq!(row[n - 1], "Canción 89");
    }
}
