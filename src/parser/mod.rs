pub mod fields;
pub mod patterns;
pub mod sections;

use serde::Serialize;

pub use sections::{Section, Segment};

/// One week's parsed program. Immutable once assembled; missing fields are
/// empty strings rather than errors.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRecord {
    pub date: String,
    pub scripture: String,
    pub hymn_opening: String,
    pub hymn_middle: String,
    pub hymn_closing: String,
    pub intro_remarks: String,
    pub closing_remarks: String,
    /// The three sections in program order, each with its segments.
    pub sections: Vec<(Section, Vec<Segment>)>,
    /// Boundary the classifier used between teaching and application items.
    pub cutoff: u32,
}

/// Single-pass derivation: field extractors and the boundary heuristic are
/// independent of each other, so a field that finds nothing degrades to empty
/// without touching the rest of the record.
pub fn parse_schedule(text: &str) -> ScheduleRecord {
    let (sections, cutoff) = sections::classify_segments(text);
    let hymns = fields::extract_hymns(text);
    let remarks = fields::extract_remarks(text);

    ScheduleRecord {
        date: fields::extract_date(text),
        scripture: fields::extract_scripture(text),
        hymn_opening: hymns.opening,
        hymn_middle: hymns.middle,
        hymn_closing: hymns.closing,
        intro_remarks: remarks.intro,
        closing_remarks: remarks.closing,
        sections,
        cutoff,
    }
}

impl ScheduleRecord {
    /// Segments across all three sections, ordered by sequence number.
    pub fn segments_in_order(&self) -> Vec<&Segment> {
        let mut all: Vec<&Segment> = self.sections.iter().flat_map(|(_, v)| v).collect();
        all.sort_by_key(|s| s.sequence);
        all
    }

    pub fn segment_count(&self) -> usize {
        self.sections.iter().map(|(_, v)| v.len()).sum()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    // A typical week page after flattening: one trimmed line per text node.
    const WEEK_TEXT: &str = "\
Guía de actividades para la reunión Vida y Ministerio Cristianos
Programa de la reunión de entre semana
8-14 de septiembre
SALMOS 92
Canción 2 y oración
Palabras de introducción (1 min)
TESOROS DE LA BIBLIA
1. Es bueno darle gracias a Jehová (10 min)
2. Busquemos perlas escondidas (10 min)
3. Lectura de la Biblia (4 min)
SEAMOS MEJORES MAESTROS
4. Empiece conversaciones (3 min)
5. Haga revisitas (4 min)
6. Discurso (5 min)
NUESTRA VIDA CRISTIANA
Canción 139
7. Necesidades de la congregación (15 min)
8. Estudio bíblico de la congregación (30 min)
Palabras de conclusión (3 min)
Canción 89 y oración final
";

    fn section<'a>(record: &'a ScheduleRecord, which: Section) -> &'a Vec<Segment> {
        &record.sections.iter().find(|(s, _)| *s == which).unwrap().1
    }

    #[test]
    fn full_week_parses() {
        let record = parse_schedule(WEEK_TEXT);

        assert_eq!(record.date, "8-14 de septiembre");
        assert_eq!(record.scripture, "SALMOS 92");
        assert_eq!(record.hymn_opening, "Canción 2");
        assert_eq!(record.hymn_middle, "Canción 139");
        assert_eq!(record.hymn_closing, "Canción 89");
        assert_eq!(record.intro_remarks, "Palabras de introducción (1 min)");
        assert_eq!(record.closing_remarks, "Palabras de conclusión (3 min)");
        assert_eq!(record.cutoff, 6);

        assert_eq!(section(&record, Section::Opening).len(), 3);
        assert_eq!(section(&record, Section::Teaching).len(), 3);
        assert_eq!(section(&record, Section::Application).len(), 2);

        let ordered = record.segments_in_order();
        let sequences: Vec<u32> = ordered.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
        assert_eq!(ordered[0].title, "Es bueno darle gracias a Jehová");
        assert_eq!(ordered[7].title, "Estudio bíblico de la congregación");
        assert_eq!(ordered[7].duration_label(), "30 min");
    }

    #[test]
    fn seven_teaching_parts_shift_the_boundary() {
        let mut numbered: String = (1..=7)
            .map(|n| format!("{}. Parte {} (10 min)\n", n, n))
            .collect();
        numbered.push_str("Canción 47\n8. Parte 8 (10 min)\n9. Parte 9 (10 min)\n");
        let text = format!(
            "1-7 de diciembre\nCanción 12\n{}Estudio bíblico (30 min)\nCanción 88\n",
            numbered
        );

        let record = parse_schedule(&text);
        assert_eq!(record.cutoff, 7);
        assert_eq!(section(&record, Section::Opening).len(), 3);
        assert_eq!(section(&record, Section::Teaching).len(), 4);
        assert_eq!(section(&record, Section::Application).len(), 3);
        assert_eq!(record.segment_count(), 10);

        let sequences: Vec<u32> = record.segments_in_order().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn sparse_text_degrades_to_empty_fields() {
        let record = parse_schedule("Programa provisional\n1. Única parte (5 min)\n");
        assert_eq!(record.date, "");
        assert_eq!(record.scripture, "");
        assert_eq!(record.hymn_opening, "");
        assert_eq!(record.hymn_middle, "");
        assert_eq!(record.hymn_closing, "");
        assert_eq!(record.intro_remarks, "");
        assert_eq!(record.closing_remarks, "");
        assert_eq!(record.cutoff, sections::DEFAULT_CUTOFF);
        assert_eq!(record.segment_count(), 1);
    }
}
