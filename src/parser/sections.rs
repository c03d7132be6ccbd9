use serde::Serialize;

use super::patterns::{HYMN_RE, NUMBERED_PART_RE, UNNUMBERED_PART_RE};

/// Boundary used when the middle hymn cannot anchor it.
pub const DEFAULT_CUTOFF: u32 = 6;

/// The three fixed top-level groupings of a week's program, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    Opening,
    Teaching,
    Application,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Opening => "opening",
            Section::Teaching => "teaching",
            Section::Application => "application",
        }
    }
}

/// One timed program item.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub sequence: u32,
    pub title: String,
    pub duration_min: u32,
}

impl Segment {
    pub fn duration_label(&self) -> String {
        format!("{} min", self.duration_min)
    }
}

/// The flattened text keeps no section headers, so the middle hymn is the only
/// structural signal left: numbered parts before it belong to the teaching
/// block. Returns the highest part label preceding the second hymn marker.
pub fn section_cutoff(text: &str) -> u32 {
    let anchor = match HYMN_RE.find_iter(text).nth(1) {
        Some(m) => m.start(),
        None => return DEFAULT_CUTOFF,
    };

    NUMBERED_PART_RE
        .captures_iter(text)
        .filter(|caps| caps.get(0).map(|m| m.start() < anchor).unwrap_or(false))
        .filter_map(|caps| caps[1].parse().ok())
        .max()
        .unwrap_or(DEFAULT_CUTOFF)
}

/// Classify every detected part into the three sections and number them.
///
/// Numbered parts route by their source label: 1-3 always open the program,
/// labels up to the cutoff are teaching items, the rest are application items.
/// The five named unnumbered parts always land in the application section.
/// One counter assigns sequence numbers across both passes, numbered first.
pub fn classify_segments(text: &str) -> (Vec<(Section, Vec<Segment>)>, u32) {
    let cutoff = section_cutoff(text);

    let mut opening = Vec::new();
    let mut teaching = Vec::new();
    let mut application = Vec::new();
    let mut counter = 0u32;

    for caps in NUMBERED_PART_RE.captures_iter(text) {
        let label: u32 = caps[1].parse().unwrap_or(0);
        counter += 1;
        let segment = Segment {
            sequence: counter,
            title: caps[2].trim().to_string(),
            duration_min: caps[3].parse().unwrap_or(0),
        };
        if label <= 3 {
            opening.push(segment);
        } else if label <= cutoff {
            teaching.push(segment);
        } else {
            application.push(segment);
        }
    }

    for caps in UNNUMBERED_PART_RE.captures_iter(text) {
        counter += 1;
        application.push(Segment {
            sequence: counter,
            title: caps[1].trim().to_string(),
            duration_min: caps[2].parse().unwrap_or(0),
        });
    }

    (
        vec![
            (Section::Opening, opening),
            (Section::Teaching, teaching),
            (Section::Application, application),
        ],
        cutoff,
    )
}

// ── Tests ──
