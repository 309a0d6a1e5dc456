//! Field extraction from KEGG flat-file entries (`/get/<id>+<id>...`).
//!
//! Entries are separated by `///`. Each entry is a sequence of sections whose
//! marker (`ENTRY`, `ORTHOLOGY`, `AASEQ`, ...) starts in column zero.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const RECORD_TERMINATOR: &str = "///";

static TAXONOMY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^TAXONOMY\s+TAX:(\S+)").unwrap());
static ORTHOLOGY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ORTHOLOGY\s+(\S+)").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatRecord {
    pub taxaid: Option<String>,
    pub koid: Option<String>,
    pub aaseq: Option<String>,
    pub ntseq: Option<String>,
}

/// Splits a multi-entry response into per-entry line blocks. Whitespace-only
/// blocks, such as the one after the final terminator, are dropped.
pub fn split_records(text: &str) -> Vec<Vec<&str>> {
    text.split(RECORD_TERMINATOR)
        .filter(|block| !block.trim().is_empty())
        .map(|block| block.lines().collect())
        .collect()
}

pub fn extract_fields<S: AsRef<str>>(lines: &[S]) -> FlatRecord {
    let lines = lines.iter().map(AsRef::as_ref).collect::<Vec<&str>>();

    let taxaid = first_capture(&lines, "TAXONOMY", &TAXONOMY);
    let koid = first_capture(&lines, "ORTHOLOGY", &ORTHOLOGY).map(|ko| format!("ko:{ko}"));
    let aaseq = sequence_section(&lines, "AASEQ", &["COMMENT", "NTSEQ"]);
    let ntseq = sequence_section(&lines, "NTSEQ", &["COMMENT", "AASEQ"]);

    FlatRecord {
        taxaid,
        koid,
        aaseq,
        ntseq,
    }
}

/// The first token after the `ENTRY` marker, e.g. `b0001` for
/// `ENTRY       b0001             CDS       T00007`.
pub fn entry_name<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines
        .iter()
        .find(|line| is_marker(line, "ENTRY"))
        .and_then(|line| line.split_whitespace().nth(1))
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .map(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .unwrap_or(false)
}

fn first_capture(lines: &[&str], marker: &str, pattern: &Regex) -> Option<String> {
    lines
        .iter()
        .find(|line| is_marker(line, marker))
        .and_then(|line| pattern.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Collects residues from the marker line through the line before the next
/// stop marker. The residue count printed after the marker and any column
/// padding are discarded.
fn sequence_section(lines: &[&str], marker: &str, stops: &[&str]) -> Option<String> {
    let start = lines.iter().position(|line| is_marker(line, marker))?;
    let mut sequence = String::new();
    let head = &lines[start][marker.len()..];
    for line in std::iter::once(head).chain(
        lines[start + 1..]
            .iter()
            .copied()
            .take_while(|line| !stops.iter().any(|stop| is_marker(line, stop))),
    ) {
        sequence.extend(
            line.chars()
                .filter(|ch| !ch.is_ascii_digit() && !ch.is_whitespace()),
        );
    }
    (!sequence.is_empty()).then_some(sequence)
}
