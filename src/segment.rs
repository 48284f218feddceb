//! Splits an accumulated bot reply into renderable segments.
//!
//! The reply text grows as streaming deltas arrive, so this is a pure
//! function re-run over the whole buffer on every update. Incomplete input
//! (an unterminated chart fence, a half-received table) must render as plain
//! text rather than fail; the terminator simply arrives in a later call.

use serde::Deserialize;
use strum::AsRefStr;

/// Opening fence for an embedded chart specification.
const CHART_FENCE_OPEN: &str = "```json:chart";
const FENCE_CLOSE: &str = "```";

/// Shown in place of a chart whose JSON does not parse.
pub const CHART_ERROR_TEXT: &str = "Error displaying chart.";

/// Chart specification embedded in a reply as a fenced `json:chart` block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(rename = "data")]
    pub series: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(rename = "dataKey")]
    pub value_key: String,
    #[serde(rename = "xAxisKey")]
    pub category_key: String,
    #[serde(rename = "yAxisLabel", default)]
    pub axis_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

impl ChartSpec {
    /// Category label and numeric value for each record, in series order.
    /// Records missing either key are skipped.
    pub fn points(&self) -> Vec<(String, f64)> {
        self.series
            .iter()
            .filter_map(|record| {
                let category = record.get(&self.category_key).map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })?;
                let value = record.get(&self.value_key)?.as_f64()?;
                Some((category, value))
            })
            .collect()
    }
}

/// One renderable piece of a bot reply, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Chart(ChartSpec),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Text(Vec<TextLine>),
}

/// A formatted line inside a text segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub kind: LineKind,
    pub spans: Vec<Inline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Paragraph,
    ListItem,
}

/// Inline run within a line; `Strong` comes from `**…**` pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Plain(String),
    Strong(String),
}

/// Segment the accumulated reply text. Empty input yields no segments.
pub fn segment_reply(text: &str) -> Vec<Segment> {
    let lines: Vec<&str> = text.lines().collect();
    let mut segments = Vec::new();
    let mut span: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.trim_start().starts_with(CHART_FENCE_OPEN) {
            // Look for the closing fence; without one the block is still
            // streaming and stays plain text for now.
            if let Some(close) = lines[i + 1..]
                .iter()
                .position(|l| l.trim() == FENCE_CLOSE)
            {
                flush_span(&mut segments, &mut span);
                let body = lines[i + 1..i + 1 + close].join("\n");
                segments.push(parse_chart(&body));
                i += close + 2;
                continue;
            }
        }
        span.push(line);
        i += 1;
    }

    flush_span(&mut segments, &mut span);
    segments
}

fn parse_chart(body: &str) -> Segment {
    match serde_json::from_str::<ChartSpec>(body.trim()) {
        Ok(spec) => Segment::Chart(spec),
        Err(_) => Segment::Text(vec![TextLine {
            kind: LineKind::Paragraph,
            spans: vec![Inline::Plain(CHART_ERROR_TEXT.to_string())],
        }]),
    }
}

/// Convert a run of non-chart lines into Table and Text segments.
fn flush_span(segments: &mut Vec<Segment>, span: &mut Vec<&str>) {
    let mut text_lines: Vec<TextLine> = Vec::new();
    let mut i = 0;

    while i < span.len() {
        if is_table_line(span[i]) {
            let mut end = i + 1;
            while end < span.len() && is_table_line(span[end]) {
                end += 1;
            }
            // Header plus separator at minimum; a lone pipe line is just text.
            if end - i >= 2 {
                if !text_lines.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text_lines)));
                }
                segments.push(parse_table(&span[i..end]));
                i = end;
                continue;
            }
        }
        if let Some(line) = format_line(span[i]) {
            text_lines.push(line);
        }
        i += 1;
    }

    if !text_lines.is_empty() {
        segments.push(Segment::Text(text_lines));
    }
    span.clear();
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn parse_table(lines: &[&str]) -> Segment {
    let header = split_cells(lines[0]);
    // lines[1] is the |---|---| separator row.
    let rows = lines[2..].iter().map(|l| split_cells(l)).collect();
    Segment::Table { header, rows }
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format one plain line; blank lines produce nothing.
fn format_line(line: &str) -> Option<TextLine> {
    if line.trim().is_empty() {
        return None;
    }
    let (kind, body) = if let Some(rest) = line.strip_prefix("* ") {
        (LineKind::ListItem, rest)
    } else if let Some(rest) = line.strip_prefix("- ") {
        (LineKind::ListItem, rest)
    } else {
        (LineKind::Paragraph, line)
    };
    Some(TextLine {
        kind,
        spans: parse_inline(body),
    })
}

/// Split a line into plain and `**bold**` runs. An unpaired `**` is kept
/// verbatim as plain text.
fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let Some(close) = rest[open + 2..].find("**") else {
            break;
        };
        if open > 0 {
            spans.push(Inline::Plain(rest[..open].to_string()));
        }
        spans.push(Inline::Strong(rest[open + 2..open + 2 + close].to_string()));
        rest = &rest[open + close + 4..];
    }

    if !rest.is_empty() {
        spans.push(Inline::Plain(rest.to_string()));
    }
    spans
}
