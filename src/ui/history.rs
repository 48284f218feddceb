//! Message list display component

use crate::events::{Author, Message};
use crate::segment::{
    ChartKind, ChartSpec, Inline, LineKind, Segment, TextLine, segment_reply,
};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Widget},
};

const CHART_HEIGHT: u16 = 10;

/// Conversation starters shown on the welcome screen; digit keys 1-3 send
/// the matching prompt.
pub const SUGGESTED_PROMPTS: [&str; 3] = [
    "I make high-quality mango jam. Which cities in the US have the highest demand?",
    "Where can I export organic quinoa from Peru for the best profit margin?",
    "What are the market trends for value-added coconut products like virgin coconut oil?",
];

/// One vertically stacked piece of rendered conversation.
enum RenderBlock {
    Lines(Vec<Line<'static>>),
    Chart(ChartSpec),
}

impl RenderBlock {
    fn height(&self) -> usize {
        match self {
            RenderBlock::Lines(lines) => lines.len(),
            RenderBlock::Chart(_) => CHART_HEIGHT as usize,
        }
    }
}

/// Scrollable message list, pinned to the newest message.
pub struct MessageList<'a> {
    pub messages: &'a [Message],
    pub error: Option<&'a str>,
    pub streaming: bool,
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("🌾 Agri-Market Advisor");
        let inner = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() && self.error.is_none() {
            render_welcome(inner, buf);
            return;
        }

        let width = inner.width.saturating_sub(2) as usize;
        let mut blocks = Vec::new();
        for message in self.messages {
            render_message(message, self.streaming, width, &mut blocks);
        }
        if let Some(error) = self.error {
            blocks.push(RenderBlock::Lines(vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("⚠ {}", error),
                    Style::default().fg(Color::Red),
                )),
            ]));
        }

        // Pin the view to the bottom: skip rows above the window.
        let total: usize = blocks.iter().map(RenderBlock::height).sum();
        let height = inner.height as usize;
        let start = total.saturating_sub(height);

        let mut row = 0usize;
        for render_block in &blocks {
            match render_block {
                RenderBlock::Lines(lines) => {
                    for line in lines {
                        if row >= start && row - start < height {
                            buf.set_line(
                                inner.x,
                                inner.y + (row - start) as u16,
                                line,
                                inner.width,
                            );
                        }
                        row += 1;
                    }
                }
                RenderBlock::Chart(spec) => {
                    let first = row;
                    let last = row + CHART_HEIGHT as usize - 1;
                    // Charts only render when fully inside the window.
                    if first >= start && last - start < height {
                        let chart_area = Rect {
                            x: inner.x,
                            y: inner.y + (first - start) as u16,
                            width: inner.width.min(60),
                            height: CHART_HEIGHT,
                        };
                        render_chart(spec, chart_area, buf);
                    }
                    row += CHART_HEIGHT as usize;
                }
            }
        }
    }
}

fn render_welcome(area: Rect, buf: &mut Buffer) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to Agri-Market Advisor 🌾",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Ask about market demand, prices, and export opportunities"),
        Line::from("for your agricultural products. Try one of these:"),
        Line::from(""),
    ];
    for (i, prompt) in SUGGESTED_PROMPTS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  [{}] ", i + 1), Style::default().fg(Color::Green)),
            Span::styled(format!("\"{}\"", prompt), Style::default().fg(Color::Gray)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press 1-3 to ask · Enter to send · Shift+Enter for a new line",
        Style::default().fg(Color::DarkGray),
    )));
    for (i, line) in lines.iter().enumerate() {
        if i < area.height as usize {
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}

fn render_message(
    message: &Message,
    streaming: bool,
    width: usize,
    blocks: &mut Vec<RenderBlock>,
) {
    let (glyph, style) = match message.author {
        Author::User => ("👤 You", Style::default().fg(Color::Blue)),
        Author::Bot => ("🤖 Advisor", Style::default().fg(Color::Green)),
    };
    let timestamp = message.timestamp.format("%H:%M:%S");
    let header = Line::from(Span::styled(
        format!("{} · {} {}", glyph, timestamp, "─".repeat(16)),
        Style::default().fg(Color::DarkGray),
    ));
    blocks.push(RenderBlock::Lines(vec![Line::from(""), header]));

    // The empty bot placeholder means a reply is still on its way.
    if message.author == Author::Bot && message.text.is_empty() && streaming {
        blocks.push(RenderBlock::Lines(vec![Line::from(Span::styled(
            format!("  thinking{}", thinking_dots()),
            Style::default().fg(Color::Green),
        ))]));
        return;
    }

    match message.author {
        Author::User => {
            let lines = wrap_text(&message.text, width)
                .into_iter()
                .map(|l| Line::from(vec![Span::raw("  "), Span::styled(l, style)]))
                .collect();
            blocks.push(RenderBlock::Lines(lines));
        }
        Author::Bot => {
            for segment in segment_reply(&message.text) {
                match segment {
                    Segment::Chart(spec) => blocks.push(RenderBlock::Chart(spec)),
                    Segment::Table { header, rows } => {
                        blocks.push(RenderBlock::Lines(render_table(&header, &rows)));
                    }
                    Segment::Text(lines) => {
                        blocks.push(RenderBlock::Lines(render_text_lines(&lines)));
                    }
                }
            }
        }
    }
}

fn thinking_dots() -> &'static str {
    match (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 4
    {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    }
}

fn render_text_lines(lines: &[TextLine]) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for text_line in lines {
        let mut spans: Vec<Span<'static>> = vec![Span::raw("  ")];
        if text_line.kind == LineKind::ListItem {
            spans.push(Span::styled("• ", Style::default().fg(Color::Green)));
        }
        for inline in &text_line.spans {
            match inline {
                Inline::Plain(text) => spans.push(Span::raw(text.clone())),
                Inline::Strong(text) => spans.push(Span::styled(
                    text.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
            }
        }
        out.push(Line::from(spans));
    }
    out
}

/// Render a table as padded text columns: header, rule, rows.
fn render_table(header: &[String], rows: &[Vec<String>]) -> Vec<Line<'static>> {
    let columns = header.len().max(rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for (i, cell) in header.iter().enumerate() {
        widths[i] = widths[i].max(cell.chars().count());
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let pad = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i] + 2))
            .collect::<String>()
    };

    let mut lines = vec![Line::from(vec![
        Span::raw("  "),
        Span::styled(
            pad(header),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ])];
    let rule_width: usize = widths.iter().map(|w| w + 2).sum();
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled("─".repeat(rule_width), Style::default().fg(Color::DarkGray)),
    ]));
    for row in rows {
        lines.push(Line::from(vec![Span::raw("  "), Span::raw(pad(row))]));
    }
    lines
}

fn render_chart(spec: &ChartSpec, area: Rect, buf: &mut Buffer) {
    let points = spec.points();
    let label = spec
        .axis_label
        .clone()
        .unwrap_or_else(|| spec.value_key.clone());
    let title = format!("{} ({})", label, spec.kind.as_ref());

    if points.is_empty() {
        let line = Line::from(Span::styled(
            "  (chart has no data)",
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(area.x, area.y, &line, area.width);
        return;
    }

    match spec.kind {
        ChartKind::Bar => {
            let data: Vec<(&str, u64)> = points
                .iter()
                .map(|(label, value)| (label.as_str(), value.round().max(0.0) as u64))
                .collect();
            let bar_width = ((area.width.saturating_sub(2)) / data.len().max(1) as u16)
                .saturating_sub(1)
                .clamp(3, 9);
            BarChart::default()
                .block(Block::default().borders(Borders::ALL).title(title))
                .data(&data)
                .bar_width(bar_width)
                .bar_style(Style::default().fg(Color::Green))
                .value_style(Style::default().fg(Color::Black).bg(Color::Green))
                .render(area, buf);
        }
        ChartKind::Line => {
            let series: Vec<(f64, f64)> = points
                .iter()
                .enumerate()
                .map(|(i, (_, value))| (i as f64, *value))
                .collect();
            let y_min = series.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
            let y_max = series
                .iter()
                .map(|(_, y)| *y)
                .fold(f64::NEG_INFINITY, f64::max);
            let (y_min, y_max) = if y_min == y_max {
                (y_min - 1.0, y_max + 1.0)
            } else {
                (y_min, y_max)
            };

            let dataset = Dataset::default()
                .name(spec.value_key.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(&series);

            let x_labels: Vec<Span> = vec![
                Span::raw(points.first().map(|(l, _)| l.clone()).unwrap_or_default()),
                Span::raw(points.last().map(|(l, _)| l.clone()).unwrap_or_default()),
            ];
            let y_labels: Vec<Span> = vec![
                Span::raw(format!("{:.1}", y_min)),
                Span::raw(format!("{:.1}", y_max)),
            ];

            Chart::new(vec![dataset])
                .block(Block::default().borders(Borders::ALL).title(title))
                .x_axis(
                    Axis::default()
                        .bounds([0.0, (series.len() - 1).max(1) as f64])
                        .labels(x_labels)
                        .style(Style::default().fg(Color::Gray)),
                )
                .y_axis(
                    Axis::default()
                        .bounds([y_min, y_max])
                        .labels(y_labels)
                        .style(Style::default().fg(Color::Gray)),
                )
                .render(area, buf);
        }
    }
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let word_len = word.chars().count();
            if current.chars().count() + word_len + 1 <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            } else {
                if !current.is_empty() {
                    lines.push(current);
                    current = String::new();
                }
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
