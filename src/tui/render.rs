use std::borrow::Cow;

use super::state::{AppState, FormField};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn draw(f: &mut Frame, state: &AppState, spinner_frame: u8) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(1),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_form(f, state, chunks[0], spinner_frame);
    draw_table(f, state, chunks[1]);
    draw_pagination(f, state, chunks[2]);
    draw_logs(f, state, chunks[3]);
    draw_footer(f, chunks[4]);

    if state.alert.is_some() {
        draw_alert(f, state);
    }
}

fn draw_form(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let label = |field: FormField, text: &'static str| {
        if state.focus == field {
            Span::styled(text, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(text, Style::default().fg(Color::DarkGray))
        }
    };
    let cursor = |field: FormField| if state.focus == field { "_" } else { "" };
    let width = area.width.saturating_sub(20) as usize;

    let checkbox = if state.form.remove_redundancy { "[x]" } else { "[ ]" };
    let lines = vec![
        Line::from(vec![
            label(FormField::TaxaList, " Taxa list : "),
            Span::raw(tail(&state.form.taxa_list, width).into_owned()),
            Span::raw(cursor(FormField::TaxaList)),
        ]),
        Line::from(vec![
            label(FormField::TaxaFile, " Taxa file : "),
            Span::raw(tail(&state.form.taxa_file_path, width).into_owned()),
            Span::raw(cursor(FormField::TaxaFile)),
        ]),
        Line::from(vec![
            label(FormField::RemoveRedundancy, " Remove redundancy : "),
            Span::raw(checkbox),
        ]),
    ];

    let activity = if state.is_busy() {
        let frame = SPINNER_FRAMES[spinner_frame as usize % SPINNER_FRAMES.len()];
        format!(" {} ", frame)
    } else {
        String::new()
    };
    let title = format!(" Filter proteomes @ {} {}", state.server, activity);
    let para = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_table(f: &mut Frame, state: &AppState, area: Rect) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let id_w = 14;
    let count_w = 14;
    let organism_w = inner_width.saturating_sub(id_w + count_w + 2).max(8);

    let header = Row::new(vec!["Proteome Id", "Organism", "Protein count"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = state
        .table
        .rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.proteome_id.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate_with_ellipsis(&r.organism, organism_w).into_owned()),
                Cell::from(r.protein_count.to_string()),
            ])
        })
        .collect();

    let title = match state.table.count {
        Some(count) => format!(" Proteomes ({} matching) ", count),
        None => " Proteomes ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(id_w as u16),
            Constraint::Length(organism_w as u16),
            Constraint::Length(count_w as u16),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));

    f.render_widget(table, area);
}

fn draw_pagination(f: &mut Frame, state: &AppState, area: Rect) {
    let control = |text: &'static str, disabled: bool| {
        if disabled {
            Span::styled(text, Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(text, Style::default().fg(Color::Yellow))
        }
    };

    let mut spans = vec![
        Span::raw("  "),
        control("[\u{2190}] Previous", state.table.prev_disabled),
        Span::raw(format!("   Page {}   ", state.current_page)),
        control("Next [\u{2192}]", state.table.next_disabled),
        Span::styled(
            format!("   {} per page", state.page_size),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if !state.status.is_empty() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::raw(state.status.clone()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible_lines)
        .map(|l| {
            let color = match l.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                "SAVE" => Color::Green,
                _ => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.time, l.level);
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let para = Paragraph::new(lines).block(Block::default().title(" Log ").borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let line = Line::from(vec![
        key("  [Tab]"),
        Span::raw(" field  "),
        key("[Enter]"),
        Span::raw(" filter  "),
        key("[\u{2190}/\u{2192}]"),
        Span::raw(" page  "),
        key("[Space]"),
        Span::raw(" toggle  "),
        key("[Ctrl-D]"),
        Span::raw(" download FASTA  "),
        key("[Esc]"),
        Span::raw(" quit  "),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_alert(f: &mut Frame, state: &AppState) {
    let Some(alert) = &state.alert else { return };

    let area = centered_rect(60, 40, f.area());
    let mut lines: Vec<Line> = alert.message.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Enter/Esc] dismiss",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(format!(" {} ", alert.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let para = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(para, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}

/// Keep the end of an input visible while typing.
fn tail(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        return Cow::Borrowed(s);
    }
    let skip = char_count - max_width;
    Cow::Owned(s.chars().skip(skip).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Row as ProteomeRow;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Homo sapiens", 20), "Homo sapiens");
        assert_eq!(truncate_with_ellipsis("Homo sapiens", 7), "Homo...");
        assert_eq!(truncate_with_ellipsis("Homo sapiens", 2), "..");
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }

    #[test]
    fn test_draws_rows_and_alert() {
        let mut state = AppState::new("http://localhost:8000", 30);
        state.table.count = Some(1);
        state.table.rows = vec![ProteomeRow {
            proteome_id: "UP000005640".to_string(),
            organism: "Homo sapiens".to_string(),
            protein_count: 20596,
        }];
        state.show_alert("Download failed", "Bad taxon ID: XYZ".to_string());

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| draw(f, &state, 0)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("UP000005640"));
        assert!(text.contains("1 matching"));
        assert!(text.contains("Bad taxon ID: XYZ"));
    }
}
