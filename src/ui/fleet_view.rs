//! Full-screen rendering of the scraper fleet

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::fleet::FleetStatus;

use super::animations::ProgressBar;
use super::theme::{Icons, Theme};

pub struct FleetView<'a> {
    pub snapshot: Option<&'a FleetStatus>,
    pub polling: bool,
    pub failed_ticks: u64,
    pub spinner_frame: &'a str,
    pub notice: Option<&'a str>,
    pub now: DateTime<Utc>,
}

/// "12s", "4m 3s", "2h 10m"
pub fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn render_fleet(frame: &mut Frame, view: &FleetView, theme: &Theme) {
    let area = frame.area();
    frame.render_widget(Block::default().style(theme.base_style()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], view, theme);

    match view.snapshot {
        Some(snapshot) => {
            render_units(frame, chunks[1], snapshot, view.now, theme);
            render_logs(frame, chunks[2], snapshot, theme);
        }
        None => {
            let waiting = Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", view.spinner_frame), theme.info_style()),
                Span::styled("aguardando o primeiro status...", theme.muted_style()),
            ]))
            .block(Block::default().borders(Borders::ALL).border_style(theme.border_style(false)));
            frame.render_widget(waiting, chunks[1]);
        }
    }

    render_footer(frame, chunks[3], view, theme);
}

fn render_header(frame: &mut Frame, area: Rect, view: &FleetView, theme: &Theme) {
    let mut spans = vec![Span::styled(" Scrapers ", theme.title_style()), Span::raw("│ ")];
    match view.snapshot {
        Some(s) => {
            spans.push(Span::styled(
                s.global_status.to_string(),
                theme.global_state_style(s.global_status),
            ));
            spans.push(Span::styled(
                format!(
                    "  {} em execução  {} com erro  salvos {}/{}",
                    s.running_units(),
                    s.failed_units(),
                    s.total_saved(),
                    s.total_found()
                ),
                theme.muted_style(),
            ));
        }
        None => spans.push(Span::styled("sem dados", theme.muted_style())),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_units(frame: &mut Frame, area: Rect, snapshot: &FleetStatus, now: DateTime<Utc>, theme: &Theme) {
    let header = Row::new(vec!["banca", "estado", "progresso", "encontrados", "salvos", "última", "mensagem"])
        .style(theme.header_style());

    let rows: Vec<Row> = snapshot
        .units
        .iter()
        .map(|unit| {
            let mut bar = ProgressBar::new(10);
            bar.set_percent(unit.progress_percent);
            let last_run = unit
                .last_run_at
                .map(|at| format_age((now - at).num_seconds()))
                .unwrap_or_else(|| "-".to_string());
            let style = theme.unit_state_style(unit.status);

            Row::new(vec![
                Cell::from(unit.unit_name.clone()),
                Cell::from(format!("{} {}", Icons::unit(unit.status), unit.status)).style(style),
                Cell::from(bar.render()),
                Cell::from(unit.found_count.to_string()),
                Cell::from(unit.saved_count.to_string()),
                Cell::from(last_run),
                Cell::from(unit.message.clone().unwrap_or_default()).style(theme.muted_style()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(18),
        Constraint::Length(11),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style(true)),
    );
    frame.render_widget(table, area);
}

fn render_logs(frame: &mut Frame, area: Rect, snapshot: &FleetStatus, theme: &Theme) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = snapshot.recent_log_lines.len().saturating_sub(visible);
    let lines: Vec<Line> = snapshot.recent_log_lines[start..]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), theme.muted_style())))
        .collect();

    let logs = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style(false))
                .title(Span::styled(" Logs ", theme.header_style())),
        );
    frame.render_widget(logs, area);
}

fn render_footer(frame: &mut Frame, area: Rect, view: &FleetView, theme: &Theme) {
    let mut spans = vec![
        Span::styled(" q", theme.shortcut_key_style()),
        Span::styled(" sair  ", theme.shortcut_desc_style()),
        Span::styled("r", theme.shortcut_key_style()),
        Span::styled(" atualizar  ", theme.shortcut_desc_style()),
        Span::styled("s", theme.shortcut_key_style()),
        Span::styled(" iniciar todos  ", theme.shortcut_desc_style()),
    ];
    if !view.polling {
        spans.push(Span::styled(format!("{} parado ", Icons::WARNING), theme.warning_style()));
    }
    if view.failed_ticks > 0 {
        spans.push(Span::styled(
            format!("│ {} falhas de consulta ", view.failed_ticks),
            theme.muted_style(),
        ));
    }
    if let Some(notice) = view.notice {
        spans.push(Span::styled(format!("│ {}", notice), theme.warning_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
