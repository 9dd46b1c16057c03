//! Full-screen rendering of a batch run

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::batch::{format_metrics, ItemStatus, RunProgress};

use super::theme::{Icons, Theme};

/// Everything the batch screen needs for one frame
pub struct BatchView<'a> {
    pub title: &'a str,
    pub progress: &'a RunProgress,
    pub spinner_frame: &'a str,
    pub notice: Option<&'a str>,
}

/// Short human status of the run
pub fn status_line(progress: &RunProgress) -> String {
    if progress.is_running {
        match progress.current_index {
            Some(index) => format!("processando {}/{}", index + 1, progress.total()),
            None => "iniciando".to_string(),
        }
    } else if progress.finished_at.is_some() {
        if progress.cancelled {
            "cancelado".to_string()
        } else {
            "concluído".to_string()
        }
    } else {
        "aguardando".to_string()
    }
}

pub fn render_batch(frame: &mut Frame, view: &BatchView, theme: &Theme) {
    let area = frame.area();
    frame.render_widget(Block::default().style(theme.base_style()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], view, theme);
    render_gauge(frame, chunks[1], view.progress, theme);
    render_counts(frame, chunks[2], view.progress, theme);
    render_items(frame, chunks[3], view, theme);
    render_footer(frame, chunks[4], view, theme);
}

fn render_header(frame: &mut Frame, area: Rect, view: &BatchView, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(format!(" {} ", view.title), theme.title_style()),
        Span::raw("│ "),
        Span::styled(status_line(view.progress), theme.header_style()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_gauge(frame: &mut Frame, area: Rect, progress: &RunProgress, theme: &Theme) {
    let percent = progress.percent_complete();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style(progress.is_running)),
        )
        .gauge_style(theme.info_style())
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.0}%", percent));
    frame.render_widget(gauge, area);
}

fn render_counts(frame: &mut Frame, area: Rect, progress: &RunProgress, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(format!(" {} {} ", Icons::SUCCESS, progress.succeeded_count()), theme.success_style()),
        Span::styled(format!(" {} {} ", Icons::ERROR, progress.failed_count()), theme.error_style()),
        Span::styled(format!(" {} {} ", Icons::PENDING, progress.pending_count()), theme.muted_style()),
        Span::styled(format!(" total {}", progress.total()), theme.muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_items(frame: &mut Frame, area: Rect, view: &BatchView, theme: &Theme) {
    let items: Vec<ListItem> = view
        .progress
        .items
        .iter()
        .map(|entry| {
            let icon = match entry.status {
                ItemStatus::Running => view.spinner_frame,
                _ => Icons::item(&entry.status),
            };
            let style = theme.item_status_style(&entry.status);
            let mut spans = vec![
                Span::styled(format!("{} ", icon), style),
                Span::styled(entry.item.label.clone(), style),
            ];
            match &entry.status {
                ItemStatus::Success { metrics } if !metrics.is_empty() => {
                    spans.push(Span::styled(
                        format!("  {}", format_metrics(metrics)),
                        theme.muted_style(),
                    ));
                }
                ItemStatus::Failure { reason } => {
                    spans.push(Span::styled(format!("  {}", reason), theme.error_style()));
                }
                _ => {}
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style(false))
                .title(Span::styled(" Itens ", theme.header_style())),
        )
        .highlight_style(theme.header_style().add_modifier(Modifier::REVERSED));

    // keep the running item in view
    let mut state = ListState::default().with_selected(view.progress.current_index);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, view: &BatchView, theme: &Theme) {
    let mut spans = vec![
        Span::styled(" q", theme.shortcut_key_style()),
        Span::styled(" sair  ", theme.shortcut_desc_style()),
    ];
    if view.progress.is_running {
        spans.push(Span::styled("c", theme.shortcut_key_style()));
        spans.push(Span::styled(" cancelar  ", theme.shortcut_desc_style()));
    }
    if let Some(notice) = view.notice {
        spans.push(Span::styled(format!("│ {}", notice), theme.warning_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ProgressEntry, WorkItem};
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn buffer_text(buffer: &Buffer) -> String {
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn progress() -> RunProgress {
        let mut metrics = crate::batch::Metrics::new();
        metrics.insert("materias".into(), 4);
        RunProgress {
            items: vec![
                ProgressEntry {
                    item: WorkItem::new("1", "Concurso TRT", "u1"),
                    status: ItemStatus::Success { metrics },
                },
                ProgressEntry {
                    item: WorkItem::new("2", "Concurso INSS", "u2"),
                    status: ItemStatus::Failure {
                        reason: "edital inválido".into(),
                    },
                },
                ProgressEntry {
                    item: WorkItem::new("3", "Concurso PF", "u3"),
                    status: ItemStatus::Running,
                },
            ],
            current_index: Some(2),
            is_running: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_line() {
        let mut p = progress();
        assert_eq!(status_line(&p), "processando 3/3");
        p.is_running = false;
        assert_eq!(status_line(&p), "aguardando");
        p.finished_at = Some(chrono::Utc::now());
        p.cancelled = true;
        assert_eq!(status_line(&p), "cancelado");
    }

    #[test]
    fn test_render_shows_items_and_reasons() {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        let p = progress();
        let view = BatchView {
            title: "Hierarquia",
            progress: &p,
            spinner_frame: "*",
            notice: None,
        };
        terminal
            .draw(|f| render_batch(f, &view, &Theme::dark()))
            .unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Hierarquia"));
        assert!(text.contains("Concurso TRT"));
        assert!(text.contains("materias=4"));
        assert!(text.contains("edital inválido"));
        assert!(text.contains("cancelar"));
    }
}
