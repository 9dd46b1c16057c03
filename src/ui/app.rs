//! Terminal app loop for the batch and fleet screens

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::batch::SequentialRunner;
use crate::fleet::StatusPoller;
use crate::{log_info, log_warn};

use super::animations::Spinner;
use super::batch_view::{render_batch, BatchView};
use super::fleet_view::{render_fleet, FleetView};
use super::theme::Theme;

/// User intent decoded from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Cancel,
    Refresh,
    StartAll,
    None,
}

pub fn key_action(key: &KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('c') => KeyAction::Cancel,
        KeyCode::Char('r') => KeyAction::Refresh,
        KeyCode::Char('s') => KeyAction::StartAll,
        _ => KeyAction::None,
    }
}

pub struct DashboardApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    theme: Theme,
    spinner: Spinner,
    tick_rate: Duration,
}

impl DashboardApp {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            theme: Theme::dark(),
            spinner: Spinner::dots(),
            tick_rate: Duration::from_millis(80),
        })
    }

    /// Blocks on key input for at most one tick
    fn next_key(&self, last_tick: Instant) -> io::Result<Option<KeyEvent>> {
        let timeout = self.tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// Show a batch run until it finishes and the user leaves.
    ///
    /// `q` during a run cancels it and leaves once the runner has stopped.
    pub async fn run_batch(&mut self, title: &str, runner: &SequentialRunner) -> io::Result<()> {
        let mut last_tick = Instant::now();
        let mut quit_requested = false;
        let mut notice: Option<String> = None;

        loop {
            let progress = runner.progress();

            if quit_requested && progress.is_running {
                runner.cancel();
            }
            if quit_requested && !progress.is_running && progress.started_at.is_some() {
                break;
            }

            let frame_icon = self.spinner.frame();
            let theme = &self.theme;
            let view = BatchView {
                title,
                progress: &progress,
                spinner_frame: frame_icon,
                notice: notice.as_deref(),
            };
            self.terminal.draw(|frame| render_batch(frame, &view, theme))?;

            if let Some(key) = self.next_key(last_tick)? {
                match key_action(&key) {
                    KeyAction::Quit => {
                        quit_requested = true;
                        if progress.is_running {
                            notice = Some("cancelando...".to_string());
                        }
                    }
                    KeyAction::Cancel if progress.is_running => {
                        if runner.cancel() {
                            log_info!("batch '{}' cancelled from the terminal", title);
                            notice = Some("cancelando...".to_string());
                        }
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.spinner.tick();
                last_tick = Instant::now();
            }

            // give the runner task a chance to make progress between frames
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    /// Mirror the fleet until the user leaves
    pub async fn run_fleet(&mut self, poller: &StatusPoller) -> io::Result<()> {
        let mut last_tick = Instant::now();
        let mut notice: Option<String> = None;
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();
        let stats = poller.stats();

        loop {
            while let Ok(msg) = notice_rx.try_recv() {
                notice = Some(msg);
            }

            let snapshot = poller.snapshot();
            let frame_icon = self.spinner.frame();
            let theme = &self.theme;
            let view = FleetView {
                snapshot: snapshot.as_ref(),
                polling: poller.is_polling(),
                failed_ticks: stats.failed_ticks(),
                spinner_frame: frame_icon,
                notice: notice.as_deref(),
                now: Utc::now(),
            };
            self.terminal.draw(|frame| render_fleet(frame, &view, theme))?;

            if let Some(key) = self.next_key(last_tick)? {
                match key_action(&key) {
                    KeyAction::Quit => break,
                    KeyAction::Refresh => {
                        poller.refresh_now();
                        notice = Some("atualizando...".to_string());
                    }
                    KeyAction::StartAll => {
                        notice = Some("disparando scrapers...".to_string());
                        let request = poller.trigger_scrape_all();
                        let tx = notice_tx.clone();
                        tokio::spawn(async move {
                            let msg = match request.await {
                                Ok(Ok(())) => "scrape-all iniciado".to_string(),
                                Ok(Err(e)) => {
                                    log_warn!("scrape-all failed: {}", e);
                                    format!("falha ao iniciar: {}", e)
                                }
                                Err(e) => format!("falha ao iniciar: {}", e),
                            };
                            let _ = tx.send(msg);
                        });
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.spinner.tick();
                last_tick = Instant::now();
            }

            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show)?;
        Ok(())
    }
}

impl Drop for DashboardApp {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
