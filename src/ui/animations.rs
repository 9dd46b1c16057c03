//! Spinner and text progress bar shared by both output modes

use std::time::{Duration, Instant};

/// Animated spinner shown next to the running item
#[derive(Debug, Clone)]
pub struct Spinner {
    frames: &'static [&'static str],
    current_frame: usize,
    last_update: Instant,
    interval: Duration,
}

impl Spinner {
    pub fn dots() -> Self {
        Self {
            frames: &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            current_frame: 0,
            last_update: Instant::now(),
            interval: Duration::from_millis(80),
        }
    }

    /// ASCII frames for terminals without braille glyphs
    pub fn line() -> Self {
        Self {
            frames: &["-", "\\", "|", "/"],
            current_frame: 0,
            last_update: Instant::now(),
            interval: Duration::from_millis(120),
        }
    }

    pub fn tick(&mut self) {
        if self.last_update.elapsed() >= self.interval {
            self.current_frame = (self.current_frame + 1) % self.frames.len();
            self.last_update = Instant::now();
        }
    }

    pub fn frame(&self) -> &'static str {
        self.frames[self.current_frame]
    }
}

/// Text progress bar, used by `--plain` output
#[derive(Debug, Clone)]
pub struct ProgressBar {
    progress: f64,
    width: usize,
    filled_char: char,
    empty_char: char,
}

impl ProgressBar {
    pub fn new(width: usize) -> Self {
        Self {
            progress: 0.0,
            width,
            filled_char: '#',
            empty_char: '.',
        }
    }

    /// Set from a 0..=100 percentage
    pub fn set_percent(&mut self, percent: f64) {
        self.progress = (percent / 100.0).clamp(0.0, 1.0);
    }

    pub fn render(&self) -> String {
        let filled = ((self.progress * self.width as f64).round() as usize).min(self.width);
        let empty = self.width - filled;

        let bar: String = std::iter::repeat_n(self.filled_char, filled)
            .chain(std::iter::repeat_n(self.empty_char, empty))
            .collect();

        format!("[{}] {:3.0}%", bar, self.progress * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles() {
        let mut spinner = Spinner::dots();
        let first = spinner.frame();

        spinner.last_update = Instant::now() - Duration::from_secs(1);
        spinner.tick();

        assert_ne!(spinner.frame(), first);
    }

    #[test]
    fn test_progress_bar() {
        let mut bar = ProgressBar::new(10);
        assert_eq!(bar.render(), "[..........]   0%");

        bar.set_percent(50.0);
        assert_eq!(bar.render(), "[#####.....]  50%");

        bar.set_percent(250.0);
        assert_eq!(bar.render(), "[##########] 100%");
    }
}
