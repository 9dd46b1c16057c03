//! Colors and icons for the dashboard views

use ratatui::style::{Color, Modifier, Style};

use crate::batch::ItemStatus;
use crate::fleet::{GlobalState, UnitState};

/// Color palette for the application
#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,

    // Accent colors
    pub primary: Color,
    pub accent: Color,

    // Semantic colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    pub border: Color,
    pub border_focused: Color,
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(22, 22, 30),
            foreground: Color::Rgb(230, 230, 240),
            muted: Color::Rgb(120, 120, 140),

            primary: Color::Rgb(130, 170, 255),
            accent: Color::Rgb(255, 180, 100),

            success: Color::Rgb(130, 255, 170),
            warning: Color::Rgb(255, 220, 100),
            error: Color::Rgb(255, 130, 130),
            info: Color::Rgb(100, 200, 255),

            border: Color::Rgb(60, 60, 80),
            border_focused: Color::Rgb(130, 170, 255),
        }
    }

    /// High contrast theme for plain 16-color terminals
    pub fn high_contrast() -> Self {
        Self {
            background: Color::Black,
            foreground: Color::White,
            muted: Color::Gray,

            primary: Color::Cyan,
            accent: Color::Yellow,

            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,

            border: Color::White,
            border_focused: Color::Cyan,
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().bg(self.background).fg(self.foreground)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.info)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused { self.border_focused } else { self.border })
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.foreground)
            .add_modifier(Modifier::BOLD)
    }

    pub fn shortcut_key_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn shortcut_desc_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn item_status_style(&self, status: &ItemStatus) -> Style {
        match status {
            ItemStatus::Pending => self.muted_style(),
            ItemStatus::Running => self.info_style().add_modifier(Modifier::BOLD),
            ItemStatus::Success { .. } => self.success_style(),
            ItemStatus::Failure { .. } => self.error_style(),
        }
    }

    pub fn unit_state_style(&self, state: UnitState) -> Style {
        match state {
            UnitState::Idle => self.muted_style(),
            UnitState::Running => self.info_style(),
            UnitState::Completed => self.success_style(),
            UnitState::Error => self.error_style(),
        }
    }

    pub fn global_state_style(&self, state: GlobalState) -> Style {
        match state {
            GlobalState::Idle => self.muted_style(),
            GlobalState::Running => self.warning_style().add_modifier(Modifier::BOLD),
            GlobalState::Completed => self.success_style(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Icon set for the UI
pub struct Icons;

impl Icons {
    pub const PENDING: &'static str = "○";
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const IDLE: &'static str = "●";
    pub const REFRESH: &'static str = "⟳";
    pub const ARROW_RIGHT: &'static str = "→";

    /// Static icon for an item; running items use the spinner frame instead
    pub fn item(status: &ItemStatus) -> &'static str {
        match status {
            ItemStatus::Pending => Self::PENDING,
            ItemStatus::Running => Self::ARROW_RIGHT,
            ItemStatus::Success { .. } => Self::SUCCESS,
            ItemStatus::Failure { .. } => Self::ERROR,
        }
    }

    pub fn unit(state: UnitState) -> &'static str {
        match state {
            UnitState::Idle => Self::IDLE,
            UnitState::Running => Self::REFRESH,
            UnitState::Completed => Self::SUCCESS,
            UnitState::Error => Self::ERROR,
        }
    }
}
