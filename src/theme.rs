use ratatui::style::{Color, Modifier, Style};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    #[allow(dead_code)]
    Light,
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    #[allow(dead_code)]
    pub mode: ThemeMode,
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub frame: Color,
    pub selected: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub muted: Color,
}

impl Theme {
    pub fn harbor_dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            bg: Color::Rgb(18, 22, 28),
            fg: Color::Rgb(215, 220, 228),
            accent: Color::Rgb(80, 160, 245),
            frame: Color::Rgb(80, 88, 100),
            selected: Color::Rgb(250, 170, 40),
            success: Color::Rgb(90, 190, 120),
            error: Color::Rgb(230, 85, 85),
            warning: Color::Rgb(235, 190, 80),
            muted: Color::DarkGray,
        }
    }

    #[allow(dead_code)]
    pub fn harbor_light() -> Self {
        Self {
            mode: ThemeMode::Light,
            bg: Color::Rgb(246, 247, 249),
            fg: Color::Rgb(24, 28, 34),
            accent: Color::Rgb(30, 110, 210),
            frame: Color::Rgb(190, 196, 205),
            selected: Color::Rgb(200, 120, 10),
            success: Color::Rgb(20, 140, 70),
            error: Color::Rgb(190, 40, 40),
            warning: Color::Rgb(170, 130, 20),
            muted: Color::Rgb(120, 126, 134),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::harbor_dark()
    }
}

impl Theme {
    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.selected)
    }

    pub fn border_unfocused(&self) -> Style {
        Style::default().fg(self.frame)
    }

    pub fn text_active_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_editing_bold(&self) -> Style {
        Style::default()
            .fg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn text_success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn text_warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn list_cursor_style(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn toast_color(&self, level: crate::ui::ToastLevel) -> Color {
        match level {
            crate::ui::ToastLevel::Success => self.success,
            crate::ui::ToastLevel::Error => self.error,
            crate::ui::ToastLevel::Info => self.accent,
        }
    }
}
