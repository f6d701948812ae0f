use ratatui::style::{Color, Modifier, Style};

pub struct LyricStyles {
    pub before: Style,
    pub current: Style,
    pub after: Style,
    /// Line under the keyboard cursor when it is not the current line.
    pub cursor: Style,
    pub chord: Style,
    pub active_chord: Style,
    pub header: Style,
    pub notice: Style,
}

impl Default for LyricStyles {
    fn default() -> Self {
        Self {
            before: Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
            current: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            after: Style::default(),
            cursor: Style::default().add_modifier(Modifier::UNDERLINED),
            chord: Style::default().fg(Color::Yellow),
            active_chord: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            header: Style::default().add_modifier(Modifier::BOLD),
            notice: Style::default().fg(Color::Cyan),
        }
    }
}
