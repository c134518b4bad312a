use ratatui::style::Color;

pub struct Theme {
    pub chat_border: Color,
    pub input_border: Color,
    pub user_header: Color,
    pub assistant_header: Color,
    pub status_fg: Color,
}

pub const THEME: Theme = Theme {
    chat_border: Color::DarkGray,
    input_border: Color::Cyan,
    user_header: Color::Blue,
    assistant_header: Color::Magenta,
    status_fg: Color::DarkGray,
};
