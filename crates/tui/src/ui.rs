use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};
use textwrap::wrap;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use paper_core::chat::Role;

use crate::app::App;
use crate::strings::{
    build_status_line, build_stick_label, INPUT_HINT, PREFIX_ASSISTANT, PREFIX_USER, TITLE_CHAT,
    TITLE_INPUT,
};
use crate::theme::THEME;

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();
    let inner_width = area.width.saturating_sub(2);
    let input_total = measure_total_lines(&app.input, inner_width).max(1) as u16;
    let target_lines = input_total.min(app.input_max_lines);
    let current = app.input_visible_lines.max(1);
    let new_visible = if current < target_lines {
        current + 1
    } else if current > target_lines {
        current - 1
    } else {
        current
    };
    app.input_visible_lines = new_visible;
    let input_height = app.input_visible_lines + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    app.chat_area = Some(chunks[0]);
    draw_chat(f, chunks[0], app);
    draw_status(f, chunks[1], app);
    draw_input(f, chunks[2], app, inner_width);
}

fn draw_chat(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(TITLE_CHAT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.chat_border));

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    app.ensure_chat_wrapped(inner_width);

    let (viewport, start_offset) = app.compute_chat_layout(inner_height);

    let mut y_offset = start_offset;
    let mut vis_lines: Vec<Line> = Vec::new();
    let mut remaining = viewport;

    'outer: for cached in app.chat_cache.iter() {
        let total = cached.lines.len();
        if y_offset >= total {
            y_offset -= total;
            continue;
        }
        let prefix = match cached.role {
            Role::User => PREFIX_USER,
            Role::Assistant => PREFIX_ASSISTANT,
        };
        let header_style = match cached.role {
            Role::User => Style::default()
                .fg(THEME.user_header)
                .add_modifier(Modifier::BOLD),
            Role::Assistant => Style::default()
                .fg(THEME.assistant_header)
                .add_modifier(Modifier::BOLD),
        };
        for (i, line) in cached.lines.iter().enumerate().skip(y_offset) {
            if remaining == 0 {
                break 'outer;
            }
            // The first wrapped line carries the ASCII role prefix.
            let hb = if i == 0 {
                UnicodeWidthStr::width(prefix).min(line.len())
            } else {
                0
            };
            let mut spans: Vec<Span> = Vec::new();
            if hb > 0 {
                spans.push(Span::styled(line[..hb].to_string(), header_style));
            }
            spans.push(Span::raw(line[hb..].to_string()));
            vis_lines.push(Line::from(spans));
            remaining -= 1;
        }
        y_offset = 0;
    }

    let para = Paragraph::new(vis_lines).block(block);
    f.render_widget(para, area);

    let inner = Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if app.chat_total_lines > inner.height as usize {
        let mut sb_state = ScrollbarState::new(app.chat_total_lines).position(start_offset);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner, &mut sb_state);
    }
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let stick = build_stick_label(app.chat_scroll);
    let selected = app
        .selected_pdf
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());
    let upload = app.upload_status.as_ref().map(|u| u.label());
    let tips = build_status_line(
        &app.backend_label,
        &stick,
        app.streaming(),
        selected.as_deref(),
        upload,
        app.notice.as_deref(),
        app.history.len(),
        area.width,
    );
    let line = Line::from(Span::styled(tips, Style::default().fg(THEME.status_fg)));
    f.render_widget(Paragraph::new(line), area);
}

fn draw_input(f: &mut Frame, area: Rect, app: &App, inner_width: u16) {
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.input_border));
    let graphemes: Vec<&str> = app.input.graphemes(true).collect();
    let upto = app.input_cursor.min(graphemes.len());
    let prefix: String = graphemes[..upto].concat();
    let (cursor_line_idx, cursor_col) = cursor_line_col(&prefix, inner_width);
    let offset_y = cursor_line_idx.saturating_sub(app.input_visible_lines.saturating_sub(1));

    let para = if app.input.is_empty() {
        let hint = Line::from(Span::styled(
            INPUT_HINT,
            Style::default().fg(THEME.status_fg),
        ));
        Paragraph::new(hint)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((0, 0))
    } else {
        Paragraph::new(app.input.clone())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset_y, 0))
    };
    f.render_widget(para, area);

    let x0 = area.x + 1;
    let y0 = area.y + 1;
    f.set_cursor_position(Position::new(
        x0 + cursor_col,
        y0 + cursor_line_idx.saturating_sub(offset_y),
    ));
}

fn wrapped_lines(text: &str, width: u16) -> Vec<String> {
    let w = width.max(1) as usize;
    let mut lines = Vec::new();
    for seg in text.split('\n') {
        if seg.is_empty() {
            lines.push(String::new());
            continue;
        }
        for l in wrap(seg, w) {
            lines.push(l.into_owned());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn measure_total_lines(text: &str, width: u16) -> usize {
    wrapped_lines(text, width).len()
}

fn cursor_line_col(prefix: &str, width: u16) -> (u16, u16) {
    let lines = wrapped_lines(prefix, width);
    let last = lines.last().map(String::as_str).unwrap_or("");
    (
        (lines.len() - 1) as u16,
        UnicodeWidthStr::width(last) as u16,
    )
}
