use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use trustlayer_core::Sender;
use crate::app::{App, Focus};

// Bubble colours from the web widget (#dcf8c6 user, #f1f0f0 bot)
const USER_COLOR: Color = Color::Rgb(0xb2, 0xdb, 0xa1);
const BOT_COLOR: Color = Color::Rgb(0xd1, 0xd1, 0xd1);
const SPEAK_COLOR: Color = Color::Rgb(0x00, 0x7b, 0xff);

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let panel_height = if app.session.callback_visible() { 5 } else { 0 };

    let [header_area, chat_area, input_area, panel_area, speak_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(panel_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    if panel_height > 0 {
        render_callback_panel(app, frame, panel_area);
    }
    render_speak_button(app, frame, speak_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.session.config().title), Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area for mouse hit-testing and its inner size for scroll calculations
    app.chat_area = Some(area);
    let resized = app.chat_height != area.height.saturating_sub(2) || app.chat_width != area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if resized {
        app.scroll_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let agent = app.session.config().script.agent_name.clone();
    let text = if app.session.messages().is_empty() && !app.session.is_typing() {
        Text::from(Span::styled(
            "How can we help you today?",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.messages() {
            let (label, color, alignment) = match msg.sender {
                Sender::User => ("You", USER_COLOR, Alignment::Right),
                Sender::Bot => (agent.as_str(), BOT_COLOR, Alignment::Left),
            };
            lines.push(
                Line::from(Span::styled(
                    label.to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .alignment(alignment),
            );
            for line in msg.text.lines() {
                lines.push(Line::from(line.to_string()).style(Style::default().fg(color)).alignment(alignment));
            }
            lines.push(Line::default());
        }

        if app.session.is_typing() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            let label = app.session.typing_label();
            let label = label.trim_end_matches('…');
            lines.push(Line::from(Span::styled(
                format!("{}{}", label, dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    let total = app.chat_line_count();
    if total > app.chat_height {
        let mut state = ScrollbarState::new(total.saturating_sub(app.chat_height) as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input;
    let locked = app.is_locked();
    let border_color = if locked {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::Gray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled("Type your message…", Style::default().fg(Color::DarkGray)))
    } else {
        let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();
        let style = if locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(USER_COLOR)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(block), area);

    if focused && !locked {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn button_style(app: &App, focus: Focus) -> Style {
    if app.is_locked() {
        Style::default().fg(Color::DarkGray)
    } else if app.focus == focus {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn render_callback_panel(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(" Would you prefer a call? ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [call_area, schedule_area, slot_area] = Layout::horizontal([
        Constraint::Percentage(30),
        Constraint::Percentage(35),
        Constraint::Percentage(35),
    ])
    .areas(inner);

    let call = Paragraph::new("📞 Call Me Now")
        .alignment(Alignment::Center)
        .style(button_style(app, Focus::CallNow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(call, call_area);

    let schedule = Paragraph::new("📅 Schedule a Callback")
        .alignment(Alignment::Center)
        .style(button_style(app, Focus::Schedule))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(schedule, schedule_area);

    let slots = app.session.callback_times();
    let slot = Paragraph::new(format!("◀ {} ▶", app.session.selected_time()))
        .alignment(Alignment::Center)
        .style(button_style(app, Focus::TimeSlot))
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {}/{} ",
            app.session.selected_time_index() + 1,
            slots.len()
        )));
    frame.render_widget(slot, slot_area);
}

fn render_speak_button(app: &App, frame: &mut Frame, area: Rect) {
    let style = if app.is_locked() {
        Style::default().fg(Color::DarkGray)
    } else if app.focus == Focus::Speak {
        Style::default().bg(SPEAK_COLOR).fg(Color::White).add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().bg(SPEAK_COLOR).fg(Color::White).add_modifier(Modifier::BOLD)
    };

    let button = Paragraph::new("💬 Speak to a Human")
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let content = match &app.status {
        Some(status) => Line::from(Span::styled(format!(" {} ", status), Style::default().fg(Color::Yellow))),
        None => {
            let hints = match app.focus {
                Focus::Input => "Enter send · Tab next · PgUp/PgDn scroll · Esc quit",
                Focus::TimeSlot => "←/→ change time · Tab next · Esc quit",
                Focus::Speak | Focus::CallNow | Focus::Schedule => "Enter/Space press · Tab next · Esc quit",
            };
            Line::from(Span::styled(format!(" {} ", hints), Style::default().fg(Color::Gray)))
        }
    };

    let footer = Paragraph::new(content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use trustlayer_core::{ChatConfig, ChatSession, ManualClock, MemoryStore, Variant};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app(variant: Variant) -> App {
        let session = ChatSession::new(
            ChatConfig::preset(variant),
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new()),
        )
        .unwrap();
        App::new(session)
    }

    #[test]
    fn test_empty_chat_renders_placeholder() {
        let mut app = app(Variant::Delayed);
        let screen = draw(&mut app);
        assert!(screen.contains("How can we help you today?"));
        assert!(screen.contains("Speak to a Human"));
        assert!(!screen.contains("Would you prefer a call?"));
        assert_eq!(app.chat_width, 78);
    }

    #[test]
    fn test_panel_and_typing_indicator() {
        let mut app = app(Variant::Delayed);
        app.session.submit("hello");
        let screen = draw(&mut app);
        assert!(screen.contains("Anna is typing."));

        let mut app = self::app(Variant::Instant);
        app.session.speak_to_human();
        let screen = draw(&mut app);
        assert!(screen.contains("Would you prefer a call?"));
        assert!(screen.contains("Now"));
    }
}
