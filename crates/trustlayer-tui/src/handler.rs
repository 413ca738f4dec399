use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Focus};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_to_bottom(),
        AppEvent::Tick => app.on_tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on any control
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    app.status = None;

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),

        // Chat scrolling works from every control
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Up if app.focus != Focus::TimeSlot => app.scroll_up(1),
        KeyCode::Down if app.focus != Focus::TimeSlot => app.scroll_down(1),

        _ => match app.focus {
            Focus::Input => handle_input_key(app, key),
            Focus::TimeSlot => handle_time_slot_key(app, key),
            Focus::Speak | Focus::CallNow | Focus::Schedule => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    app.activate();
                }
            }
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.insert_char(c),
        _ => {}
    }
}

fn handle_time_slot_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => app.cycle_time(-1),
        KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => app.cycle_time(1),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate(),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::time::Duration;
    use trustlayer_core::{ChatConfig, ChatSession, ManualClock, MemoryStore, Variant};

    fn app(variant: Variant) -> (App, ManualClock) {
        let clock = ManualClock::new();
        let session = ChatSession::new(
            ChatConfig::preset(variant),
            Box::new(MemoryStore::new()),
            Box::new(clock.clone()),
        )
        .unwrap();
        (App::new(session), clock)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn send(app: &mut App, events: impl IntoIterator<Item = AppEvent>) {
        for event in events {
            handle_event(app, event).unwrap();
        }
    }

    fn type_line(app: &mut App, text: &str) {
        send(app, text.chars().map(|c| key(KeyCode::Char(c))));
        send(app, [key(KeyCode::Enter)]);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (mut app, _) = app(Variant::Instant);
        send(
            &mut app,
            [AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))],
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_typing_and_enter_submits() {
        let (mut app, _) = app(Variant::Instant);
        type_line(&mut app, "I think this is a scam");
        let texts: Vec<&str> = app.session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts[0], "I think this is a scam");
        assert_eq!(texts[2], "✅ Agent connected: Anna – Scam Specialist");
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_letters_on_time_slot_do_not_leak_into_input() {
        let (mut app, _) = app(Variant::Instant);
        type_line(&mut app, "fraud");
        // Input -> CallNow -> Schedule -> TimeSlot
        send(&mut app, [key(KeyCode::Tab), key(KeyCode::Tab), key(KeyCode::Tab)]);
        assert_eq!(app.focus, Focus::TimeSlot);

        send(&mut app, [key(KeyCode::Char('l')), key(KeyCode::Right)]);
        assert_eq!(app.session.selected_time(), "In 1 hour");
        assert!(app.input.is_empty());

        send(&mut app, [key(KeyCode::BackTab), key(KeyCode::Enter)]);
        assert_eq!(
            app.session.messages().last().unwrap().text,
            "📅 Callback scheduled at In 1 hour"
        );
    }

    #[test]
    fn test_delayed_replies_land_on_tick() {
        let (mut app, clock) = app(Variant::Delayed);
        type_line(&mut app, "please explain chargeback");
        assert_eq!(app.session.messages().len(), 1);

        clock.advance(Duration::from_millis(2000));
        send(&mut app, [AppEvent::Tick]);
        assert_eq!(app.session.messages().len(), 4);
        assert!(app.session.callback_visible());
    }

    #[test]
    fn test_speak_button_with_space() {
        let (mut app, _) = app(Variant::Instant);
        send(&mut app, [key(KeyCode::BackTab), key(KeyCode::Char(' '))]);
        assert_eq!(app.focus, Focus::Speak);
        assert!(app.session.callback_visible());
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_resize_returns_to_latest_message() {
        let (mut app, _) = app(Variant::Instant);
        app.chat_height = 2;
        type_line(&mut app, "hello");
        app.scroll_up(u16::MAX);
        assert_eq!(app.chat_scroll, 0);

        send(&mut app, [AppEvent::Resize]);
        assert_eq!(app.chat_scroll, app.chat_line_count() - 2);
    }

    #[test]
    fn test_point_in_rect() {
        let r = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, r));
        assert!(!point_in_rect(6, 2, r));
    }
}
