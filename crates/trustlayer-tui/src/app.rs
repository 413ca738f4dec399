use ratatui::{layout::Rect, text::Line};
use trustlayer_core::{ChatSession, Outcome};

/// Which control receives Enter and editing keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Speak,
    CallNow,
    Schedule,
    TimeSlot,
}

/// Ticks per typing-animation frame
const TICKS_PER_FRAME: u8 = 3;

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,
    pub focus: Focus,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in chars, not bytes

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat box, set during render
    pub chat_width: u16,  // inner width, for wrap calculations
    pub chat_area: Option<Rect>,
    seen_revision: u64,

    // One-line feedback in the footer (e.g. "Anna is typing")
    pub status: Option<String>,
    status_until_idle: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    tick_count: u8,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        let mut app = Self {
            should_quit: false,
            session,
            focus: Focus::Input,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            seen_revision: 0,

            status: None,
            status_until_idle: false,

            animation_frame: 0,
            tick_count: 0,
        };
        // Restored history opens at the latest message
        app.scroll_to_bottom();
        app
    }

    /// Controls reachable with Tab, in screen order
    pub fn focus_order(&self) -> Vec<Focus> {
        let mut order = vec![Focus::Input];
        if self.session.callback_visible() {
            order.extend([Focus::CallNow, Focus::Schedule, Focus::TimeSlot]);
        }
        order.push(Focus::Speak);
        order
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(-1);
    }

    fn move_focus(&mut self, delta: isize) {
        let order = self.focus_order();
        let len = order.len() as isize;
        let current = order.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        self.focus = order[(current + delta).rem_euclid(len) as usize];
        if self.focus == Focus::Input {
            // Cursor at end of existing text
            self.cursor = self.input.chars().count();
        }
    }

    /// Input and panel controls are disabled while the agent is "typing"
    pub fn is_locked(&self) -> bool {
        self.session.is_locked()
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        if self.is_locked() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_locked() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_locked() {
            return;
        }
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Actions
    pub fn submit_input(&mut self) {
        let outcome = self.session.submit(&self.input);
        if outcome.is_accepted() {
            self.input.clear();
            self.cursor = 0;
        }
        self.report(outcome);
    }

    pub fn activate(&mut self) {
        let outcome = match self.focus {
            Focus::Input => {
                self.submit_input();
                return;
            }
            Focus::Speak => self.session.speak_to_human(),
            Focus::CallNow => self.session.call_me_now(),
            Focus::Schedule => self.session.schedule_callback(),
            Focus::TimeSlot => self.session.cycle_time(1),
        };
        self.report(outcome);
    }

    pub fn cycle_time(&mut self, delta: isize) {
        let outcome = self.session.cycle_time(delta);
        self.report(outcome);
    }

    fn report(&mut self, outcome: Outcome) {
        self.status_until_idle = outcome == Outcome::Busy;
        self.status = match outcome {
            Outcome::Accepted | Outcome::Ignored => None,
            Outcome::Busy => Some(format!("{} Please wait.", self.session.typing_label())),
            Outcome::PanelHidden => Some("Callback options are not available yet.".to_string()),
            Outcome::UnknownSlot => Some("That callback time is not available.".to_string()),
            Outcome::Closed => Some("This conversation has ended.".to_string()),
        };
        self.sync_scroll();
    }

    /// Tick: deliver due replies, animate the typing indicator
    pub fn on_tick(&mut self) {
        self.session.pump();

        if self.session.is_typing() {
            self.tick_count = (self.tick_count + 1) % TICKS_PER_FRAME;
            if self.tick_count == 0 {
                self.animation_frame = (self.animation_frame + 1) % 3;
            }
        } else {
            self.animation_frame = 0;
            self.tick_count = 0;
            if self.status_until_idle {
                self.status = None;
                self.status_until_idle = false;
            }
        }

        // Keep focus on a control that still exists
        if !self.focus_order().contains(&self.focus) {
            self.focus = Focus::Input;
        }

        self.sync_scroll();
    }

    /// Jump to the newest message whenever the conversation changed
    pub fn sync_scroll(&mut self) {
        let revision = self.session.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.scroll_to_bottom();
        }
    }

    /// Rendered height of the conversation, in terminal lines
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        // History is unbounded; count wide and clamp once
        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(2); // Sender line and trailing blank
            for line in msg.text.lines() {
                // Display columns, so wide glyphs like emoji count double
                let width = Line::from(line).width();
                total_lines = total_lines.saturating_add(width / wrap_width + 1);
            }
        }

        if self.session.is_typing() {
            total_lines = total_lines.saturating_add(1);
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    pub fn scroll_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = self.chat_line_count().saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.chat_line_count().saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }
}
