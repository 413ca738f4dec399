//! One chat session: message list, panel flags and pending replies
//!
//! Front ends call the action methods in response to user input and call
//! [`ChatSession::pump`] on every tick so delayed replies land on time.

use anyhow::Result;

use crate::config::ChatConfig;
use crate::engine::{Effect, ResponseEngine, Step};
use crate::schedule::{Clock, TaskQueue};
use crate::state::ChatMessage;
use crate::store::{load_history, save_history, HistoryStore};

/// Result of a user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// Blank input; nothing changed
    Ignored,
    /// A reply is still pending and the session is locked until it lands
    Busy,
    /// Panel controls used before the callback panel was shown
    PanelHidden,
    /// Requested callback slot is not on offer
    UnknownSlot,
    /// The session has ended
    Closed,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        *self == Outcome::Accepted
    }
}

pub struct ChatSession {
    config: ChatConfig,
    engine: ResponseEngine,
    store: Box<dyn HistoryStore>,
    clock: Box<dyn Clock>,
    messages: Vec<ChatMessage>,
    queue: TaskQueue<Effect>,
    callback_visible: bool,
    selected_time: usize,
    revision: u64,
    ended: bool,
}

impl ChatSession {
    /// Starts a session, restoring whatever history the store holds
    pub fn new(config: ChatConfig, store: Box<dyn HistoryStore>, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let engine = config.build_engine()?;
        let messages = load_history(&*store, &config.history_key);
        log::info!(
            "session started: variant={} restored={} messages",
            config.variant.as_str(),
            messages.len()
        );

        Ok(Self {
            config,
            engine,
            store,
            clock,
            messages,
            queue: TaskQueue::new(),
            callback_visible: false,
            selected_time: 0,
            revision: 0,
            ended: false,
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn callback_visible(&self) -> bool {
        self.callback_visible
    }

    pub fn callback_times(&self) -> &[String] {
        &self.config.callback_times
    }

    pub fn selected_time(&self) -> &str {
        &self.config.callback_times[self.selected_time]
    }

    pub fn selected_time_index(&self) -> usize {
        self.selected_time
    }

    /// True while at least one bot message is waiting to be sent
    pub fn is_typing(&self) -> bool {
        self.queue.pending().any(Effect::is_say)
    }

    /// True while input and panel controls should be disabled
    pub fn is_locked(&self) -> bool {
        self.config.lock_while_typing && self.is_typing()
    }

    pub fn typing_label(&self) -> String {
        self.engine.script().typing()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Bumped on every visible change; front ends use it to auto-scroll
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn submit(&mut self, raw: &str) -> Outcome {
        if let Some(blocked) = self.guard() {
            return blocked;
        }
        let text = raw.trim();
        if text.is_empty() {
            return Outcome::Ignored;
        }

        self.append(ChatMessage::user(text));
        let lowered = text.to_lowercase();
        if self.engine.is_distress(&lowered) {
            log::info!("distress keyword matched");
        }
        let steps = self.engine.respond(&lowered);
        self.run(steps);
        Outcome::Accepted
    }

    pub fn speak_to_human(&mut self) -> Outcome {
        if let Some(blocked) = self.guard() {
            return blocked;
        }
        log::info!("user asked for a human agent");
        let steps = self.engine.speak_to_human();
        self.run(steps);
        Outcome::Accepted
    }

    pub fn call_me_now(&mut self) -> Outcome {
        if let Some(blocked) = self.panel_guard() {
            return blocked;
        }
        let steps = self.engine.call_me_now();
        self.run(steps);
        Outcome::Accepted
    }

    /// Confirms a callback at the slot selected right now
    pub fn schedule_callback(&mut self) -> Outcome {
        if let Some(blocked) = self.panel_guard() {
            return blocked;
        }
        let slot = self.selected_time().to_string();
        log::info!("callback scheduled: {}", slot);
        let steps = self.engine.schedule_callback(&slot);
        self.run(steps);
        Outcome::Accepted
    }

    pub fn select_time(&mut self, slot: &str) -> Outcome {
        match self.config.callback_times.iter().position(|t| t == slot) {
            Some(i) => self.select_time_index(i),
            None => Outcome::UnknownSlot,
        }
    }

    pub fn select_time_index(&mut self, index: usize) -> Outcome {
        if let Some(blocked) = self.panel_guard() {
            return blocked;
        }
        if index >= self.config.callback_times.len() {
            return Outcome::UnknownSlot;
        }
        self.selected_time = index;
        Outcome::Accepted
    }

    /// Moves the slot selection by `delta`, wrapping at both ends
    pub fn cycle_time(&mut self, delta: isize) -> Outcome {
        let len = self.config.callback_times.len() as isize;
        let next = (self.selected_time as isize + delta).rem_euclid(len);
        self.select_time_index(next as usize)
    }

    /// Applies every delayed effect that is due. Returns how many fired.
    pub fn pump(&mut self) -> usize {
        if self.ended {
            return 0;
        }
        let due = self.queue.take_due(self.clock.now());
        let fired = due.len();
        for effect in due {
            self.apply(effect);
        }
        fired
    }

    /// Ends the session; pending replies are dropped and never fire
    pub fn end(&mut self) -> usize {
        if self.ended {
            return 0;
        }
        self.ended = true;
        let cancelled = self.queue.cancel_all();
        log::info!("session ended, {} pending replies cancelled", cancelled);
        cancelled
    }

    fn guard(&self) -> Option<Outcome> {
        if self.ended {
            Some(Outcome::Closed)
        } else if self.is_locked() {
            Some(Outcome::Busy)
        } else {
            None
        }
    }

    fn panel_guard(&self) -> Option<Outcome> {
        self.guard().or_else(|| (!self.callback_visible).then_some(Outcome::PanelHidden))
    }

    fn run(&mut self, steps: Vec<Step>) {
        let now = self.clock.now();
        for step in steps {
            if step.after.is_zero() {
                self.apply(step.effect);
            } else {
                self.queue.schedule(now + step.after, step.effect);
            }
        }
        // Typing indicator appears immediately
        self.revision += 1;
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Say(text) => self.append(ChatMessage::bot(text)),
            Effect::ShowCallbackPanel => {
                if !self.callback_visible {
                    log::debug!("callback panel shown");
                }
                self.callback_visible = true;
                self.revision += 1;
            }
        }
    }

    fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.revision += 1;
        if let Err(e) = save_history(&mut *self.store, &self.config.history_key, &self.messages) {
            log::warn!("failed to save chat history: {:#}", e);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.end();
    }
}
