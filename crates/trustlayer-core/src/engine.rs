//! Scripted reply logic
//!
//! The engine never touches session state. It turns an action into a list of
//! [`Step`]s, each with a delay relative to the action, and the session decides
//! when to apply them.

use std::time::Duration;

use crate::matcher::KeywordMatcher;

/// Something the session does when a step comes due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Say(String),
    ShowCallbackPanel,
}

impl Effect {
    pub fn is_say(&self) -> bool {
        matches!(self, Effect::Say(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Delay measured from the triggering action, not from the previous step
    pub after: Duration,
    pub effect: Effect,
}

impl Step {
    fn say(after: Duration, text: impl Into<String>) -> Self {
        Self {
            after,
            effect: Effect::Say(text.into()),
        }
    }

    fn show_panel(after: Duration) -> Self {
        Self {
            after,
            effect: Effect::ShowCallbackPanel,
        }
    }
}

/// Reply latencies per canned message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySchedule {
    pub reassurance: Duration,
    pub agent_connected: Duration,
    pub distress_panel: Duration,
    pub generic: Duration,
    pub tip: Duration,
    pub call_now: Duration,
    pub scheduled: Duration,
    pub human: Duration,
    pub human_panel: Duration,
}

impl DelaySchedule {
    /// Everything happens immediately
    pub fn none() -> Self {
        Self {
            reassurance: Duration::ZERO,
            agent_connected: Duration::ZERO,
            distress_panel: Duration::ZERO,
            generic: Duration::ZERO,
            tip: Duration::ZERO,
            call_now: Duration::ZERO,
            scheduled: Duration::ZERO,
            human: Duration::ZERO,
            human_panel: Duration::ZERO,
        }
    }

    /// Simulated agent latency with a typing indicator
    pub fn simulated() -> Self {
        Self {
            reassurance: Duration::from_millis(800),
            agent_connected: Duration::from_millis(1800),
            distress_panel: Duration::from_millis(2000),
            generic: Duration::from_millis(1000),
            tip: Duration::from_millis(2000),
            call_now: Duration::from_millis(1000),
            scheduled: Duration::from_millis(1000),
            human: Duration::from_millis(800),
            human_panel: Duration::from_millis(1200),
        }
    }

    pub fn is_instant(&self) -> bool {
        *self == Self::none()
    }
}

/// Canned bot lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub agent_name: String,
    pub agent_specialty: String,
    pub reassurance: String,
    pub generic: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            agent_name: "Anna".to_string(),
            agent_specialty: "Scam Specialist".to_string(),
            reassurance: "Don't worry, you're not alone. A real person is reviewing this now. Estimated wait: 3 minutes."
                .to_string(),
            generic: "Thanks for your message. A support agent will respond soon.".to_string(),
        }
    }
}

impl Script {
    pub fn agent_connected(&self) -> String {
        format!("✅ Agent connected: {} – {}", self.agent_name, self.agent_specialty)
    }

    pub fn call_now(&self) -> String {
        format!("📞 {} will call you shortly...", self.agent_name)
    }

    pub fn scheduled(&self, slot: &str) -> String {
        format!("📅 Callback scheduled at {}", slot)
    }

    pub fn human(&self) -> String {
        format!(
            "You've been connected to a human agent. {} will assist you shortly.",
            self.agent_name
        )
    }

    pub fn typing(&self) -> String {
        format!("{} is typing…", self.agent_name)
    }
}

/// An explanatory message appended whenever its trigger appears
#[derive(Debug, Clone)]
pub struct Tip {
    pub trigger: KeywordMatcher,
    pub text: String,
}

impl Tip {
    pub fn chargeback() -> Self {
        Self {
            trigger: KeywordMatcher::substring(&["chargeback"]),
            text: "🛈 Tip: A chargeback is when a transaction is reversed due to a reported issue with a payment."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseEngine {
    distress: KeywordMatcher,
    tips: Vec<Tip>,
    script: Script,
    delays: DelaySchedule,
}

impl ResponseEngine {
    pub fn new(distress: KeywordMatcher, tips: Vec<Tip>, script: Script, delays: DelaySchedule) -> Self {
        Self {
            distress,
            tips,
            script,
            delays,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn is_distress(&self, lowered: &str) -> bool {
        self.distress.is_match(lowered)
    }

    /// Replies to a submitted message. `lowered` must already be lowercased.
    pub fn respond(&self, lowered: &str) -> Vec<Step> {
        let d = &self.delays;
        let mut steps = if self.is_distress(lowered) {
            vec![
                Step::say(d.reassurance, self.script.reassurance.clone()),
                Step::say(d.agent_connected, self.script.agent_connected()),
                Step::show_panel(d.distress_panel),
            ]
        } else {
            vec![Step::say(d.generic, self.script.generic.clone())]
        };

        steps.extend(
            self.tips
                .iter()
                .filter(|tip| tip.trigger.is_match(lowered))
                .map(|tip| Step::say(d.tip, tip.text.clone())),
        );

        steps
    }

    pub fn speak_to_human(&self) -> Vec<Step> {
        vec![
            Step::say(self.delays.human, self.script.human()),
            Step::show_panel(self.delays.human_panel),
        ]
    }

    pub fn call_me_now(&self) -> Vec<Step> {
        vec![Step::say(self.delays.call_now, self.script.call_now())]
    }

    pub fn schedule_callback(&self, slot: &str) -> Vec<Step> {
        vec![Step::say(self.delays.scheduled, self.script.scheduled(slot))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(delays: DelaySchedule) -> ResponseEngine {
        ResponseEngine::new(
            KeywordMatcher::substring(&["help", "scam", "fraud"]),
            vec![Tip::chargeback()],
            Script::default(),
            delays,
        )
    }

    fn texts(steps: &[Step]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match &s.effect {
                Effect::Say(t) => Some(t.as_str()),
                Effect::ShowCallbackPanel => None,
            })
            .collect()
    }

    #[test]
    fn test_distress_branch() {
        let steps = engine(DelaySchedule::none()).respond("i think this is a scam");
        assert_eq!(
            texts(&steps),
            vec![
                Script::default().reassurance.as_str(),
                "✅ Agent connected: Anna – Scam Specialist",
            ]
        );
        assert_eq!(steps.last().unwrap().effect, Effect::ShowCallbackPanel);
    }

    #[test]
    fn test_generic_branch_has_no_panel() {
        let steps = engine(DelaySchedule::none()).respond("where is my card");
        assert_eq!(texts(&steps), vec!["Thanks for your message. A support agent will respond soon."]);
        assert!(steps.iter().all(|s| s.effect.is_say()));
    }

    #[test]
    fn test_tip_follows_generic_reply() {
        let steps = engine(DelaySchedule::none()).respond("please explain chargeback");
        let t = texts(&steps);
        assert_eq!(t.len(), 2);
        assert!(t[0].contains("respond soon"));
        assert!(t[1].starts_with("🛈 Tip: A chargeback"));
    }

    #[test]
    fn test_tip_follows_distress_reply() {
        let steps = engine(DelaySchedule::none()).respond("fraud and a chargeback");
        let last = steps.last().unwrap();
        assert!(matches!(&last.effect, Effect::Say(t) if t.contains("chargeback is when")));
        assert!(steps.iter().any(|s| s.effect == Effect::ShowCallbackPanel));
    }

    #[test]
    fn test_simulated_delays() {
        let steps = engine(DelaySchedule::simulated()).respond("help chargeback");
        let delays: Vec<u64> = steps.iter().map(|s| s.after.as_millis() as u64).collect();
        assert_eq!(delays, vec![800, 1800, 2000, 2000]);
    }

    #[test]
    fn test_panel_actions() {
        let e = engine(DelaySchedule::simulated());
        assert_eq!(texts(&e.call_me_now()), vec!["📞 Anna will call you shortly..."]);
        assert_eq!(
            texts(&e.schedule_callback("In 10 minutes")),
            vec!["📅 Callback scheduled at In 10 minutes"]
        );
        let human = e.speak_to_human();
        assert_eq!(human[1], Step::show_panel(Duration::from_millis(1200)));
    }

    #[test]
    fn test_instant_schedule() {
        assert!(DelaySchedule::none().is_instant());
        assert!(!DelaySchedule::simulated().is_instant());
    }
}
