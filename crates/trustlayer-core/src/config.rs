use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::engine::{DelaySchedule, ResponseEngine, Script, Tip};
use crate::matcher::{KeywordMatcher, MatchMode};
use crate::store::{StoreKind, HISTORY_KEY};

/// The two shipped flavours of the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Replies arrive after simulated latency, with a typing indicator
    #[default]
    Delayed,
    /// Replies appear as soon as the user acts
    Instant,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Delayed => "delayed",
            Variant::Instant => "instant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "delayed" => Some(Variant::Delayed),
            "instant" => Some(Variant::Instant),
            _ => None,
        }
    }

    pub fn all() -> Vec<Variant> {
        vec![Variant::Delayed, Variant::Instant]
    }

    pub fn keywords(&self) -> Vec<String> {
        let words: &[&str] = match self {
            Variant::Delayed => &["help", "scam", "chargeback", "fraud", "dispute"],
            Variant::Instant => &["help", "scam", "fraud", "stolen", "hacked"],
        };
        words.iter().map(|w| w.to_string()).collect()
    }

    pub fn callback_times(&self) -> Vec<String> {
        let slots: &[&str] = match self {
            Variant::Delayed => &["ASAP", "In 10 minutes", "In 30 minutes", "At a specific time"],
            Variant::Instant => &["Now", "In 15 minutes", "In 1 hour", "Tomorrow morning"],
        };
        slots.iter().map(|s| s.to_string()).collect()
    }

    pub fn delays(&self) -> DelaySchedule {
        match self {
            Variant::Delayed => DelaySchedule::simulated(),
            Variant::Instant => DelaySchedule::none(),
        }
    }
}

/// Fully resolved settings for one chat session
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub variant: Variant,
    pub title: String,
    pub keywords: Vec<String>,
    pub callback_times: Vec<String>,
    pub match_mode: MatchMode,
    pub delays: DelaySchedule,
    pub script: Script,
    /// Reject input and panel actions while a reply is pending
    pub lock_while_typing: bool,
    pub history_key: String,
}

impl ChatConfig {
    pub fn preset(variant: Variant) -> Self {
        Self {
            variant,
            title: "Revolut Support – Human Trust Layer".to_string(),
            keywords: variant.keywords(),
            callback_times: variant.callback_times(),
            match_mode: MatchMode::Substring,
            delays: variant.delays(),
            script: Script::default(),
            lock_while_typing: variant == Variant::Delayed,
            history_key: HISTORY_KEY.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.callback_times.is_empty() {
            return Err(anyhow!("callback_times must list at least one slot"));
        }
        if self.callback_times.iter().any(|t| t.trim().is_empty()) {
            return Err(anyhow!("callback_times must not contain blank slots"));
        }
        if self.history_key.trim().is_empty() {
            return Err(anyhow!("history key must not be blank"));
        }
        Ok(())
    }

    pub fn build_engine(&self) -> Result<ResponseEngine> {
        let distress = KeywordMatcher::new(self.keywords.as_slice(), self.match_mode)?;
        let chargeback = Tip {
            trigger: KeywordMatcher::new(&["chargeback"], self.match_mode)?,
            ..Tip::chargeback()
        };
        Ok(ResponseEngine::new(distress, vec![chargeback], self.script.clone(), self.delays))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::preset(Variant::default())
    }
}

/// On-disk overrides, all optional
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ConfigFile {
    pub variant: Option<String>,
    pub title: Option<String>,
    pub agent_name: Option<String>,
    pub agent_specialty: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub callback_times: Option<Vec<String>>,
    pub match_mode: Option<String>,
    pub store: Option<String>,
    pub lock_while_typing: Option<bool>,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: ConfigFile = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("trustlayer").join("config.json"))
    }

    pub fn store_kind(&self) -> Result<Option<StoreKind>> {
        self.store
            .as_deref()
            .map(|s| StoreKind::from_str(s).ok_or_else(|| anyhow!("unknown store {:?}", s)))
            .transpose()
    }

    /// Applies the overrides on top of the variant preset. `variant` wins
    /// over the file's own `variant` when given.
    pub fn resolve(&self, variant: Option<Variant>) -> Result<ChatConfig> {
        let variant = match variant {
            Some(v) => v,
            None => match self.variant.as_deref() {
                Some(s) => Variant::from_str(s).ok_or_else(|| anyhow!("unknown variant {:?}", s))?,
                None => Variant::default(),
            },
        };

        let mut config = ChatConfig::preset(variant);
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(name) = &self.agent_name {
            config.script.agent_name = name.clone();
        }
        if let Some(specialty) = &self.agent_specialty {
            config.script.agent_specialty = specialty.clone();
        }
        if let Some(keywords) = &self.keywords {
            config.keywords = keywords.clone();
        }
        if let Some(times) = &self.callback_times {
            config.callback_times = times.clone();
        }
        if let Some(mode) = self.match_mode.as_deref() {
            config.match_mode =
                MatchMode::from_str(mode).ok_or_else(|| anyhow!("unknown match mode {:?}", mode))?;
        }
        if let Some(lock) = self.lock_while_typing {
            config.lock_while_typing = lock;
        }

        config.validate()?;
        Ok(config)
    }
}
