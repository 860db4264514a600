//! Localized diagnostic messages.
//!
//! The table is parsed once at startup and shared read-only. The en-US
//! table is embedded; an override document only needs the keys it changes.

use std::collections::BTreeMap;
use std::fmt::Display;

use thiserror::Error;

const EN_US: &str = include_str!("../locales/en-US.toml");

/// Errors loading a message table.
#[derive(Debug, Error)]
pub enum MessagesError {
    #[error("failed to parse message table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown message key '{0}'")]
    UnknownKey(String),
}

/// Identifies a diagnostic in the message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageKey {
    Connecting,
    ReadingOption,
    OptionValue,
    DuplicateOption,
    NotActiveNode,
    InDesiredState,
    NotInDesiredState,
    UpdatingOption,
    OptionUpdated,
    NoRestartNeeded,
    RestartingService,
    RestartCompleted,
    RestartRequired,
}

impl MessageKey {
    pub const ALL: [MessageKey; 13] = [
        Self::Connecting,
        Self::ReadingOption,
        Self::OptionValue,
        Self::DuplicateOption,
        Self::NotActiveNode,
        Self::InDesiredState,
        Self::NotInDesiredState,
        Self::UpdatingOption,
        Self::OptionUpdated,
        Self::NoRestartNeeded,
        Self::RestartingService,
        Self::RestartCompleted,
        Self::RestartRequired,
    ];

    /// Key as written in a message table document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::ReadingOption => "reading_option",
            Self::OptionValue => "option_value",
            Self::DuplicateOption => "duplicate_option",
            Self::NotActiveNode => "not_active_node",
            Self::InDesiredState => "in_desired_state",
            Self::NotInDesiredState => "not_in_desired_state",
            Self::UpdatingOption => "updating_option",
            Self::OptionUpdated => "option_updated",
            Self::NoRestartNeeded => "no_restart_needed",
            Self::RestartingService => "restarting_service",
            Self::RestartCompleted => "restart_completed",
            Self::RestartRequired => "restart_required",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Immutable lookup table of message templates.
#[derive(Debug, Clone)]
pub struct Messages {
    templates: BTreeMap<MessageKey, String>,
}

impl Messages {
    /// The embedded en-US table.
    pub fn en_us() -> Self {
        Self::parse(EN_US).expect("embedded en-US message table is valid")
    }

    /// Load an override table, falling back to en-US for missing keys.
    pub fn from_toml_str(document: &str) -> Result<Self, MessagesError> {
        let mut messages = Self::en_us();
        let overrides = Self::parse(document)?;
        messages.templates.extend(overrides.templates);
        Ok(messages)
    }

    fn parse(document: &str) -> Result<Self, MessagesError> {
        let raw: BTreeMap<String, String> = toml::from_str(document)?;
        let mut templates = BTreeMap::new();
        for (name, template) in raw {
            let key = MessageKey::from_name(&name).ok_or(MessagesError::UnknownKey(name))?;
            templates.insert(key, template);
        }
        Ok(Self { templates })
    }

    /// Raw template for a key. Falls back to the key name.
    pub fn template(&self, key: MessageKey) -> &str {
        self.templates
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.as_str())
    }

    /// Render a template, substituting `{name}` placeholders.
    pub fn format(&self, key: MessageKey, args: &[(&str, &dyn Display)]) -> String {
        let mut out = self.template(key).to_string();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), &value.to_string());
        }
        out
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::en_us()
    }
}
