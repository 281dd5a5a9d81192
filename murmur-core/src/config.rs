//! Controller configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE_TAG: &str = "en-US";
pub const DEFAULT_HOST_LABEL: &str = "system";

/// Fixed at construction; `start_with` can swap it for a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ControllerConfig {
    /// BCP-47 locale handed to the engine verbatim.
    pub language_tag: String,
    /// Keep finalized text across consecutive `start()` calls.
    pub append_mode: bool,
    /// Where the user grants microphone access, used in the permission
    /// message ("... in your {host_label} settings.").
    pub host_label: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            language_tag: DEFAULT_LANGUAGE_TAG.into(),
            append_mode: false,
            host_label: DEFAULT_HOST_LABEL.into(),
        }
    }
}

impl ControllerConfig {
    pub fn new(language_tag: impl Into<String>, append_mode: bool) -> Self {
        Self {
            language_tag: language_tag.into(),
            append_mode,
            ..Self::default()
        }
    }

    pub fn with_host_label(mut self, host_label: impl Into<String>) -> Self {
        self.host_label = host_label.into();
        self
    }

    /// Trim fields and substitute defaults for blanks. The language tag is
    /// otherwise left as given.
    pub fn normalize(&mut self) {
        self.language_tag = normalize_or(&self.language_tag, DEFAULT_LANGUAGE_TAG);
        self.host_label = normalize_or(&self.host_label, DEFAULT_HOST_LABEL);
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

fn normalize_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.into()
    } else {
        trimmed.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_fall_back_to_defaults() {
        let cfg = ControllerConfig {
            language_tag: "   ".into(),
            append_mode: true,
            host_label: String::new(),
        }
        .normalized();
        assert_eq!(cfg.language_tag, "en-US");
        assert_eq!(cfg.host_label, "system");
        assert!(cfg.append_mode);
    }

    #[test]
    fn language_tag_is_not_rewritten() {
        let cfg = ControllerConfig::new(" pt-br ", false).normalized();
        assert_eq!(cfg.language_tag, "pt-br");
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let cfg: ControllerConfig =
            serde_json::from_str(r#"{"appendMode": true}"#).expect("parse config");
        assert_eq!(cfg.language_tag, "en-US");
        assert!(cfg.append_mode);
        assert_eq!(cfg.host_label, "system");
    }
}
