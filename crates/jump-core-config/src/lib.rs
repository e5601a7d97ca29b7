#![warn(missing_docs)]
//! `jump-core-config` - the settings record consumed by `jump-core`.
//!
//! The engine never reads or writes configuration files itself. Hosts load TOML text however
//! they like (plugin config dir, embedded defaults, ...) and hand the parsed [`Settings`] to
//! the dispatcher, which only ever reads it.
//!
//! ```toml
//! [tags]
//! uppercase = false
//! include_single_char = true
//! center = false
//! hide_matched_text = false
//!
//! [search]
//! policy = "prefix"        # exact | prefix | contains
//! case_sensitive = false
//! smart_case = true
//! wait_for_enter = false
//! wrap_around = true
//!
//! [replace]
//! action = "replace"       # replace | insert_start | insert_end
//!
//! [jump]
//! after = "nothing"        # nothing | select_text | select_to_anchor | select_line
//! ```
//!
//! Missing sections and keys fall back to their defaults; unknown keys are ignored so older
//! engines can read newer files.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// How a typed query is compared against a candidate's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The whole candidate must equal the query (whole-word match).
    Exact,
    /// The candidate must start with the query.
    #[default]
    Prefix,
    /// The query may appear anywhere inside the candidate.
    Contains,
}

/// Where typed replacement text goes relative to each target span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceAction {
    /// Overwrite the span: its text is removed on the first edit.
    #[default]
    Replace,
    /// Insert before the span, keeping its text.
    InsertStart,
    /// Insert after the span, keeping its text.
    InsertEnd,
}

/// What happens to the caret/selection after a jump resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterJump {
    /// Only move the caret to the start of the target.
    #[default]
    Nothing,
    /// Select the target span.
    SelectText,
    /// Select from the caret position before the jump to the target.
    SelectToAnchor,
    /// Select the whole line containing the target.
    SelectLine,
}

/// Tag (shortcut label) rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TagSettings {
    /// Render tags in upper case instead of lower case.
    pub uppercase: bool,
    /// Use single letter tags (`a..z`) before two letter ones.
    pub include_single_char: bool,
    /// Center the tag inside words of three or more characters.
    pub center: bool,
    /// Blank out candidates that do not carry a visible tag.
    pub hide_matched_text: bool,
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            uppercase: false,
            include_single_char: true,
            center: false,
            hide_matched_text: false,
        }
    }
}

/// Incremental search / filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Comparison policy between query and candidate.
    pub policy: MatchPolicy,
    /// Compare case sensitively.
    pub case_sensitive: bool,
    /// Lower-case query characters also match upper-case text (only when case sensitive).
    pub smart_case: bool,
    /// Never auto-resolve a single remaining match; wait for Enter.
    pub wait_for_enter: bool,
    /// Left/Right navigation wraps around at either end.
    pub wrap_around: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::Prefix,
            case_sensitive: false,
            smart_case: true,
            wait_for_enter: false,
            wrap_around: true,
        }
    }
}

/// Replace session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ReplaceSettings {
    /// Where typed text lands relative to each target.
    pub action: ReplaceAction,
}

/// Jump resolution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct JumpSettings {
    /// Caret/selection policy after a jump.
    pub after: AfterJump,
}

/// The complete, read-only settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `[tags]` section.
    pub tags: TagSettings,
    /// `[search]` section.
    pub search: SearchSettings,
    /// `[replace]` section.
    pub replace: ReplaceSettings,
    /// `[jump]` section.
    pub jump: JumpSettings,
}

/// Settings parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text could not be parsed into [`Settings`].
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        debug!(
            target: "config",
            policy = ?settings.search.policy,
            case_sensitive = settings.search.case_sensitive,
            smart_case = settings.search.smart_case,
            replace_action = ?settings.replace.action,
            "settings_parsed"
        );
        Ok(settings)
    }

    /// Parse settings, falling back to defaults when the text is invalid.
    ///
    /// A warning carrying the parse error is logged on fallback.
    pub fn from_toml_str_or_default(text: &str) -> Self {
        match Self::from_toml_str(text) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(target: "config", error = %err, "settings_fallback_to_defaults");
                Self::default()
            }
        }
    }
}
