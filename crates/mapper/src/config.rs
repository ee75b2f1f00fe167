//! Mapper configuration: the host's string-keyed settings and the typed views
//! parsed from them.
//!
//! The host hands every mapper a flat `key -> string` map. It is parsed once
//! per invocation into [`RuleConfig`] (the six rule options) and
//! [`ClaimMapping`] (where and how a value lands in the token). Parsing never
//! panics; a malformed rule surfaces as [`ConfigError`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use groupclaim_core::{DomainError, ValueObject};

use crate::claims::{ClaimPath, TokenKind};
use crate::group::GroupPath;

/// Well-known configuration keys.
pub mod keys {
    /// User attribute or claim key the rule reads.
    pub const USER_ATTRIBUTE: &str = "user.attribute";
    /// Short alias for [`USER_ATTRIBUTE`] accepted from older configurations.
    pub const ATTRIBUTE: &str = "attribute";
    pub const OTHER_CLAIM: &str = "other";
    pub const MODIFICATION: &str = "modification";
    pub const GROUP: &str = "group";
    pub const MEMBERSHIP: &str = "membership";
    pub const LOCATION: &str = "location";

    pub const CLAIM_NAME: &str = "claim.name";
    pub const JSON_TYPE: &str = "jsonType.label";
    pub const MULTIVALUED: &str = "multivalued";

    pub const INCLUDE_IN_ID_TOKEN: &str = "id.token.claim";
    pub const INCLUDE_IN_ACCESS_TOKEN: &str = "access.token.claim";
    pub const INCLUDE_IN_USERINFO: &str = "userinfo.token.claim";
    pub const INCLUDE_IN_ACCESS_TOKEN_RESPONSE: &str = "access.tokenResponse.claim";
}

/// Raw mapper configuration as supplied by the host's configuration registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapperSettings(BTreeMap<String, String>);

impl MapperSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Loose boolean flag: only `"true"` (any case) is true.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn required(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing { key })
    }

    fn required_non_empty(&self, key: &'static str) -> Result<&str, ConfigError> {
        let value = self.required(key)?;
        if value.trim().is_empty() {
            return Err(ConfigError::Empty { key });
        }
        Ok(value)
    }

    fn required_bool(&self, key: &'static str) -> Result<bool, ConfigError> {
        let raw = self.required(key)?;
        match raw.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(true),
            v if v.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ConfigError::InvalidBoolean {
                key,
                value: other.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapperSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration option '{key}'")]
    Missing { key: &'static str },

    #[error("configuration option '{key}' is empty")]
    Empty { key: &'static str },

    #[error("configuration option '{key}' must be 'true' or 'false', got '{value}'")]
    InvalidBoolean { key: &'static str, value: String },

    #[error("unknown modification location '{0}' (expected 'Prefix' or 'Suffix')")]
    InvalidLocation(String),

    #[error("invalid group path: {0}")]
    InvalidGroupPath(#[source] DomainError),
}

/// Where the modification text is attached to the source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Prefix,
    Suffix,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::Prefix, Location::Suffix];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Prefix => "Prefix",
            Location::Suffix => "Suffix",
        }
    }

    /// Attach `modification` to `value`. Plain concatenation, nothing trimmed.
    pub fn apply(&self, modification: &str, value: &str) -> String {
        let mut out = String::with_capacity(modification.len() + value.len());
        match self {
            Location::Prefix => {
                out.push_str(modification);
                out.push_str(value);
            }
            Location::Suffix => {
                out.push_str(value);
                out.push_str(modification);
            }
        }
        out
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Location {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Prefix" => Ok(Location::Prefix),
            "Suffix" => Ok(Location::Suffix),
            other => Err(ConfigError::InvalidLocation(other.to_string())),
        }
    }
}

/// The six options of a group-gated modification rule.
///
/// # Invariants
/// - Every option was present in the settings.
/// - `attribute_name` is non-empty and `group_path` has at least one segment.
/// - `modification` may be empty; it is attached verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    pub attribute_name: String,
    pub use_other_claims: bool,
    pub modification: String,
    pub group_path: GroupPath,
    pub require_membership: bool,
    pub location: Location,
}

impl ValueObject for RuleConfig {}

impl RuleConfig {
    pub fn from_settings(settings: &MapperSettings) -> Result<Self, ConfigError> {
        let attribute_name = match settings.get(keys::USER_ATTRIBUTE) {
            Some(_) => settings.required_non_empty(keys::USER_ATTRIBUTE)?,
            None => settings
                .required_non_empty(keys::ATTRIBUTE)
                .map_err(|err| match err {
                    ConfigError::Missing { .. } => ConfigError::Missing {
                        key: keys::USER_ATTRIBUTE,
                    },
                    other => other,
                })?,
        };
        let use_other_claims = settings.required_bool(keys::OTHER_CLAIM)?;
        let modification = settings.required(keys::MODIFICATION)?;
        let group_path = GroupPath::parse(settings.required_non_empty(keys::GROUP)?)
            .map_err(ConfigError::InvalidGroupPath)?;
        let require_membership = settings.required_bool(keys::MEMBERSHIP)?;
        let location = settings.required(keys::LOCATION)?.parse()?;

        Ok(Self {
            attribute_name: attribute_name.to_string(),
            use_other_claims,
            modification: modification.to_string(),
            group_path,
            require_membership,
            location,
        })
    }

    /// Write this configuration back into host settings form.
    pub fn to_settings(&self) -> MapperSettings {
        MapperSettings::new()
            .with(keys::USER_ATTRIBUTE, self.attribute_name.clone())
            .with(keys::OTHER_CLAIM, self.use_other_claims.to_string())
            .with(keys::MODIFICATION, self.modification.clone())
            .with(keys::GROUP, self.group_path.to_string())
            .with(keys::MEMBERSHIP, self.require_membership.to_string())
            .with(keys::LOCATION, self.location.as_str())
    }
}

/// JSON type a mapped claim value is converted to before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JsonType {
    #[default]
    String,
    Long,
    Int,
    Boolean,
    Json,
}

impl JsonType {
    /// Parse the `jsonType.label` option. Unknown labels fall back to `String`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "long" => JsonType::Long,
            "int" => JsonType::Int,
            "boolean" => JsonType::Boolean,
            "JSON" => JsonType::Json,
            _ => JsonType::String,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JsonType::String => "String",
            JsonType::Long => "long",
            JsonType::Int => "int",
            JsonType::Boolean => "boolean",
            JsonType::Json => "JSON",
        }
    }

    /// Convert a string value. `None` when the value does not fit the type.
    pub fn convert(&self, value: &str) -> Option<Value> {
        match self {
            JsonType::String => Some(Value::String(value.to_string())),
            JsonType::Long => value.trim().parse::<i64>().ok().map(Value::from),
            JsonType::Int => value.trim().parse::<i32>().ok().map(Value::from),
            JsonType::Boolean => match value.trim() {
                v if v.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                v if v.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                _ => None,
            },
            JsonType::Json => serde_json::from_str(value).ok(),
        }
    }
}

/// Placement of a mapped value in the token: claim name, type, cardinality and
/// which token kinds receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimMapping {
    pub claim_name: Option<String>,
    pub json_type: JsonType,
    pub multivalued: bool,
    pub include_in_id_token: bool,
    pub include_in_access_token: bool,
    pub include_in_userinfo: bool,
    pub include_in_access_token_response: bool,
}

impl ClaimMapping {
    /// Read claim placement options.
    ///
    /// Missing include flags follow the long-standing host defaults: access
    /// tokens are included unless switched off, ID tokens and token responses
    /// only when switched on, and userinfo follows the ID token flag.
    pub fn from_settings(settings: &MapperSettings) -> Self {
        let include_in_id_token = settings.flag(keys::INCLUDE_IN_ID_TOKEN).unwrap_or(false);
        Self {
            claim_name: settings
                .get(keys::CLAIM_NAME)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            json_type: settings
                .get(keys::JSON_TYPE)
                .map(JsonType::from_label)
                .unwrap_or_default(),
            multivalued: settings.flag(keys::MULTIVALUED).unwrap_or(false),
            include_in_id_token,
            include_in_access_token: settings.flag(keys::INCLUDE_IN_ACCESS_TOKEN).unwrap_or(true),
            include_in_userinfo: settings
                .flag(keys::INCLUDE_IN_USERINFO)
                .unwrap_or(include_in_id_token),
            include_in_access_token_response: settings
                .flag(keys::INCLUDE_IN_ACCESS_TOKEN_RESPONSE)
                .unwrap_or(false),
        }
    }

    pub fn includes(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Id => self.include_in_id_token,
            TokenKind::Access => self.include_in_access_token,
            TokenKind::UserInfo => self.include_in_userinfo,
        }
    }

    pub fn claim_path(&self) -> Option<ClaimPath> {
        self.claim_name.as_deref().and_then(ClaimPath::parse)
    }
}
