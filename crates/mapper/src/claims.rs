//! Token claim containers and claim placement.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use groupclaim_core::UserId;

use crate::config::ClaimMapping;

/// Claim name -> claim value, as accumulated by the mapper pipeline.
pub type ClaimMap = serde_json::Map<String, Value>;

/// Kind of token a [`Token`] represents; decides which include flag applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Id,
    #[default]
    Access,
    UserInfo,
}

/// Transport-agnostic ID / access / userinfo token body.
///
/// Registered claims are typed; everything mappers add lives in `other_claims`
/// and is flattened on serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(skip)]
    pub kind: TokenKind,

    pub sub: UserId,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    #[serde(flatten)]
    pub other_claims: ClaimMap,
}

impl Token {
    pub fn new(kind: TokenKind, sub: UserId, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            kind,
            sub,
            issued_at,
            expires_at: issued_at + lifetime,
            other_claims: ClaimMap::new(),
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub token_type: String,
    pub expires_in: i64,

    #[serde(flatten)]
    pub other_claims: ClaimMap,
}

impl AccessTokenResponse {
    pub fn bearer(expires_in: Duration) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            expires_in: expires_in.num_seconds(),
            other_claims: ClaimMap::new(),
        }
    }
}

/// Anything carrying a mutable map of mapper-provided claims.
pub trait ClaimsContainer {
    fn other_claims(&self) -> &ClaimMap;
    fn other_claims_mut(&mut self) -> &mut ClaimMap;
}

impl ClaimsContainer for Token {
    fn other_claims(&self) -> &ClaimMap {
        &self.other_claims
    }

    fn other_claims_mut(&mut self) -> &mut ClaimMap {
        &mut self.other_claims
    }
}

impl ClaimsContainer for AccessTokenResponse {
    fn other_claims(&self) -> &ClaimMap {
        &self.other_claims
    }

    fn other_claims_mut(&mut self) -> &mut ClaimMap {
        &mut self.other_claims
    }
}

/// Claim name split into nested object keys.
///
/// `address.street` lands at `{"address": {"street": ..}}`; `\.` keeps a
/// literal dot inside one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPath(Vec<String>);

impl ClaimPath {
    /// `None` for an empty name.
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = name.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        segments.push(current);
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

/// Host primitive that writes a mapped value into a claim map.
pub trait ClaimAttacher: Send + Sync {
    fn attach(&self, claims: &mut ClaimMap, mapping: &ClaimMapping, value: &str);
}

/// Default placement: nested claim names, JSON type conversion, multivalued arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedClaimAttacher;

impl ClaimAttacher for NestedClaimAttacher {
    fn attach(&self, claims: &mut ClaimMap, mapping: &ClaimMapping, value: &str) {
        let Some(path) = mapping.claim_path() else {
            tracing::debug!("no claim name configured, nothing attached");
            return;
        };
        let Some(converted) = mapping.json_type.convert(value) else {
            tracing::debug!(
                json_type = mapping.json_type.label(),
                "value does not convert to configured JSON type, nothing attached"
            );
            return;
        };
        let Some((leaf, parents)) = path.segments().split_last() else {
            return;
        };

        let mut current = claims;
        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(ClaimMap::new()));
            if !slot.is_object() {
                *slot = Value::Object(ClaimMap::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            current = next;
        }

        if mapping.multivalued {
            match current.get_mut(leaf) {
                Some(Value::Array(existing)) => {
                    if !existing.contains(&converted) {
                        existing.push(converted);
                    }
                }
                _ => {
                    current.insert(leaf.clone(), Value::Array(vec![converted]));
                }
            }
        } else {
            current.insert(leaf.clone(), converted);
        }
    }
}
