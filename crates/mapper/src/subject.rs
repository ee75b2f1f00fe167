//! The authenticated subject a token is being issued for.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use groupclaim_core::{GroupId, TenantId, UserId};

/// Profile, attributes and direct group memberships of the token subject.
///
/// Built by the host per token-issuance event and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectContext {
    user_id: UserId,
    tenant_id: TenantId,
    username: String,
    email: Option<String>,
    email_verified: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    attributes: BTreeMap<String, Vec<String>>,
    direct_groups: BTreeSet<GroupId>,
}

impl SubjectContext {
    pub fn new(tenant_id: TenantId, user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            tenant_id,
            username: username.into(),
            email: None,
            email_verified: false,
            first_name: None,
            last_name: None,
            enabled: true,
            created_at: Utc::now(),
            attributes: BTreeMap::new(),
            direct_groups: BTreeSet::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set a custom attribute, replacing previous values.
    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Record a direct membership.
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.direct_groups.insert(group);
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_direct_member_of(&self, group: &GroupId) -> bool {
        self.direct_groups.contains(group)
    }

    pub fn direct_groups(&self) -> impl Iterator<Item = &GroupId> {
        self.direct_groups.iter()
    }

    /// Single-value projection of a user property.
    ///
    /// Built-in properties resolve like bean getters: the name matches with
    /// or without its first letter capitalized (`email`, `Email`), and the
    /// value is always rendered as a string (`emailVerified` gives `"true"`,
    /// `createdTimestamp` gives milliseconds). Anything else is looked up in
    /// the custom attributes: one value projects to a string, several to an
    /// array.
    pub fn property(&self, name: &str) -> Option<Value> {
        if let Some(builtin) = self.builtin_property(name) {
            return builtin.map(Value::String);
        }

        match self.attribute_values(name) {
            [] => None,
            [single] => Some(Value::String(single.clone())),
            many => Some(Value::Array(
                many.iter().cloned().map(Value::String).collect(),
            )),
        }
    }

    /// `None` when `name` is not a built-in property; `Some(None)` when it is
    /// but has no value.
    fn builtin_property(&self, name: &str) -> Option<Option<String>> {
        let mut chars = name.chars();
        let first = chars.next()?.to_ascii_uppercase();
        let getter = format!("{first}{}", chars.as_str());

        let value = match getter.as_str() {
            "Id" => Some(self.user_id.to_string()),
            "Username" => Some(self.username.clone()),
            "Email" => self.email.clone(),
            "FirstName" => self.first_name.clone(),
            "LastName" => self.last_name.clone(),
            "EmailVerified" => Some(self.email_verified.to_string()),
            "Enabled" => Some(self.enabled.to_string()),
            "CreatedTimestamp" => Some(self.created_at.timestamp_millis().to_string()),
            _ => return None,
        };
        Some(value)
    }
}
