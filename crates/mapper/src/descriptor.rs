//! Provider metadata for admin tooling: what the group claim mapper is called
//! and which options it takes.

use serde::Serialize;

use crate::config::{keys, Location};
use crate::mapper::GROUP_CLAIM_MAPPER_ID;

pub const TOKEN_MAPPER_CATEGORY: &str = "Token mapper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum PropertyKind {
    String,
    Boolean,
    Group,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigProperty {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

impl ConfigProperty {
    fn new(name: &'static str, label: &'static str, help_text: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            label,
            help_text,
            kind,
            default_value: None,
            options: Vec::new(),
        }
    }

    fn default_value(mut self, value: &'static str) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: &'static str,
    pub display_type: &'static str,
    pub display_category: &'static str,
    pub help_text: &'static str,
    pub properties: Vec<ConfigProperty>,
}

impl ProviderDescriptor {
    pub fn property(&self, name: &str) -> Option<&ConfigProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Descriptor of [`GroupClaimMapper`](crate::mapper::GroupClaimMapper).
pub fn group_claim_mapper_descriptor() -> ProviderDescriptor {
    let mut location = ConfigProperty::new(
        keys::LOCATION,
        "Location",
        "Where to add the configured modification",
        PropertyKind::List,
    );
    location.options = Location::ALL.iter().map(Location::as_str).collect();

    ProviderDescriptor {
        id: GROUP_CLAIM_MAPPER_ID,
        display_type: "OIDC Claims Modification Mapper",
        display_category: TOKEN_MAPPER_CATEGORY,
        help_text: "Adds a prefix or suffix to a claim based on a user's direct group membership",
        properties: vec![
            ConfigProperty::new(
                keys::INCLUDE_IN_ID_TOKEN,
                "Add to ID token",
                "Should the claim be added to the ID token?",
                PropertyKind::Boolean,
            )
            .default_value("true"),
            ConfigProperty::new(
                keys::INCLUDE_IN_ACCESS_TOKEN,
                "Add to access token",
                "Should the claim be added to the access token?",
                PropertyKind::Boolean,
            )
            .default_value("true"),
            ConfigProperty::new(
                keys::INCLUDE_IN_USERINFO,
                "Add to userinfo",
                "Should the claim be added to the userinfo?",
                PropertyKind::Boolean,
            )
            .default_value("true"),
            ConfigProperty::new(
                keys::INCLUDE_IN_ACCESS_TOKEN_RESPONSE,
                "Add to access token response",
                "Should the claim be added to the access token response?",
                PropertyKind::Boolean,
            )
            .default_value("false"),
            ConfigProperty::new(
                keys::CLAIM_NAME,
                "Token Claim Name",
                "Name of the claim to insert into the token. Dots nest the claim; escape a literal dot with a backslash.",
                PropertyKind::String,
            ),
            ConfigProperty::new(
                keys::USER_ATTRIBUTE,
                "Property",
                "Name of the property method in the UserModel interface, or a custom user attribute.",
                PropertyKind::String,
            ),
            ConfigProperty::new(
                keys::OTHER_CLAIM,
                "Other Claim",
                "Look up the attribute among the claims already in the token instead of the user profile. Use this to modify e.g. the full name claim.",
                PropertyKind::Boolean,
            )
            .default_value("false"),
            ConfigProperty::new(
                keys::MODIFICATION,
                "Modification",
                "Text added to the configured claim when the condition holds",
                PropertyKind::String,
            ),
            ConfigProperty::new(
                keys::GROUP,
                "Group",
                "The group whose membership is checked for the user",
                PropertyKind::Group,
            ),
            ConfigProperty::new(
                keys::MEMBERSHIP,
                "Membership",
                "Apply the modification when the user is a direct member of the group (ON) or when the user is not (OFF).",
                PropertyKind::Boolean,
            ),
            location,
        ],
    }
}
