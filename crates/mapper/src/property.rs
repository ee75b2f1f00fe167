//! Baseline user-property mapper.
//!
//! Copies one subject property into a claim. It runs at the default priority,
//! so group claim mappers configured with `other = true` see its output.

use serde_json::Value;

use crate::claims::{AccessTokenResponse, ClaimsContainer, Token};
use crate::config::{keys, ClaimMapping, MapperSettings};
use crate::mapper::{MapperContext, ProtocolMapper, DEFAULT_PRIORITY};

pub const USER_PROPERTY_MAPPER_ID: &str = "oidc-usermodel-property-mapper";

#[derive(Debug, Clone)]
pub struct UserPropertyMapper {
    name: String,
    settings: MapperSettings,
    priority: i32,
}

impl UserPropertyMapper {
    pub fn new(name: impl Into<String>, settings: MapperSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn set_claim(
        &self,
        container: &mut impl ClaimsContainer,
        mapping: &ClaimMapping,
        ctx: &MapperContext<'_>,
    ) {
        let Some(property) = self.settings.get(keys::USER_ATTRIBUTE) else {
            return;
        };
        let Some(Value::String(rendered)) = ctx.subject.property(property) else {
            tracing::trace!(property, "property absent or multi-valued, skipped");
            return;
        };
        ctx.attacher.attach(container.other_claims_mut(), mapping, &rendered);
    }
}

impl ProtocolMapper for UserPropertyMapper {
    fn provider_id(&self) -> &str {
        USER_PROPERTY_MAPPER_ID
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn transform_token(&self, token: &mut Token, ctx: &MapperContext<'_>) {
        let mapping = ClaimMapping::from_settings(&self.settings);
        if mapping.includes(token.kind) {
            self.set_claim(token, &mapping, ctx);
        }
    }

    fn transform_access_token_response(
        &self,
        response: &mut AccessTokenResponse,
        ctx: &MapperContext<'_>,
    ) {
        let mapping = ClaimMapping::from_settings(&self.settings);
        if mapping.include_in_access_token_response {
            self.set_claim(response, &mapping, ctx);
        }
    }
}
