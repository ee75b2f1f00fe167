//! Protocol mappers: the entry points the token pipeline calls.

use crate::claims::{AccessTokenResponse, ClaimAttacher, ClaimsContainer, Token};
use crate::config::{ClaimMapping, MapperSettings};
use crate::diagnostics::DecisionSink;
use crate::group::GroupResolver;
use crate::rule::{evaluate_settings, RuleOutcome};
use crate::subject::SubjectContext;

/// Priority of ordinary attribute mappers.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Runs after default mappers so it can read the claims they wrote.
pub const GROUP_CLAIM_MAPPER_PRIORITY: i32 = 100;

pub const GROUP_CLAIM_MAPPER_ID: &str = "group-based-prefix-oidc-mapper";

/// Host collaborators handed to every mapper for one issuance event.
#[derive(Clone, Copy)]
pub struct MapperContext<'a> {
    pub subject: &'a SubjectContext,
    pub groups: &'a dyn GroupResolver,
    pub attacher: &'a dyn ClaimAttacher,
    pub sink: &'a dyn DecisionSink,
}

/// A configured mapper instance in the token pipeline.
pub trait ProtocolMapper: Send + Sync {
    /// Provider id (the mapper *type*).
    fn provider_id(&self) -> &str;

    /// Instance name, unique per client.
    fn name(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// ID, access and userinfo tokens.
    fn transform_token(&self, token: &mut Token, ctx: &MapperContext<'_>);

    fn transform_access_token_response(
        &self,
        response: &mut AccessTokenResponse,
        ctx: &MapperContext<'_>,
    );
}

/// Prefixes or suffixes a claim depending on the subject's direct membership
/// in a configured group.
#[derive(Debug, Clone)]
pub struct GroupClaimMapper {
    name: String,
    settings: MapperSettings,
}

impl GroupClaimMapper {
    pub fn new(name: impl Into<String>, settings: MapperSettings) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    fn set_claim(
        &self,
        container: &mut impl ClaimsContainer,
        mapping: &ClaimMapping,
        ctx: &MapperContext<'_>,
    ) {
        let outcome = evaluate_settings(
            &self.settings,
            ctx.subject,
            container.other_claims(),
            ctx.groups,
            ctx.sink,
        );
        if let RuleOutcome::Modified(value) = outcome {
            ctx.attacher.attach(container.other_claims_mut(), mapping, &value);
        }
    }
}

impl ProtocolMapper for GroupClaimMapper {
    fn provider_id(&self) -> &str {
        GROUP_CLAIM_MAPPER_ID
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        GROUP_CLAIM_MAPPER_PRIORITY
    }

    fn transform_token(&self, token: &mut Token, ctx: &MapperContext<'_>) {
        let mapping = ClaimMapping::from_settings(&self.settings);
        if !mapping.includes(token.kind) {
            return;
        }
        self.set_claim(token, &mapping, ctx);
    }

    fn transform_access_token_response(
        &self,
        response: &mut AccessTokenResponse,
        ctx: &MapperContext<'_>,
    ) {
        let mapping = ClaimMapping::from_settings(&self.settings);
        if !mapping.include_in_access_token_response {
            return;
        }
        self.set_claim(response, &mapping, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{NestedClaimAttacher, TokenKind};
    use crate::config::keys;
    use crate::diagnostics::{Decision, NoChangeReason, RecordingSink};
    use crate::group::InMemoryRealm;
    use chrono::{Duration, Utc};
    use groupclaim_core::{Entity, TenantId, UserId};
    use serde_json::json;

    fn settings() -> MapperSettings {
        MapperSettings::new()
            .with(keys::USER_ATTRIBUTE, "email")
            .with(keys::OTHER_CLAIM, "false")
            .with(keys::MODIFICATION, "EXT-")
            .with(keys::GROUP, "/external")
            .with(keys::MEMBERSHIP, "true")
            .with(keys::LOCATION, "Prefix")
            .with(keys::CLAIM_NAME, "email")
            .with(keys::INCLUDE_IN_ID_TOKEN, "true")
            .with(keys::INCLUDE_IN_ACCESS_TOKEN, "false")
            .with(keys::INCLUDE_IN_ACCESS_TOKEN_RESPONSE, "true")
    }

    fn world() -> (InMemoryRealm, SubjectContext) {
        let realm = InMemoryRealm::new();
        let tenant = TenantId::new();
        let group = realm.add_group(tenant, "external", None).unwrap();
        let subject = SubjectContext::new(tenant, UserId::new(), "jane")
            .with_email("a@x.com", true)
            .with_group(*group.id());
        (realm, subject)
    }

    fn token(kind: TokenKind, subject: &SubjectContext) -> Token {
        let mut token = Token::new(kind, subject.user_id(), Utc::now(), Duration::minutes(5));
        token.other_claims.insert("email".into(), json!("a@x.com"));
        token
    }

    #[test]
    fn writes_modified_claim_into_id_token() {
        let (realm, subject) = world();
        let sink = RecordingSink::new();
        let ctx = MapperContext {
            subject: &subject,
            groups: &realm,
            attacher: &NestedClaimAttacher,
            sink: &sink,
        };
        let mapper = GroupClaimMapper::new("external email", settings());

        let mut id_token = token(TokenKind::Id, &subject);
        mapper.transform_token(&mut id_token, &ctx);
        assert_eq!(id_token.other_claims.get("email"), Some(&json!("EXT-a@x.com")));
    }

    #[test]
    fn respects_include_flags() {
        let (realm, subject) = world();
        let sink = RecordingSink::new();
        let ctx = MapperContext {
            subject: &subject,
            groups: &realm,
            attacher: &NestedClaimAttacher,
            sink: &sink,
        };
        let mapper = GroupClaimMapper::new("external email", settings());

        let mut access = token(TokenKind::Access, &subject);
        mapper.transform_token(&mut access, &ctx);
        assert_eq!(access.other_claims.get("email"), Some(&json!("a@x.com")));
        // Excluded token kinds never reach the rule.
        assert!(sink.decisions().is_empty());

        let mut userinfo = token(TokenKind::UserInfo, &subject);
        mapper.transform_token(&mut userinfo, &ctx);
        assert_eq!(userinfo.other_claims.get("email"), Some(&json!("EXT-a@x.com")));
    }

    #[test]
    fn token_response_reads_its_own_claims() {
        let (realm, subject) = world();
        let sink = RecordingSink::new();
        let ctx = MapperContext {
            subject: &subject,
            groups: &realm,
            attacher: &NestedClaimAttacher,
            sink: &sink,
        };
        let mapper = GroupClaimMapper::new(
            "external name",
            settings()
                .with(keys::OTHER_CLAIM, "true")
                .with(keys::USER_ATTRIBUTE, "name")
                .with(keys::CLAIM_NAME, "name"),
        );

        let mut response = AccessTokenResponse::bearer(Duration::minutes(5));
        mapper.transform_access_token_response(&mut response, &ctx);
        assert!(response.other_claims.get("name").is_none());

        response.other_claims.insert("name".into(), json!("Jane"));
        mapper.transform_access_token_response(&mut response, &ctx);
        assert_eq!(response.other_claims.get("name"), Some(&json!("EXT-Jane")));
    }

    #[test]
    fn misconfigured_mapper_leaves_token_untouched() {
        let (realm, subject) = world();
        let sink = RecordingSink::new();
        let ctx = MapperContext {
            subject: &subject,
            groups: &realm,
            attacher: &NestedClaimAttacher,
            sink: &sink,
        };
        let broken: MapperSettings = settings().with(keys::MEMBERSHIP, "sometimes");
        let mapper = GroupClaimMapper::new("broken", broken);

        let mut id_token = token(TokenKind::Id, &subject);
        let before = id_token.clone();
        mapper.transform_token(&mut id_token, &ctx);

        assert_eq!(id_token, before);
        assert!(matches!(
            sink.last(),
            Some(Decision::NoChange(NoChangeReason::MisconfiguredRule(_)))
        ));
    }

    #[test]
    fn runs_after_default_mappers() {
        let mapper = GroupClaimMapper::new("m", settings());
        assert!(mapper.priority() > DEFAULT_PRIORITY);
        assert_eq!(mapper.provider_id(), GROUP_CLAIM_MAPPER_ID);
    }
}
