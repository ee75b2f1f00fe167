//! The group-gated claim modification rule.
//!
//! Decision order, each step short-circuiting to [`RuleOutcome::NoChange`]:
//!
//! 1. configuration parses ([`ClaimTransformRule::from_settings`])
//! 2. the group path resolves in the subject's tenant
//! 3. direct membership equals `require_membership`
//! 4. the source value exists and is a string
//!
//! Only then is the modification attached. Nothing here returns an error:
//! a stale or misconfigured rule must never block token issuance.

use serde_json::Value;

use groupclaim_core::Entity;

use crate::claims::ClaimMap;
use crate::config::{ConfigError, MapperSettings, RuleConfig};
use crate::diagnostics::{DecisionSink, NoChangeReason, SourceKind};
use crate::group::GroupResolver;
use crate::subject::SubjectContext;

/// Where the rule reads its source value from.
#[derive(Debug, Clone, Copy)]
pub enum ClaimSource<'a> {
    /// The subject's profile properties and attributes.
    Subject(&'a SubjectContext),
    /// Claims already written into the token by earlier mappers.
    OtherClaims(&'a ClaimMap),
}

impl<'a> ClaimSource<'a> {
    pub fn select(
        use_other_claims: bool,
        subject: &'a SubjectContext,
        other_claims: &'a ClaimMap,
    ) -> Self {
        if use_other_claims {
            ClaimSource::OtherClaims(other_claims)
        } else {
            ClaimSource::Subject(subject)
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ClaimSource::Subject(_) => SourceKind::UserProfile,
            ClaimSource::OtherClaims(_) => SourceKind::OtherClaims,
        }
    }

    /// The value under `name` if it is a plain JSON string.
    pub fn resolve_string(&self, name: &str) -> Option<String> {
        match self {
            ClaimSource::Subject(subject) => match subject.property(name)? {
                Value::String(s) => Some(s),
                _ => None,
            },
            ClaimSource::OtherClaims(claims) => match claims.get(name)? {
                Value::String(s) => Some(s.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NoChange,
    Modified(String),
}

impl RuleOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, RuleOutcome::Modified(_))
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            RuleOutcome::Modified(value) => Some(value),
            RuleOutcome::NoChange => None,
        }
    }
}

/// A well-formed rule, ready to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTransformRule {
    config: RuleConfig,
}

impl ClaimTransformRule {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &MapperSettings) -> Result<Self, ConfigError> {
        RuleConfig::from_settings(settings).map(Self::new)
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// The claim source this rule reads from, given the token's current claims.
    pub fn source<'a>(
        &self,
        subject: &'a SubjectContext,
        other_claims: &'a ClaimMap,
    ) -> ClaimSource<'a> {
        ClaimSource::select(self.config.use_other_claims, subject, other_claims)
    }

    pub fn evaluate(
        &self,
        subject: &SubjectContext,
        source: ClaimSource<'_>,
        groups: &dyn GroupResolver,
        sink: &dyn DecisionSink,
    ) -> RuleOutcome {
        let config = &self.config;

        let Some(group) = groups.find_group_by_path(subject.tenant_id(), &config.group_path) else {
            sink.no_change(&NoChangeReason::UnresolvedGroup {
                path: config.group_path.clone(),
            });
            return RuleOutcome::NoChange;
        };

        let is_member = groups.is_direct_member(subject, &group);
        if is_member != config.require_membership {
            sink.no_change(&NoChangeReason::MembershipMismatch {
                path: config.group_path.clone(),
                is_member,
                require_membership: config.require_membership,
            });
            return RuleOutcome::NoChange;
        }

        let Some(value) = source.resolve_string(&config.attribute_name) else {
            sink.no_change(&NoChangeReason::UnresolvedOrNonStringSource {
                attribute: config.attribute_name.clone(),
                source: source.kind(),
            });
            return RuleOutcome::NoChange;
        };

        tracing::trace!(group = %group.id(), source = %source.kind(), "rule applies");
        let modified = config.location.apply(&config.modification, &value);
        sink.modified(&config.attribute_name, &modified);
        RuleOutcome::Modified(modified)
    }
}

/// Parse `settings` and evaluate in one step, reading from `other_claims` when
/// the rule asks for it. A configuration error is reported to `sink` and
/// yields [`RuleOutcome::NoChange`].
pub fn evaluate_settings(
    settings: &MapperSettings,
    subject: &SubjectContext,
    other_claims: &ClaimMap,
    groups: &dyn GroupResolver,
    sink: &dyn DecisionSink,
) -> RuleOutcome {
    match ClaimTransformRule::from_settings(settings) {
        Ok(rule) => {
            let source = rule.source(subject, other_claims);
            rule.evaluate(subject, source, groups, sink)
        }
        Err(err) => {
            sink.no_change(&NoChangeReason::MisconfiguredRule(err));
            RuleOutcome::NoChange
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, Location};
    use crate::diagnostics::{Decision, RecordingSink};
    use crate::group::{GroupPath, InMemoryRealm};
    use groupclaim_core::{TenantId, UserId};
    use proptest::prelude::*;
    use serde_json::json;

    struct Fixture {
        realm: InMemoryRealm,
        tenant: TenantId,
        external: groupclaim_core::GroupId,
    }

    fn fixture() -> Fixture {
        let realm = InMemoryRealm::new();
        let tenant = TenantId::new();
        let external = *realm.add_group(tenant, "external", None).unwrap().id();
        Fixture {
            realm,
            tenant,
            external,
        }
    }

    fn subject(f: &Fixture, member: bool) -> SubjectContext {
        let s = SubjectContext::new(f.tenant, UserId::new(), "jane")
            .with_email("a@x.com", true)
            .with_attribute("phone", ["1", "2"]);
        if member { s.with_group(f.external) } else { s }
    }

    fn config(require_membership: bool, location: Location) -> RuleConfig {
        RuleConfig {
            attribute_name: "email".into(),
            use_other_claims: false,
            modification: "EXT-".into(),
            group_path: GroupPath::parse("/external").unwrap(),
            require_membership,
            location,
        }
    }

    fn run(f: &Fixture, config: RuleConfig, subject: &SubjectContext, claims: &ClaimMap) -> (RuleOutcome, RecordingSink) {
        let sink = RecordingSink::new();
        let rule = ClaimTransformRule::new(config);
        let outcome = rule.evaluate(subject, rule.source(subject, claims), &f.realm, &sink);
        (outcome, sink)
    }

    #[test]
    fn member_gets_prefix() {
        let f = fixture();
        let (outcome, sink) = run(&f, config(true, Location::Prefix), &subject(&f, true), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::Modified("EXT-a@x.com".into()));
        assert_eq!(
            sink.last(),
            Some(Decision::Modified {
                attribute: "email".into(),
                value: "EXT-a@x.com".into()
            })
        );
    }

    #[test]
    fn suffix_appends() {
        let f = fixture();
        let (outcome, _) = run(&f, config(true, Location::Suffix), &subject(&f, true), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::Modified("a@x.comEXT-".into()));
    }

    #[test]
    fn non_member_is_left_alone() {
        let f = fixture();
        let (outcome, sink) = run(&f, config(true, Location::Prefix), &subject(&f, false), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::NoChange);
        assert!(matches!(
            sink.last(),
            Some(Decision::NoChange(NoChangeReason::MembershipMismatch { is_member: false, .. }))
        ));
    }

    #[test]
    fn inverted_gate_fires_for_non_members() {
        let f = fixture();
        let (outcome, _) = run(&f, config(false, Location::Prefix), &subject(&f, false), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::Modified("EXT-a@x.com".into()));

        let (outcome, _) = run(&f, config(false, Location::Prefix), &subject(&f, true), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::NoChange);
    }

    #[test]
    fn unknown_group_short_circuits_before_membership() {
        let f = fixture();
        let mut cfg = config(false, Location::Prefix);
        cfg.group_path = GroupPath::parse("/renamed").unwrap();

        let (outcome, sink) = run(&f, cfg, &subject(&f, false), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::NoChange);
        assert!(matches!(
            sink.last(),
            Some(Decision::NoChange(NoChangeReason::UnresolvedGroup { .. }))
        ));
    }

    #[test]
    fn membership_through_child_group_does_not_count() {
        let f = fixture();
        let child = f.realm.add_group(f.tenant, "contractors", Some(f.external)).unwrap();
        let s = SubjectContext::new(f.tenant, UserId::new(), "jane")
            .with_email("a@x.com", false)
            .with_group(*child.id());

        let (outcome, _) = run(&f, config(true, Location::Prefix), &s, &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::NoChange);
    }

    #[test]
    fn reads_other_claims_when_configured() {
        let f = fixture();
        let mut cfg = config(true, Location::Prefix);
        cfg.use_other_claims = true;
        cfg.attribute_name = "name".into();

        let mut claims = ClaimMap::new();
        claims.insert("name".into(), json!("Jane"));
        let (outcome, _) = run(&f, cfg, &subject(&f, true), &claims);
        assert_eq!(outcome, RuleOutcome::Modified("EXT-Jane".into()));
    }

    #[test]
    fn other_claims_ignore_profile_properties() {
        let f = fixture();
        let mut cfg = config(true, Location::Prefix);
        cfg.use_other_claims = true;

        // `email` exists on the profile but not among the claims.
        let (outcome, sink) = run(&f, cfg, &subject(&f, true), &ClaimMap::new());
        assert_eq!(outcome, RuleOutcome::NoChange);
        assert_eq!(
            sink.last(),
            Some(Decision::NoChange(NoChangeReason::UnresolvedOrNonStringSource {
                attribute: "email".into(),
                source: SourceKind::OtherClaims,
            }))
        );
    }

    #[test]
    fn non_string_claims_are_not_applicable() {
        let f = fixture();
        let mut cfg = config(true, Location::Prefix);
        cfg.use_other_claims = true;
        cfg.attribute_name = "level".into();

        for value in [json!(3), json!(["a"]), json!({"a": "b"}), json!(true), Value::Null] {
            let mut claims = ClaimMap::new();
            claims.insert("level".into(), value.clone());
            let (outcome, _) = run(&f, cfg.clone(), &subject(&f, true), &claims);
            assert_eq!(outcome, RuleOutcome::NoChange, "value {value}");
        }
    }

    #[test]
    fn profile_scalars_are_modified_as_text() {
        let f = fixture();
        let created_at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let member = subject(&f, true).with_created_at(created_at);
        for (attribute, expected) in [
            ("emailVerified", "EXT-true"),
            ("enabled", "EXT-true"),
            ("createdTimestamp", "EXT-1700000000000"),
            ("Email", "EXT-a@x.com"),
        ] {
            let mut cfg = config(true, Location::Prefix);
            cfg.attribute_name = attribute.into();
            let (outcome, _) = run(&f, cfg, &member, &ClaimMap::new());
            assert_eq!(outcome, RuleOutcome::Modified(expected.into()), "attribute {attribute}");
        }
    }

    #[test]
    fn multi_valued_and_unknown_profile_values_are_not_applicable() {
        let f = fixture();
        for attribute in ["phone", "missing", "EMAIL"] {
            let mut cfg = config(true, Location::Prefix);
            cfg.attribute_name = attribute.into();
            let (outcome, _) = run(&f, cfg, &subject(&f, true), &ClaimMap::new());
            assert_eq!(outcome, RuleOutcome::NoChange, "attribute {attribute}");
        }
    }

    #[test]
    fn evaluate_settings_reports_misconfiguration() {
        let f = fixture();
        let settings = config(true, Location::Prefix)
            .to_settings()
            .with(keys::LOCATION, "Middle");
        let sink = RecordingSink::new();

        let outcome = evaluate_settings(&settings, &subject(&f, true), &ClaimMap::new(), &f.realm, &sink);
        assert_eq!(outcome, RuleOutcome::NoChange);
        assert_eq!(
            sink.decisions(),
            vec![Decision::NoChange(NoChangeReason::MisconfiguredRule(
                ConfigError::InvalidLocation("Middle".into())
            ))]
        );
    }

    #[test]
    fn evaluate_settings_applies_well_formed_rule() {
        let f = fixture();
        let settings = config(true, Location::Suffix).to_settings();
        let outcome = evaluate_settings(
            &settings,
            &subject(&f, true),
            &ClaimMap::new(),
            &f.realm,
            &crate::diagnostics::NoopSink,
        );
        assert_eq!(outcome.into_value().as_deref(), Some("a@x.comEXT-"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: concatenation is exact for any source value and modification.
        #[test]
        fn modification_is_exact_concatenation(
            value in ".*",
            modification in ".*",
            prefix in any::<bool>(),
        ) {
            let f = fixture();
            let location = if prefix { Location::Prefix } else { Location::Suffix };
            let mut cfg = config(true, location);
            cfg.use_other_claims = true;
            cfg.attribute_name = "claim".into();
            cfg.modification = modification.clone();

            let mut claims = ClaimMap::new();
            claims.insert("claim".into(), Value::String(value.clone()));
            let (outcome, _) = run(&f, cfg, &subject(&f, true), &claims);

            let expected = if prefix {
                format!("{modification}{value}")
            } else {
                format!("{value}{modification}")
            };
            prop_assert_eq!(outcome, RuleOutcome::Modified(expected));
        }

        /// Property: a membership mismatch yields NoChange whatever the other options are.
        #[test]
        fn membership_mismatch_always_no_change(
            member in any::<bool>(),
            use_other_claims in any::<bool>(),
            prefix in any::<bool>(),
            modification in "[a-zA-Z-]{0,8}",
        ) {
            let f = fixture();
            let location = if prefix { Location::Prefix } else { Location::Suffix };
            let mut cfg = config(!member, location);
            cfg.use_other_claims = use_other_claims;
            cfg.modification = modification;

            let mut claims = ClaimMap::new();
            claims.insert("email".into(), json!("a@x.com"));
            let (outcome, _) = run(&f, cfg, &subject(&f, member), &claims);
            prop_assert_eq!(outcome, RuleOutcome::NoChange);
        }

        /// Property: evaluation is deterministic for identical inputs.
        #[test]
        fn evaluation_is_repeatable(member in any::<bool>(), require in any::<bool>()) {
            let f = fixture();
            let s = subject(&f, member);
            let claims = ClaimMap::new();
            let (first, _) = run(&f, config(require, Location::Prefix), &s, &claims);
            let (second, _) = run(&f, config(require, Location::Prefix), &s, &claims);
            prop_assert_eq!(first, second);
        }
    }
}
