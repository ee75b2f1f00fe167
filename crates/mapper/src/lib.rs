//! `groupclaim-mapper` — group-gated claim modification for OIDC token issuance.
//!
//! A [`GroupClaimMapper`] prefixes or suffixes one claim when the token
//! subject's direct membership in a configured group matches what the rule
//! expects. The decision itself lives in [`ClaimTransformRule`]; it has no
//! storage or transport dependencies, and every host capability (group
//! lookup, claim placement, diagnostics) is injected.

pub mod claims;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod group;
pub mod mapper;
pub mod pipeline;
pub mod property;
pub mod rule;
pub mod subject;

pub use claims::{
    AccessTokenResponse, ClaimAttacher, ClaimMap, ClaimPath, ClaimsContainer, NestedClaimAttacher,
    Token, TokenKind,
};
pub use config::{ClaimMapping, ConfigError, JsonType, Location, MapperSettings, RuleConfig};
pub use descriptor::{group_claim_mapper_descriptor, ProviderDescriptor};
pub use diagnostics::{
    Decision, DecisionSink, NoChangeReason, NoopSink, RecordingSink, SourceKind, TracingSink,
};
pub use group::{Group, GroupPath, GroupResolver, InMemoryRealm};
pub use mapper::{
    GroupClaimMapper, MapperContext, ProtocolMapper, DEFAULT_PRIORITY, GROUP_CLAIM_MAPPER_ID,
    GROUP_CLAIM_MAPPER_PRIORITY,
};
pub use pipeline::MapperPipeline;
pub use property::UserPropertyMapper;
pub use rule::{evaluate_settings, ClaimSource, ClaimTransformRule, RuleOutcome};
pub use subject::SubjectContext;
