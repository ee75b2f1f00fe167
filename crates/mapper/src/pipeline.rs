//! Ordered execution of protocol mappers for one issuance event.

use crate::claims::{AccessTokenResponse, Token};
use crate::mapper::{MapperContext, ProtocolMapper};

/// Mappers sorted by ascending priority; equal priorities keep registration order.
#[derive(Default)]
pub struct MapperPipeline {
    mappers: Vec<Box<dyn ProtocolMapper>>,
}

impl MapperPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapper(mut self, mapper: impl ProtocolMapper + 'static) -> Self {
        self.register(Box::new(mapper));
        self
    }

    pub fn register(&mut self, mapper: Box<dyn ProtocolMapper>) {
        let priority = mapper.priority();
        let idx = self.mappers.partition_point(|m| m.priority() <= priority);
        self.mappers.insert(idx, mapper);
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Mapper names in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    pub fn apply_to_token(&self, token: &mut Token, ctx: &MapperContext<'_>) {
        for mapper in &self.mappers {
            tracing::trace!(
                mapper = mapper.name(),
                provider = mapper.provider_id(),
                priority = mapper.priority(),
                kind = ?token.kind,
                "applying mapper"
            );
            mapper.transform_token(token, ctx);
        }
    }

    pub fn apply_to_access_token_response(
        &self,
        response: &mut AccessTokenResponse,
        ctx: &MapperContext<'_>,
    ) {
        for mapper in &self.mappers {
            tracing::trace!(mapper = mapper.name(), "applying mapper to token response");
            mapper.transform_access_token_response(response, ctx);
        }
    }
}

impl core::fmt::Debug for MapperPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapperPipeline")
            .field("order", &self.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, MapperSettings};
    use crate::mapper::GroupClaimMapper;
    use crate::property::UserPropertyMapper;

    #[test]
    fn orders_by_priority_then_registration() {
        let pipeline = MapperPipeline::new()
            .with_mapper(GroupClaimMapper::new("group rule", MapperSettings::new()))
            .with_mapper(UserPropertyMapper::new(
                "email",
                MapperSettings::new().with(keys::USER_ATTRIBUTE, "email"),
            ))
            .with_mapper(UserPropertyMapper::new("late", MapperSettings::new()).with_priority(200))
            .with_mapper(UserPropertyMapper::new(
                "name",
                MapperSettings::new().with(keys::USER_ATTRIBUTE, "firstName"),
            ));

        assert_eq!(pipeline.order(), vec!["email", "name", "group rule", "late"]);
        assert_eq!(pipeline.len(), 4);
    }
}
