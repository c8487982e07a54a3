use super::scope;
use crate::interactors::engagements;
use crate::models::{Contact, Engagement};
use crate::utils::error::GraphqlResult;
use async_graphql::{ComplexObject, Context, Result};

#[ComplexObject]
impl Contact {
    /// Engagements that list this contact, most recently active first.
    async fn engagements(
        &self,
        ctx: &Context<'_>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Engagement>> {
        let (services, request) = scope(ctx)?;
        engagements::contact_engagements(services, request, &self.id, offset, limit).await.graphql()
    }
}
