//! GraphQL schema. Resolvers only unpack arguments and delegate to the
//! interactors; failures surface with an `extensions.code`.

pub mod mutation;
pub mod query;
pub mod relations;
pub mod subscription;

use crate::middleware::auth::RequestContext;
use crate::services::Services;
use async_graphql::{Context, Schema};
use std::sync::Arc;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;

pub type AppSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(services: Arc<Services>) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(services)
        .limit_depth(12)
        .limit_complexity(2000)
        .finish()
}

/// Shared services plus the per-request context attached by the handler.
pub(crate) fn scope<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<(&'a Services, &'a RequestContext)> {
    let services = ctx.data::<Arc<Services>>()?;
    let request = ctx.data::<RequestContext>()?;
    Ok((services.as_ref(), request))
}
