use super::scope;
use crate::middleware::directives::{require_org_role, require_self};
use crate::utils::error::GraphqlResult;
use crate::models::{EngagementSubscriptionEvent, MentionSubscriptionEvent, RoleType};
use async_graphql::{Context, Result, Subscription, ID};
use futures::Stream;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Mention changes for the signed-in user.
    async fn mentions(
        &self,
        ctx: &Context<'_>,
        user_id: ID,
    ) -> Result<impl Stream<Item = MentionSubscriptionEvent>> {
        let (services, request) = scope(ctx)?;
        require_self(request, &user_id).graphql()?;
        log::debug!("🔔 {} subscribed to mentions", user_id.as_str());
        Ok(services.publisher.subscribe_to_mentions(&user_id))
    }

    /// Engagement changes across an organization.
    async fn engagements(
        &self,
        ctx: &Context<'_>,
        org_id: String,
    ) -> Result<impl Stream<Item = EngagementSubscriptionEvent>> {
        let (services, request) = scope(ctx)?;
        require_org_role(request, &org_id, RoleType::User).graphql()?;
        log::debug!("🔔 Subscribed to engagements of {}", org_id);
        Ok(services.publisher.subscribe_to_engagements(&org_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::graphql::build_schema;
    use crate::interactors::testing::Harness;
    use crate::middleware::auth::RequestContext;
    use crate::models::ActionType;
    use async_graphql::Request;
    use futures::StreamExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn engagement_events_reach_org_subscribers() {
        let h = Harness::seeded().await;
        let schema = build_schema(Arc::new(h.services.clone()));
        let request = Request::new(r#"subscription { engagements(orgId: "org1") { action message } }"#)
            .data(h.ctx("u1").await);
        let mut stream = schema.execute_stream(request);

        // the resolver registers on first poll
        let publisher = h.services.publisher.clone();
        let next = tokio::spawn(async move { stream.next().await });
        while publisher.engagement_subscribers("org1") == 0 {
            tokio::task::yield_now().await;
        }
        publisher.publish_engagement("org1", ActionType::Closed, "closed".into(), None);

        let response = next.await.unwrap().unwrap();
        let data = response.data.into_json().unwrap();
        assert_eq!(data["engagements"]["action"], "CLOSED");
    }

    #[tokio::test]
    async fn mentions_of_someone_else_are_refused() {
        let h = Harness::seeded().await;
        let schema = build_schema(Arc::new(h.services.clone()));
        let request = Request::new(r#"subscription { mentions(userId: "admin") { message } }"#)
            .data(h.ctx("u1").await);
        let response = schema.execute_stream(request).next().await.unwrap();
        assert!(!response.errors.is_empty());

        let anonymous = Request::new(r#"subscription { mentions(userId: "u1") { message } }"#)
            .data(RequestContext::anonymous("en-US"));
        let response = schema.execute_stream(anonymous).next().await.unwrap();
        assert!(!response.errors.is_empty());
        assert_eq!(h.services.publisher.mention_subscribers("u1"), 0);
    }
}
