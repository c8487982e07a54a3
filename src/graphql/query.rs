use super::scope;
use crate::interactors::{contacts, engagements, organizations, service_forms, tags};
use crate::models::{
    Contact, Engagement, EngagementExportRow, Organization, Service, ServiceAnswer, Tag, TagGroup,
    User,
};
use crate::utils::error::GraphqlResult;
use async_graphql::{Context, Object, Result, ID};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn contact(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Contact>> {
        let (services, request) = scope(ctx)?;
        contacts::contact(services, request, &id).await.graphql()
    }

    /// `query` matches first or last name, case-insensitively.
    async fn contacts(
        &self,
        ctx: &Context<'_>,
        org_id: String,
        offset: Option<i64>,
        limit: Option<i64>,
        query: Option<String>,
    ) -> Result<Vec<Contact>> {
        let (services, request) = scope(ctx)?;
        contacts::contacts(services, request, &org_id, offset, limit, query.as_deref()).await.graphql()
    }

    async fn engagement(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Engagement>> {
        let (services, request) = scope(ctx)?;
        engagements::engagement(services, request, &id).await.graphql()
    }

    async fn active_engagements(
        &self,
        ctx: &Context<'_>,
        org_id: String,
        user_id: Option<String>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Engagement>> {
        let (services, request) = scope(ctx)?;
        engagements::active_engagements(
            services,
            request,
            &org_id,
            user_id.as_deref(),
            offset,
            limit,
        )
        .await
        .graphql()
    }

    async fn inactive_engagements(
        &self,
        ctx: &Context<'_>,
        org_id: String,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Engagement>> {
        let (services, request) = scope(ctx)?;
        engagements::inactive_engagements(services, request, &org_id, offset, limit).await.graphql()
    }

    async fn all_engagements(
        &self,
        ctx: &Context<'_>,
        org_id: String,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Engagement>> {
        let (services, request) = scope(ctx)?;
        engagements::all_engagements(services, request, &org_id, offset, limit).await.graphql()
    }

    async fn export_data(&self, ctx: &Context<'_>, org_id: String) -> Result<Vec<EngagementExportRow>> {
        let (services, request) = scope(ctx)?;
        engagements::export_data(services, request, &org_id).await.graphql()
    }

    async fn tags(&self, ctx: &Context<'_>, org_id: String) -> Result<Vec<Tag>> {
        let (services, request) = scope(ctx)?;
        tags::tags(services, request, &org_id).await.graphql()
    }

    /// The org's tags grouped by category.
    async fn tag_groups(&self, ctx: &Context<'_>, org_id: String) -> Result<Vec<TagGroup>> {
        let (services, request) = scope(ctx)?;
        tags::tag_groups(services, request, &org_id).await.graphql()
    }

    async fn services(&self, ctx: &Context<'_>, org_id: String) -> Result<Vec<Service>> {
        let (services, request) = scope(ctx)?;
        service_forms::services_for_org(services, request, &org_id).await.graphql()
    }

    async fn service_answers(&self, ctx: &Context<'_>, service_id: String) -> Result<Vec<ServiceAnswer>> {
        let (services, request) = scope(ctx)?;
        service_forms::service_answers(services, request, &service_id).await.graphql()
    }

    async fn organization(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Organization>> {
        let (services, request) = scope(ctx)?;
        organizations::organization(services, request, &id).await.graphql()
    }

    async fn organizations(&self, ctx: &Context<'_>) -> Result<Vec<Organization>> {
        let (services, request) = scope(ctx)?;
        organizations::organizations(services, request).await.graphql()
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<User>> {
        let (services, request) = scope(ctx)?;
        organizations::user(services, request, &id).await.graphql()
    }

    async fn users(&self, ctx: &Context<'_>, org_id: String) -> Result<Vec<User>> {
        let (services, request) = scope(ctx)?;
        organizations::users(services, request, &org_id).await.graphql()
    }

    async fn current_user(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let (services, request) = scope(ctx)?;
        organizations::current_user(services, request).await.graphql()
    }
}
