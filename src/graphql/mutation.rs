use super::scope;
use crate::interactors::{contacts, engagements, service_forms, tags, users};
use crate::models::{
    ActionInput, AuthenticationResponse, ContactInput, ContactResponse, EngagementInput,
    EngagementResponse, EngagementStatus, MentionInput, MoveDirection, ServiceAnswerInput,
    ServiceAnswerResponse, ServiceInput, ServiceResponse, TagInput, TagResponse, UserFcmInput,
    UserInput, UserResponse, VoidResponse,
};
use crate::utils::error::GraphqlResult;
use async_graphql::{Context, Object, Result, ID};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn authenticate(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<AuthenticationResponse> {
        let (services, request) = scope(ctx)?;
        users::authenticate(services, request, &username, &password).await.graphql()
    }

    async fn create_new_user(&self, ctx: &Context<'_>, user: UserInput) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::create_new_user(services, request, user).await.graphql()
    }

    async fn update_user(&self, ctx: &Context<'_>, user: UserInput) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::update_user(services, request, user).await.graphql()
    }

    async fn update_user_fcm_token(&self, ctx: &Context<'_>, user: UserFcmInput) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::update_user_fcm_token(services, request, user).await.graphql()
    }

    async fn set_user_password(
        &self,
        ctx: &Context<'_>,
        old_password: String,
        new_password: String,
    ) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::set_user_password(services, request, &old_password, &new_password).await.graphql()
    }

    async fn initiate_password_reset(&self, ctx: &Context<'_>, email: String) -> Result<VoidResponse> {
        let (services, request) = scope(ctx)?;
        users::initiate_password_reset(services, request, &email).await.graphql()
    }

    async fn execute_password_reset(
        &self,
        ctx: &Context<'_>,
        email: String,
        reset_token: String,
        password: String,
    ) -> Result<VoidResponse> {
        let (services, request) = scope(ctx)?;
        users::execute_password_reset(services, request, &email, &reset_token, &password).await.graphql()
    }

    async fn delete_user(&self, ctx: &Context<'_>, user_id: ID) -> Result<VoidResponse> {
        let (services, request) = scope(ctx)?;
        users::delete_user(services, request, &user_id).await.graphql()
    }

    async fn remove_user_from_organization(
        &self,
        ctx: &Context<'_>,
        user_id: ID,
        org_id: String,
    ) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::remove_user_from_organization(services, request, &user_id, &org_id).await.graphql()
    }

    async fn mark_mention_seen(&self, ctx: &Context<'_>, mention: MentionInput) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::mark_mention_seen(services, request, mention).await.graphql()
    }

    async fn mark_mention_dismissed(&self, ctx: &Context<'_>, mention: MentionInput) -> Result<UserResponse> {
        let (services, request) = scope(ctx)?;
        users::mark_mention_dismissed(services, request, mention).await.graphql()
    }

    async fn create_contact(&self, ctx: &Context<'_>, contact: ContactInput) -> Result<ContactResponse> {
        let (services, request) = scope(ctx)?;
        contacts::create_contact(services, request, contact).await.graphql()
    }

    async fn update_contact(&self, ctx: &Context<'_>, contact: ContactInput) -> Result<ContactResponse> {
        let (services, request) = scope(ctx)?;
        contacts::update_contact(services, request, contact).await.graphql()
    }

    async fn archive_contact(&self, ctx: &Context<'_>, contact_id: ID) -> Result<ContactResponse> {
        let (services, request) = scope(ctx)?;
        contacts::archive_contact(services, request, &contact_id).await.graphql()
    }

    async fn restore_contact(&self, ctx: &Context<'_>, contact_id: ID) -> Result<ContactResponse> {
        let (services, request) = scope(ctx)?;
        contacts::restore_contact(services, request, &contact_id).await.graphql()
    }

    async fn create_engagement(
        &self,
        ctx: &Context<'_>,
        engagement: EngagementInput,
    ) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::create_engagement(services, request, engagement).await.graphql()
    }

    async fn update_engagement(
        &self,
        ctx: &Context<'_>,
        engagement: EngagementInput,
    ) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::update_engagement(services, request, engagement).await.graphql()
    }

    async fn assign_engagement(
        &self,
        ctx: &Context<'_>,
        engagement_id: ID,
        user_id: ID,
    ) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::assign_engagement(services, request, &engagement_id, &user_id).await.graphql()
    }

    async fn complete_engagement(&self, ctx: &Context<'_>, engagement_id: ID) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::complete_engagement(services, request, &engagement_id).await.graphql()
    }

    async fn close_engagement(&self, ctx: &Context<'_>, engagement_id: ID) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::close_engagement(services, request, &engagement_id).await.graphql()
    }

    async fn set_engagement_status(
        &self,
        ctx: &Context<'_>,
        engagement_id: ID,
        status: EngagementStatus,
    ) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::set_engagement_status(services, request, &engagement_id, status).await.graphql()
    }

    async fn add_engagement_action(
        &self,
        ctx: &Context<'_>,
        engagement_id: ID,
        action: ActionInput,
    ) -> Result<EngagementResponse> {
        let (services, request) = scope(ctx)?;
        engagements::add_engagement_action(services, request, &engagement_id, action).await.graphql()
    }

    async fn create_new_tag(&self, ctx: &Context<'_>, org_id: String, tag: TagInput) -> Result<TagResponse> {
        let (services, request) = scope(ctx)?;
        tags::create_new_tag(services, request, &org_id, tag).await.graphql()
    }

    async fn update_tag(&self, ctx: &Context<'_>, org_id: String, tag: TagInput) -> Result<TagResponse> {
        let (services, request) = scope(ctx)?;
        tags::update_tag(services, request, &org_id, tag).await.graphql()
    }

    async fn delete_tag(&self, ctx: &Context<'_>, org_id: String, tag_id: ID) -> Result<VoidResponse> {
        let (services, request) = scope(ctx)?;
        tags::delete_tag(services, request, &org_id, &tag_id).await.graphql()
    }

    async fn create_service(&self, ctx: &Context<'_>, service: ServiceInput) -> Result<ServiceResponse> {
        let (services, request) = scope(ctx)?;
        service_forms::create_service(services, request, service).await.graphql()
    }

    async fn update_service(&self, ctx: &Context<'_>, service: ServiceInput) -> Result<ServiceResponse> {
        let (services, request) = scope(ctx)?;
        service_forms::update_service(services, request, service).await.graphql()
    }

    async fn move_service_field(
        &self,
        ctx: &Context<'_>,
        service_id: ID,
        field_id: String,
        direction: MoveDirection,
    ) -> Result<ServiceResponse> {
        let (services, request) = scope(ctx)?;
        service_forms::move_service_field(services, request, &service_id, &field_id, direction).await.graphql()
    }

    async fn create_service_answer(
        &self,
        ctx: &Context<'_>,
        service_answer: ServiceAnswerInput,
    ) -> Result<ServiceAnswerResponse> {
        let (services, request) = scope(ctx)?;
        service_forms::create_service_answer(services, request, service_answer).await.graphql()
    }

    async fn delete_service_answer(
        &self,
        ctx: &Context<'_>,
        service_id: ID,
        answer_id: ID,
    ) -> Result<VoidResponse> {
        let (services, request) = scope(ctx)?;
        service_forms::delete_service_answer(services, request, &service_id, &answer_id).await.graphql()
    }
}
