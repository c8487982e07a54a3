use crate::database::{Collection, Page};
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::{require_auth, require_org_role};
use crate::models::{create_gql_organization, create_gql_user, Organization, RoleType, User};
use crate::services::Services;
use crate::utils::error::AppError;
use mongodb::bson::doc;

pub async fn organization(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
) -> Result<Option<Organization>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let found = services.collections.organizations.item_by_id(org_id).await?;
    Ok(found.as_ref().map(create_gql_organization))
}

/// Organizations the caller belongs to.
pub async fn organizations(services: &Services, ctx: &RequestContext) -> Result<Vec<Organization>, AppError> {
    let identity = require_auth(ctx)?;
    let org_ids = identity.user.org_ids();
    if org_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut found = services
        .collections
        .organizations
        .items(doc! { "id": { "$in": org_ids } }, Page::default())
        .await?;
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found.iter().map(create_gql_organization).collect())
}

/// A user is visible to themselves and to members of any shared org.
pub async fn user(services: &Services, ctx: &RequestContext, user_id: &str) -> Result<Option<User>, AppError> {
    let identity = require_auth(ctx)?;
    let Some(found) = services.collections.users.item_by_id(user_id).await? else {
        return Ok(None);
    };
    let shares_org = found
        .org_ids()
        .iter()
        .any(|org_id| identity.user.role_in(org_id).is_some());
    if found.id != identity.id() && !shares_org {
        return Err(AppError::Forbidden(format!("user {} is not in your organizations", user_id)));
    }
    Ok(Some(create_gql_user(&found)))
}

pub async fn users(services: &Services, ctx: &RequestContext, org_id: &str) -> Result<Vec<User>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found = services
        .collections
        .users
        .items(doc! { "roles.org_id": org_id }, Page::default())
        .await?;
    found.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
            .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
    });
    Ok(found.iter().map(create_gql_user).collect())
}

/// The caller as currently stored, so mentions and roles are fresh.
pub async fn current_user(services: &Services, ctx: &RequestContext) -> Result<Option<User>, AppError> {
    let identity = require_auth(ctx)?;
    let found = services.collections.users.item_by_id(identity.id()).await?;
    Ok(found.as_ref().map(create_gql_user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactors::testing::Harness;

    #[tokio::test]
    async fn members_see_their_orgs_only() {
        let h = Harness::seeded().await;
        h.add_org("org2", &["other"]).await;
        let ctx = h.ctx("u1").await;

        let orgs = organizations(&h.services, &ctx).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, "org1");

        assert!(organization(&h.services, &ctx, "org1").await.unwrap().is_some());
        assert!(matches!(
            organization(&h.services, &ctx, "org2").await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn user_lookup_respects_org_boundaries() {
        let h = Harness::seeded().await;
        h.add_user("other", "org2", RoleType::User).await;
        let ctx = h.ctx("u1").await;

        assert_eq!(user(&h.services, &ctx, "admin").await.unwrap().unwrap().id, "admin");
        assert!(user(&h.services, &ctx, "ghost").await.unwrap().is_none());
        assert!(matches!(user(&h.services, &ctx, "other").await, Err(AppError::Forbidden(_))));

        let roster = users(&h.services, &ctx, "org1").await.unwrap();
        let ids: Vec<&str> = roster.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["admin", "u1"]);
    }

    #[tokio::test]
    async fn current_user_requires_sign_in() {
        let h = Harness::seeded().await;
        let anonymous = RequestContext::anonymous("en-US");
        assert!(matches!(
            current_user(&h.services, &anonymous).await,
            Err(AppError::Authentication(_))
        ));
        let me = current_user(&h.services, &h.ctx("u1").await).await.unwrap().unwrap();
        assert_eq!(me.user_name, "user-u1");
    }
}
