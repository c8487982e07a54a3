use super::{load_org, paginate};
use crate::database::{Collection, Page};
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::{require_auth, require_org_role};
use crate::models::{
    create_db_action, create_db_engagement, create_gql_engagement, create_gql_mention, non_blank,
    ActionInput, ActionType, DbAction, DbEngagement, DbMention, DbUser, Engagement,
    EngagementExportRow, EngagementInput, EngagementResponse, EngagementStatus, RoleType,
};
use crate::services::Services;
use crate::utils::dates::sort_by_date;
use crate::utils::error::AppError;
use mongodb::bson::{self, doc, Document};
use std::cmp::Ordering;
use std::collections::HashMap;

fn not_found(services: &Services, ctx: &RequestContext) -> EngagementResponse {
    EngagementResponse::failed(services.t("engagement.notFound", &ctx.locale))
}

/// Fans out the change to subscribers of the engagement's org.
fn publish(services: &Services, action: ActionType, message: &str, engagement: &DbEngagement) {
    let reached = services.publisher.publish_engagement(
        &engagement.org_id,
        action,
        message.to_string(),
        Some(create_gql_engagement(engagement)),
    );
    log::debug!("📣 {:?} {} reached {} subscribers", action, engagement.id, reached);
}

fn status_label(status: EngagementStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", status))
}

/// Pushes `action` and applies `fields` in a single operator update so
/// concurrent writers never overwrite each other's actions. Returns the
/// stored document, or `None` when it vanished in between.
async fn append_action(
    services: &Services,
    engagement_id: &str,
    action: &DbAction,
    fields: Document,
) -> Result<Option<DbEngagement>, AppError> {
    let mut update = doc! { "$push": { "actions": bson::to_bson(action)? } };
    if !fields.is_empty() {
        update.insert("$set", fields);
    }
    let engagements = &services.collections.engagements;
    if !engagements.update_by_id(engagement_id, update).await? {
        return Ok(None);
    }
    engagements.item_by_id(engagement_id).await
}

async fn org_member(
    services: &Services,
    user_id: &str,
    org_id: &str,
) -> Result<Option<DbUser>, AppError> {
    let user = services.collections.users.item_by_id(user_id).await?;
    Ok(user.filter(|u| u.role_in(org_id).is_some()))
}

pub async fn create_engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement: EngagementInput,
) -> Result<EngagementResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(org_id) = non_blank(engagement.org_id.as_deref()).map(str::to_string) else {
        return Ok(EngagementResponse::failed(services.t("createEngagement.orgIdRequired", &ctx.locale)));
    };
    let Some(title) = non_blank(engagement.title.as_deref()).map(str::to_string) else {
        return Ok(EngagementResponse::failed(services.t("createEngagement.titleRequired", &ctx.locale)));
    };
    require_org_role(ctx, &org_id, RoleType::User)?;

    let assignee = match non_blank(engagement.user_id.as_deref()) {
        Some(user_id) => match org_member(services, user_id, &org_id).await? {
            Some(user) => Some(user),
            None => {
                return Ok(EngagementResponse::failed(
                    services.t("assignEngagement.userNotFound", &ctx.locale),
                ))
            }
        },
        None => None,
    };

    let mut new_engagement = create_db_engagement(engagement, &org_id, &title);
    new_engagement.push_action(identity.id(), services.t("engagement.createdAction", &ctx.locale));
    services.collections.engagements.insert_item(&new_engagement).await?;

    if let Some(assignee) = assignee.filter(|a| a.id != identity.id()) {
        services
            .notifications
            .assigned_engagement(&assignee, &new_engagement, &ctx.locale)
            .await;
    }
    let message = services.t("createEngagement.success", &ctx.locale);
    publish(services, ActionType::Created, &message, &new_engagement);
    services.telemetry.track_event(
        "createEngagement",
        &[("orgId", org_id.as_str()), ("engagementId", new_engagement.id.as_str())],
    );
    Ok(EngagementResponse::success(message, create_gql_engagement(&new_engagement)))
}

pub async fn update_engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement: EngagementInput,
) -> Result<EngagementResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(engagement_id) = non_blank(engagement.engagement_id.as_deref()).map(str::to_string) else {
        return Ok(not_found(services, ctx));
    };
    let Some(existing) = services.collections.engagements.item_by_id(&engagement_id).await? else {
        return Ok(not_found(services, ctx));
    };
    require_org_role(ctx, &existing.org_id, RoleType::User)?;

    let mut fields = Document::new();
    if let Some(title) = non_blank(engagement.title.as_deref()) {
        fields.insert("title", title);
    }
    if let Some(description) = engagement.description {
        fields.insert("description", description);
    }
    if let Some(end_date) = engagement.end_date {
        fields.insert("end_date", end_date);
    }
    if let Some(contacts) = engagement.contacts {
        fields.insert("contacts", contacts);
    }
    if let Some(tags) = engagement.tags {
        fields.insert("tags", tags);
    }
    let action = create_db_action(
        identity.id(),
        &existing.org_id,
        services.t("engagement.updatedAction", &ctx.locale),
        None,
    );
    let Some(existing) = append_action(services, &engagement_id, &action, fields).await? else {
        return Ok(not_found(services, ctx));
    };

    let message = services.t("updateEngagement.success", &ctx.locale);
    publish(services, ActionType::Updated, &message, &existing);
    Ok(EngagementResponse::success(message, create_gql_engagement(&existing)))
}

pub async fn assign_engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
    user_id: &str,
) -> Result<EngagementResponse, AppError> {
    let identity = require_auth(ctx)?;
    let (engagement, assignee) = futures::join!(
        services.collections.engagements.item_by_id(engagement_id),
        services.collections.users.item_by_id(user_id),
    );
    let Some(engagement) = engagement? else {
        return Ok(not_found(services, ctx));
    };
    require_org_role(ctx, &engagement.org_id, RoleType::User)?;
    let Some(assignee) = assignee?.filter(|u| u.role_in(&engagement.org_id).is_some()) else {
        return Ok(EngagementResponse::failed(services.t("assignEngagement.userNotFound", &ctx.locale)));
    };

    let actor_name = identity.user.display_name();
    let self_assigned = assignee.id == identity.id();
    let comment = if self_assigned {
        services.t_with("assignEngagement.claimedAction", &ctx.locale, &[("user", actor_name.as_str())])
    } else {
        let assignee_name = assignee.display_name();
        services.t_with(
            "assignEngagement.assignedAction",
            &ctx.locale,
            &[("user", actor_name.as_str()), ("assignee", assignee_name.as_str())],
        )
    };

    let mut fields = doc! { "user_id": assignee.id.as_str() };
    if !engagement.status.is_inactive() {
        fields.insert("status", bson::to_bson(&EngagementStatus::Assigned)?);
    }
    let action = create_db_action(identity.id(), &engagement.org_id, comment, None);
    let Some(engagement) = append_action(services, engagement_id, &action, fields).await? else {
        return Ok(not_found(services, ctx));
    };

    if !self_assigned {
        services
            .notifications
            .assigned_engagement(&assignee, &engagement, &ctx.locale)
            .await;
    }
    let message = services.t("assignEngagement.success", &ctx.locale);
    let event = if self_assigned { ActionType::Claimed } else { ActionType::Assigned };
    publish(services, event, &message, &engagement);
    services.telemetry.track_event(
        "assignEngagement",
        &[("engagementId", engagement_id), ("userId", user_id)],
    );
    Ok(EngagementResponse::success(message, create_gql_engagement(&engagement)))
}

async fn transition(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
    status: EngagementStatus,
    comment: String,
    success_key: &str,
    action: ActionType,
) -> Result<EngagementResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(engagement) = services.collections.engagements.item_by_id(engagement_id).await? else {
        return Ok(not_found(services, ctx));
    };
    require_org_role(ctx, &engagement.org_id, RoleType::User)?;

    let fields = doc! { "status": bson::to_bson(&status)? };
    let entry = create_db_action(identity.id(), &engagement.org_id, comment, None);
    let Some(engagement) = append_action(services, engagement_id, &entry, fields).await? else {
        return Ok(not_found(services, ctx));
    };

    let message = services.t(success_key, &ctx.locale);
    publish(services, action, &message, &engagement);
    Ok(EngagementResponse::success(message, create_gql_engagement(&engagement)))
}

pub async fn complete_engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
) -> Result<EngagementResponse, AppError> {
    let comment = services.t("engagement.completedAction", &ctx.locale);
    transition(
        services,
        ctx,
        engagement_id,
        EngagementStatus::Completed,
        comment,
        "completeEngagement.success",
        ActionType::Completed,
    )
    .await
}

pub async fn close_engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
) -> Result<EngagementResponse, AppError> {
    let comment = services.t("engagement.closedAction", &ctx.locale);
    transition(
        services,
        ctx,
        engagement_id,
        EngagementStatus::Closed,
        comment,
        "closeEngagement.success",
        ActionType::Closed,
    )
    .await
}

pub async fn set_engagement_status(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
    status: EngagementStatus,
) -> Result<EngagementResponse, AppError> {
    let label = status_label(status);
    let comment = services.t_with("engagement.statusAction", &ctx.locale, &[("status", label.as_str())]);
    let action = match status {
        EngagementStatus::Completed => ActionType::Completed,
        EngagementStatus::Closed => ActionType::Closed,
        _ => ActionType::Updated,
    };
    transition(services, ctx, engagement_id, status, comment, "setEngagementStatus.success", action).await
}

pub async fn add_engagement_action(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
    action: ActionInput,
) -> Result<EngagementResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(comment) = non_blank(Some(action.comment.as_str())).map(str::to_string) else {
        return Ok(EngagementResponse::failed(services.t("addEngagementAction.commentRequired", &ctx.locale)));
    };
    let Some(engagement) = services.collections.engagements.item_by_id(engagement_id).await? else {
        return Ok(not_found(services, ctx));
    };
    require_org_role(ctx, &engagement.org_id, RoleType::User)?;

    let tagged = match non_blank(action.tagged_user_id.as_deref()) {
        Some(user_id) => match org_member(services, user_id, &engagement.org_id).await? {
            Some(user) => Some(user),
            None => {
                return Ok(EngagementResponse::failed(
                    services.t("addEngagementAction.taggedUserNotFound", &ctx.locale),
                ))
            }
        },
        None => None,
    };

    let mut new_action = create_db_action(
        identity.id(),
        &engagement.org_id,
        comment.clone(),
        tagged.as_ref().map(|u| u.id.clone()),
    );
    new_action.tags = action.tags.unwrap_or_default();
    let created_at = new_action.date.clone();
    let Some(engagement) = append_action(services, engagement_id, &new_action, Document::new()).await? else {
        return Ok(not_found(services, ctx));
    };

    if let Some(tagged) = tagged {
        let mention = DbMention {
            engagement_id: engagement.id.clone(),
            created_at,
            created_by: identity.id().to_string(),
            message: Some(comment),
            seen: false,
            dismissed: false,
        };
        services
            .collections
            .users
            .update_by_id(&tagged.id, doc! { "$push": { "mentions": bson::to_bson(&mention)? } })
            .await?;

        services
            .notifications
            .mentioned(&tagged, &identity.user, &engagement, &ctx.locale)
            .await;
        let now = chrono::Utc::now().naive_utc();
        services.publisher.publish_mention(
            &tagged.id,
            ActionType::Created,
            engagement.title.clone(),
            Some(create_gql_mention(&mention, now)),
        );
    }

    let message = services.t("addEngagementAction.success", &ctx.locale);
    publish(services, ActionType::Updated, &message, &engagement);
    Ok(EngagementResponse::success(message, create_gql_engagement(&engagement)))
}

pub async fn engagement(
    services: &Services,
    ctx: &RequestContext,
    engagement_id: &str,
) -> Result<Option<Engagement>, AppError> {
    require_auth(ctx)?;
    let Some(found) = services.collections.engagements.item_by_id(engagement_id).await? else {
        return Ok(None);
    };
    require_org_role(ctx, &found.org_id, RoleType::User)?;
    Ok(Some(create_gql_engagement(&found)))
}

fn by_last_activity(a: &DbEngagement, b: &DbEngagement) -> Ordering {
    sort_by_date(Some(a.last_activity()), Some(b.last_activity()))
}

/// Loads the org's engagements, keeps those matching `predicate` and
/// orders them with `comparator` before paging.
pub async fn get_engagements<P, C>(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    page: Page,
    predicate: P,
    comparator: C,
) -> Result<Vec<Engagement>, AppError>
where
    P: Fn(&DbEngagement) -> bool,
    C: Fn(&DbEngagement, &DbEngagement) -> Ordering,
{
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found: Vec<DbEngagement> = services
        .collections
        .engagements
        .items(doc! { "org_id": org_id }, Page::default())
        .await?
        .into_iter()
        .filter(|e| predicate(e))
        .collect();
    found.sort_by(|a, b| comparator(a, b));
    Ok(paginate(found, page).iter().map(create_gql_engagement).collect())
}

/// Open work, the given user's (default: the caller's) first, then most
/// recently active.
pub async fn active_engagements(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    user_id: Option<&str>,
    offset: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Engagement>, AppError> {
    let identity = require_auth(ctx)?;
    let owner = user_id.unwrap_or(identity.id()).to_string();
    let is_owned = |e: &DbEngagement| e.user_id.as_deref() == Some(owner.as_str());
    get_engagements(
        services,
        ctx,
        org_id,
        Page::new(offset, limit),
        |e| !e.status.is_inactive(),
        |a, b| is_owned(b).cmp(&is_owned(a)).then_with(|| by_last_activity(a, b)),
    )
    .await
}

pub async fn inactive_engagements(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    offset: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Engagement>, AppError> {
    get_engagements(
        services,
        ctx,
        org_id,
        Page::new(offset, limit),
        |e| e.status.is_inactive(),
        by_last_activity,
    )
    .await
}

pub async fn all_engagements(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    offset: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Engagement>, AppError> {
    get_engagements(services, ctx, org_id, Page::new(offset, limit), |_| true, by_last_activity).await
}

/// Engagements that list the contact, most recently active first.
pub async fn contact_engagements(
    services: &Services,
    ctx: &RequestContext,
    contact_id: &str,
    offset: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Engagement>, AppError> {
    require_auth(ctx)?;
    let Some(contact) = services.collections.contacts.item_by_id(contact_id).await? else {
        return Ok(Vec::new());
    };
    require_org_role(ctx, &contact.org_id, RoleType::User)?;
    let mut found = services
        .collections
        .engagements
        .items(doc! { "org_id": contact.org_id.as_str(), "contacts": contact_id }, Page::default())
        .await?;
    found.sort_by(by_last_activity);
    Ok(paginate(found, Page::new(offset, limit)).iter().map(create_gql_engagement).collect())
}

/// Every engagement of the org, flattened with contact and assignee names.
pub async fn export_data(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
) -> Result<Vec<EngagementExportRow>, AppError> {
    require_org_role(ctx, org_id, RoleType::Admin)?;
    load_org(services, org_id).await?;

    let collections = &services.collections;
    let (engagements, contacts, users) = futures::join!(
        collections.engagements.items(doc! { "org_id": org_id }, Page::default()),
        collections.contacts.items(doc! { "org_id": org_id }, Page::default()),
        collections.users.items(doc! { "roles.org_id": org_id }, Page::default()),
    );
    let contact_names: HashMap<String, String> = contacts?
        .into_iter()
        .map(|c| (c.id, format!("{} {}", c.first_name, c.last_name)))
        .collect();
    let user_names: HashMap<String, String> =
        users?.into_iter().map(|u| (u.id.clone(), u.display_name())).collect();

    let mut engagements = engagements?;
    engagements.sort_by(|a, b| sort_by_date(Some(&a.start_date), Some(&b.start_date)));

    let rows = engagements
        .into_iter()
        .map(|e| EngagementExportRow {
            assignee: e
                .user_id
                .as_ref()
                .map(|id| user_names.get(id).cloned().unwrap_or_else(|| id.clone())),
            contact_names: e
                .contacts
                .iter()
                .filter_map(|id| contact_names.get(id).cloned())
                .collect(),
            action_count: e.actions.len() as i32,
            engagement_id: e.id,
            title: e.title,
            status: e.status,
            start_date: e.start_date,
            end_date: e.end_date,
            tags: e.tags,
        })
        .collect::<Vec<_>>();

    services
        .telemetry
        .track_event("exportData", &[("orgId", org_id), ("rows", rows.len().to_string().as_str())]);
    Ok(rows)
}
