use super::load_org;
use crate::database::{Collection, Page};
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::require_org_role;
use crate::database::Collections;
use crate::models::{
    create_db_tag, create_db_tag_group, create_gql_tag, create_gql_tag_group, non_blank, DbTag,
    RoleType, Tag, TagCategory, TagGroup, TagInput, TagResponse, VoidResponse,
};
use crate::services::Services;
use crate::utils::error::AppError;
use mongodb::bson::{self, doc};

async fn org_tags(services: &Services, org_id: &str) -> Result<Vec<DbTag>, AppError> {
    services
        .collections
        .tags
        .items(doc! { "org_id": org_id }, Page::default())
        .await
}

/// Adds tags to their category's group, creating the group on first use.
/// Returns whether a group was created.
pub(crate) async fn file_in_group(
    collections: &Collections,
    org_id: &str,
    category: TagCategory,
    tag_ids: &[String],
) -> Result<bool, AppError> {
    let group = doc! { "org_id": org_id, "category": bson::to_bson(&category)? };
    let additions = doc! { "$addToSet": { "tags": { "$each": tag_ids.to_vec() } } };
    let matched = collections.tag_groups.update_items(group, additions, Vec::new()).await?;
    if matched > 0 {
        return Ok(false);
    }
    collections
        .tag_groups
        .insert_item(&create_db_tag_group(org_id, category, tag_ids.to_vec()))
        .await?;
    log::info!("🏷️  Created {} tag group for org {}", category.label(), org_id);
    Ok(true)
}

/// Labels are unique per org, compared case-insensitively.
fn label_taken(tags: &[DbTag], label: &str, except_id: Option<&str>) -> bool {
    let label = label.to_lowercase();
    tags.iter()
        .filter(|t| Some(t.id.as_str()) != except_id)
        .any(|t| t.label.to_lowercase() == label)
}

pub async fn create_new_tag(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    tag: TagInput,
) -> Result<TagResponse, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let Some(label) = non_blank(Some(tag.label.as_str())).map(str::to_string) else {
        return Ok(TagResponse::failed(services.t("createNewTag.labelRequired", &ctx.locale)));
    };
    if label_taken(&org_tags(services, org_id).await?, &label, None) {
        return Ok(TagResponse::failed(services.t_with(
            "createNewTag.labelExists",
            &ctx.locale,
            &[("label", label.as_str())],
        )));
    }

    load_org(services, org_id).await?;

    let new_tag = create_db_tag(tag, org_id);
    services.collections.tags.insert_item(&new_tag).await?;
    services
        .collections
        .organizations
        .update_by_id(org_id, doc! { "$addToSet": { "tags": new_tag.id.as_str() } })
        .await?;
    file_in_group(
        &services.collections,
        org_id,
        new_tag.category.unwrap_or_default(),
        &[new_tag.id.clone()],
    )
    .await?;

    Ok(TagResponse::success(
        services.t("createNewTag.success", &ctx.locale),
        create_gql_tag(&new_tag),
    ))
}

pub async fn update_tag(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    tag: TagInput,
) -> Result<TagResponse, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let not_found = || Ok(TagResponse::failed(services.t("tag.notFound", &ctx.locale)));
    let Some(label) = non_blank(Some(tag.label.as_str())).map(str::to_string) else {
        return Ok(TagResponse::failed(services.t("createNewTag.labelRequired", &ctx.locale)));
    };
    let Some(tag_id) = tag.id.clone() else {
        return not_found();
    };

    let tags = org_tags(services, org_id).await?;
    let Some(mut existing) = tags.iter().find(|t| t.id == tag_id).cloned() else {
        return not_found();
    };
    if label_taken(&tags, &label, Some(&tag_id)) {
        return Ok(TagResponse::failed(services.t_with(
            "createNewTag.labelExists",
            &ctx.locale,
            &[("label", label.as_str())],
        )));
    }

    let previous = existing.category;
    existing.label = label;
    existing.description = tag.description;
    if tag.category.is_some() {
        existing.category = tag.category;
    }
    services.collections.tags.update_item(&existing).await?;
    if existing.category != previous {
        let collections = &services.collections;
        let ungroup = doc! { "$pull": { "tags": existing.id.as_str() } };
        collections.tag_groups.update_items(doc! { "org_id": org_id }, ungroup, Vec::new()).await?;
        let category = existing.category.unwrap_or_default();
        file_in_group(collections, org_id, category, std::slice::from_ref(&existing.id)).await?;
    }
    Ok(TagResponse::success(
        services.t("updateTag.success", &ctx.locale),
        create_gql_tag(&existing),
    ))
}

/// Deletes the tag and strips it from the org's contacts, engagements and
/// tag list.
pub async fn delete_tag(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    tag_id: &str,
) -> Result<VoidResponse, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let collections = &services.collections;
    let found = collections.tags.item_by_id(tag_id).await?;
    if found.map_or(true, |t| t.org_id != org_id) {
        return Ok(VoidResponse::failed(services.t("tag.notFound", &ctx.locale)));
    }

    let tagged = doc! { "org_id": org_id, "tags": tag_id };
    let untag = doc! { "$pull": { "tags": tag_id } };
    let contacts = collections.contacts.update_items(tagged.clone(), untag.clone(), Vec::new()).await?;
    let engagements = collections.engagements.update_items(tagged, untag.clone(), Vec::new()).await?;
    collections.organizations.update_by_id(org_id, untag.clone()).await?;
    collections.tag_groups.update_items(doc! { "org_id": org_id }, untag, Vec::new()).await?;
    collections.tags.delete_item(tag_id).await?;

    log::info!(
        "🏷️  Deleted tag {} from org {} ({} contacts, {} engagements untagged)",
        tag_id,
        org_id,
        contacts,
        engagements
    );
    Ok(VoidResponse::success(services.t("deleteTag.success", &ctx.locale)))
}

pub async fn tags(services: &Services, ctx: &RequestContext, org_id: &str) -> Result<Vec<Tag>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found = org_tags(services, org_id).await?;
    found.sort_by_key(|t| t.label.to_lowercase());
    Ok(found.iter().map(create_gql_tag).collect())
}

pub async fn tag_groups(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
) -> Result<Vec<TagGroup>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found = services
        .collections
        .tag_groups
        .items(doc! { "org_id": org_id }, Page::default())
        .await?;
    found.sort_by_key(|g| g.label.to_lowercase());
    Ok(found.iter().map(create_gql_tag_group).collect())
}
