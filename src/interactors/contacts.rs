use super::{load_org, paginate};
use crate::database::{Collection, Page};
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::{require_auth, require_org_role};
use crate::models::{
    create_db_contact, create_gql_contact, non_blank, Contact, ContactInput, ContactResponse,
    ContactStatus, DbAddress, DbDemographics, RoleType,
};
use crate::services::Services;
use crate::utils::error::AppError;
use crate::utils::text::escape_regex_string;
use mongodb::bson::{doc, Document};

pub async fn create_contact(
    services: &Services,
    ctx: &RequestContext,
    contact: ContactInput,
) -> Result<ContactResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(org_id) = non_blank(contact.org_id.as_deref()).map(str::to_string) else {
        return Ok(ContactResponse::failed(services.t("createContact.orgIdRequired", &ctx.locale)));
    };
    require_org_role(ctx, &org_id, RoleType::User)?;

    load_org(services, &org_id).await?;

    let new_contact = create_db_contact(contact, &org_id);
    services.collections.contacts.insert_item(&new_contact).await?;
    services
        .collections
        .organizations
        .update_by_id(&org_id, doc! { "$addToSet": { "contacts": new_contact.id.as_str() } })
        .await?;

    services.telemetry.track_event(
        "createContact",
        &[("orgId", org_id.as_str()), ("userId", identity.id())],
    );
    Ok(ContactResponse::success(
        services.t("createContact.success", &ctx.locale),
        create_gql_contact(&new_contact),
    ))
}

pub async fn update_contact(
    services: &Services,
    ctx: &RequestContext,
    contact: ContactInput,
) -> Result<ContactResponse, AppError> {
    require_auth(ctx)?;
    let not_found = || Ok(ContactResponse::failed(services.t("contact.notFound", &ctx.locale)));
    let Some(contact_id) = contact.id.clone() else {
        return not_found();
    };
    let Some(mut existing) = services.collections.contacts.item_by_id(&contact_id).await? else {
        return not_found();
    };
    require_org_role(ctx, &existing.org_id, RoleType::User)?;

    existing.first_name = contact.first;
    existing.middle_name = contact.middle;
    existing.last_name = contact.last;
    existing.email = contact.email;
    existing.phone = contact.phone;
    existing.date_of_birth = contact.date_of_birth;
    existing.address = contact.address.map(DbAddress::from);
    existing.notes = contact.notes;
    if let Some(tags) = contact.tags {
        existing.tags = tags;
    }
    if let Some(demographics) = contact.demographics {
        existing.demographics = DbDemographics::from(demographics);
    }
    services.collections.contacts.update_item(&existing).await?;

    Ok(ContactResponse::success(
        services.t("updateContact.success", &ctx.locale),
        create_gql_contact(&existing),
    ))
}

async fn set_contact_status(
    services: &Services,
    ctx: &RequestContext,
    contact_id: &str,
    status: ContactStatus,
    success_key: &str,
) -> Result<ContactResponse, AppError> {
    require_auth(ctx)?;
    let Some(mut contact) = services.collections.contacts.item_by_id(contact_id).await? else {
        return Ok(ContactResponse::failed(services.t("contact.notFound", &ctx.locale)));
    };
    require_org_role(ctx, &contact.org_id, RoleType::User)?;

    if contact.status != status {
        contact.status = status;
        services.collections.contacts.update_item(&contact).await?;
    }
    Ok(ContactResponse::success(services.t(success_key, &ctx.locale), create_gql_contact(&contact)))
}

pub async fn archive_contact(
    services: &Services,
    ctx: &RequestContext,
    contact_id: &str,
) -> Result<ContactResponse, AppError> {
    set_contact_status(services, ctx, contact_id, ContactStatus::Archived, "archiveContact.success").await
}

pub async fn restore_contact(
    services: &Services,
    ctx: &RequestContext,
    contact_id: &str,
) -> Result<ContactResponse, AppError> {
    set_contact_status(services, ctx, contact_id, ContactStatus::Active, "restoreContact.success").await
}

pub async fn contact(
    services: &Services,
    ctx: &RequestContext,
    contact_id: &str,
) -> Result<Option<Contact>, AppError> {
    require_auth(ctx)?;
    let Some(found) = services.collections.contacts.item_by_id(contact_id).await? else {
        return Ok(None);
    };
    require_org_role(ctx, &found.org_id, RoleType::User)?;
    Ok(Some(create_gql_contact(&found)))
}

/// Case-insensitive match on first or last name. The query is escaped, so
/// it is matched literally.
fn name_filter(org_id: &str, query: Option<&str>) -> Document {
    let mut filter = doc! { "org_id": org_id };
    if let Some(query) = non_blank(query) {
        let pattern = escape_regex_string(query);
        filter.insert(
            "$or",
            vec![
                doc! { "first_name": { "$regex": pattern.as_str(), "$options": "i" } },
                doc! { "last_name": { "$regex": pattern.as_str(), "$options": "i" } },
            ],
        );
    }
    filter
}

pub async fn contacts(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
    offset: Option<i64>,
    limit: Option<i64>,
    query: Option<&str>,
) -> Result<Vec<Contact>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found = services
        .collections
        .contacts
        .items(name_filter(org_id, query), Page::default())
        .await?;
    found.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
            .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
    });
    Ok(paginate(found, Page::new(offset, limit))
        .iter()
        .map(create_gql_contact)
        .collect())
}
