use crate::database::{Collection, Collections, Page};
use crate::interactors::tags::file_in_group;
use crate::models::{DbService, TagCategory};
use crate::utils::error::AppError;
use mongodb::bson::{self, doc, Bson};
use std::collections::BTreeMap;

/// Field type keys written before the enum was renamed.
const LEGACY_FIELD_TYPES: [&str; 6] =
    ["singleText", "multilineText", "number", "date", "singleChoice", "multiChoice"];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub tags_categorised: usize,
    pub tag_groups_created: usize,
    pub services_migrated: usize,
}

/// Startup migrations. Each step only touches documents still in the old
/// shape, so running them again is a no-op.
pub async fn run(collections: &Collections) -> Result<SeedReport, AppError> {
    let report = SeedReport {
        tags_categorised: seed_default_tags(collections).await?,
        tag_groups_created: seed_tag_groups(collections).await?,
        services_migrated: migrate_service_field_types(collections).await?,
    };
    if report == SeedReport::default() {
        log::info!("🌱 Seeds: nothing to migrate");
    } else {
        log::info!(
            "🌱 Seeds: {} tags categorised, {} tag groups created, {} services migrated",
            report.tags_categorised,
            report.tag_groups_created,
            report.services_migrated
        );
    }
    Ok(report)
}

/// Gives every tag without a category the `OTHER` category.
pub async fn seed_default_tags(collections: &Collections) -> Result<usize, AppError> {
    let category = bson::to_bson(&TagCategory::default())?;
    let uncategorised = doc! { "category": Bson::Null };
    let updated = collections
        .tags
        .update_items(uncategorised, doc! { "$set": { "category": category } }, Vec::new())
        .await?;
    Ok(updated as usize)
}

/// Files every tag in its org's group for the tag's category. Groups are
/// created on first sight and only ever gain missing tag ids.
pub async fn seed_tag_groups(collections: &Collections) -> Result<usize, AppError> {
    let mut grouped: BTreeMap<(String, String), (TagCategory, Vec<String>)> = BTreeMap::new();
    for tag in collections.tags.items(doc! {}, Page::default()).await? {
        let category = tag.category.unwrap_or_default();
        grouped
            .entry((tag.org_id, category.label().to_string()))
            .or_insert_with(|| (category, Vec::new()))
            .1
            .push(tag.id);
    }

    let mut created = 0;
    for ((org_id, _), (category, tag_ids)) in &grouped {
        if file_in_group(collections, org_id, *category, tag_ids).await? {
            created += 1;
        }
    }
    Ok(created)
}

/// Re-saves services whose fields still carry legacy type keys. The typed
/// model reads the old keys and writes the current ones back.
pub async fn migrate_service_field_types(collections: &Collections) -> Result<usize, AppError> {
    let legacy: Vec<DbService> = collections
        .services
        .items(doc! { "fields.type": { "$in": LEGACY_FIELD_TYPES.to_vec() } }, Page::default())
        .await?;

    for service in &legacy {
        log::debug!("   🔁 Migrating field types of service {}", service.id);
        collections.services.update_item(service).await?;
    }
    Ok(legacy.len())
}
