//! One async function per GraphQL operation. Each validates its input, runs
//! the authorization checks, performs the primary write and only then fans
//! out publish/notify/log side effects, which never undo the write.

pub mod cascade;
pub mod contacts;
pub mod engagements;
pub mod organizations;
pub mod service_forms;
pub mod tags;
pub mod users;

use crate::database::{Collection, Page};
use crate::models::DbOrganization;
use crate::services::Services;
use crate::utils::error::AppError;

/// Loads an organization or reports it missing.
pub(crate) async fn load_org(services: &Services, org_id: &str) -> Result<DbOrganization, AppError> {
    services
        .collections
        .organizations
        .item_by_id(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("organization {}", org_id)))
}

/// Applies offset/limit to an already sorted list.
pub(crate) fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    let found = items.into_iter().skip(page.offset as usize);
    match page.limit {
        Some(limit) => found.take(limit as usize).collect(),
        None => found.collect(),
    }
}
