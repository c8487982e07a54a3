use crate::database::{Collection, Page};
use crate::models::{create_gql_engagement, ActionType};
use crate::services::Services;
use crate::utils::error::AppError;
use mongodb::bson::{doc, Bson};
use std::collections::HashSet;

/// What a cascade run changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CascadeSummary {
    pub deleted_engagements: Vec<String>,
    pub updated_engagements: u64,
    pub removed_from_roster: bool,
    pub user_updated: bool,
    /// Users who lost mentions of engagements that no longer exist.
    pub mentions_cleared: u64,
}

/// Removes every reference to `user_id` inside `org_id`.
///
/// Steps run in an order that never leaves a reference to a missing
/// document, and each one is a no-op when already applied, so a run that
/// fails halfway converges when repeated.
pub async fn remove_user_references(
    services: &Services,
    org_id: &str,
    user_id: &str,
) -> Result<CascadeSummary, AppError> {
    let collections = &services.collections;
    let mut summary = CascadeSummary::default();

    // 1. engagements assigned to the user
    let assigned = collections
        .engagements
        .items(doc! { "org_id": org_id, "user_id": user_id }, Page::default())
        .await?;
    for engagement in assigned {
        if collections.engagements.delete_item(&engagement.id).await? {
            services.publisher.publish_engagement(
                org_id,
                ActionType::Deleted,
                engagement.title.clone(),
                Some(create_gql_engagement(&engagement)),
            );
            summary.deleted_engagements.push(engagement.id);
        }
    }

    // 2. actions the user wrote or was tagged in
    let touched = doc! {
        "org_id": org_id,
        "$or": [
            { "actions.user_id": user_id },
            { "actions.tagged_user_id": user_id },
        ],
    };
    summary.updated_engagements = collections.engagements.count(touched).await?;
    if summary.updated_engagements > 0 {
        collections
            .engagements
            .update_items(
                doc! { "org_id": org_id, "actions.user_id": user_id },
                doc! { "$pull": { "actions": { "user_id": user_id } } },
                Vec::new(),
            )
            .await?;
        collections
            .engagements
            .update_items(
                doc! { "org_id": org_id, "actions.tagged_user_id": user_id },
                doc! { "$set": { "actions.$[tagged].tagged_user_id": Bson::Null } },
                vec![doc! { "tagged.tagged_user_id": user_id }],
            )
            .await?;
    }

    // 3. org roster
    summary.removed_from_roster = collections
        .organizations
        .update_items(
            doc! { "id": org_id, "users": user_id },
            doc! { "$pull": { "users": user_id } },
            Vec::new(),
        )
        .await?
        > 0;

    // 4. the user's role in the org
    summary.user_updated = collections
        .users
        .update_items(
            doc! { "id": user_id, "roles.org_id": org_id },
            doc! { "$pull": { "roles": { "org_id": org_id } } },
            Vec::new(),
        )
        .await?
        > 0;

    // 5. mentions of engagements that no longer exist, for the user and
    //    everyone left in the org
    let holders = collections
        .users
        .items(
            doc! { "$or": [ { "id": user_id }, { "roles.org_id": org_id } ] },
            Page::default(),
        )
        .await?;
    let referenced: HashSet<String> = holders
        .iter()
        .flat_map(|u| u.mentions.iter().map(|m| m.engagement_id.clone()))
        .collect();
    if !referenced.is_empty() {
        let ids: Vec<String> = referenced.iter().cloned().collect();
        let existing: HashSet<String> = collections
            .engagements
            .items(doc! { "id": { "$in": ids } }, Page::default())
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        let missing: Vec<String> = referenced.difference(&existing).cloned().collect();
        if !missing.is_empty() {
            if holders
                .iter()
                .any(|u| u.id == user_id && u.mentions.iter().any(|m| missing.contains(&m.engagement_id)))
            {
                summary.user_updated = true;
            }
            summary.mentions_cleared = collections
                .users
                .update_items(
                    doc! { "mentions.engagement_id": { "$in": missing.clone() } },
                    doc! { "$pull": { "mentions": { "engagement_id": { "$in": missing } } } },
                    Vec::new(),
                )
                .await?;
        }
    }

    log::info!(
        "🧹 Removed user {} from org {}: {} engagements deleted, {} redacted, {} users' mentions cleared",
        user_id,
        org_id,
        summary.deleted_engagements.len(),
        summary.updated_engagements,
        summary.mentions_cleared
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactors::testing::Harness;
    use crate::models::engagement::fixtures::engagement;
    use crate::models::{DbAction, DbMention, DbRole, RoleType};

    fn action(user_id: &str, tagged: Option<&str>) -> DbAction {
        DbAction {
            user_id: user_id.into(),
            org_id: "org1".into(),
            date: "2021-01-02T00:00:00Z".into(),
            comment: "note".into(),
            tagged_user_id: tagged.map(str::to_string),
            tags: vec![],
        }
    }

    fn mention(engagement_id: &str) -> DbMention {
        DbMention {
            engagement_id: engagement_id.into(),
            created_at: "2021-01-02T00:00:00Z".into(),
            created_by: "admin".into(),
            message: None,
            seen: false,
            dismissed: false,
        }
    }

    async fn scenario() -> Harness {
        let h = Harness::seeded().await;
        // u1 also belongs to org2, which must stay untouched
        let mut u1 = h.user("u1").await.unwrap();
        u1.roles.push(DbRole { org_id: "org2".into(), role_type: RoleType::User });
        u1.mentions = vec![mention("e1"), mention("e2")];
        h.users.update_item(&u1).await.unwrap();
        let mut admin = h.user("admin").await.unwrap();
        admin.mentions = vec![mention("e1"), mention("e2")];
        h.users.update_item(&admin).await.unwrap();

        h.engagements.insert_item(&engagement("e1", "org1", Some("u1"))).await.unwrap();
        let mut e2 = engagement("e2", "org1", Some("admin"));
        e2.actions = vec![action("u1", None), action("admin", Some("u1")), action("admin", None)];
        h.engagements.insert_item(&e2).await.unwrap();
        h.engagements.insert_item(&engagement("e3", "org2", Some("u1"))).await.unwrap();
        h
    }

    #[tokio::test]
    async fn removes_every_reference_in_order() {
        let h = scenario().await;
        let mut events = Box::pin(h.services.publisher.subscribe_to_engagements("org1"));

        let summary = remove_user_references(&h.services, "org1", "u1").await.unwrap();
        assert_eq!(summary.deleted_engagements, vec!["e1".to_string()]);
        assert_eq!(summary.updated_engagements, 1);
        assert!(summary.removed_from_roster);

        use futures::StreamExt;
        let event = events.next().await.unwrap();
        assert_eq!(event.action, ActionType::Deleted);

        let e2 = h.engagements.item_by_id("e2").await.unwrap().unwrap();
        assert_eq!(e2.actions.len(), 2);
        assert!(e2.actions.iter().all(|a| a.user_id != "u1"));
        assert!(e2.actions.iter().all(|a| a.tagged_user_id.is_none()));

        // other orgs keep their data
        assert!(h.engagements.item_by_id("e3").await.unwrap().is_some());

        let org = h.organizations.item_by_id("org1").await.unwrap().unwrap();
        assert!(!org.users.contains(&"u1".to_string()));

        let u1 = h.user("u1").await.unwrap();
        assert_eq!(u1.org_ids(), vec!["org2".to_string()]);
        assert_eq!(u1.mentions.len(), 1);
        assert_eq!(u1.mentions[0].engagement_id, "e2");
        assert!(summary.user_updated);
    }

    #[tokio::test]
    async fn other_members_lose_mentions_of_deleted_engagements() {
        let h = scenario().await;
        let summary = remove_user_references(&h.services, "org1", "u1").await.unwrap();
        assert_eq!(summary.mentions_cleared, 2);

        let admin = h.user("admin").await.unwrap();
        let ids: Vec<_> = admin.mentions.iter().map(|m| m.engagement_id.as_str()).collect();
        assert_eq!(ids, vec!["e2"]);
    }

    #[tokio::test]
    async fn rerunning_is_a_noop() {
        let h = scenario().await;
        remove_user_references(&h.services, "org1", "u1").await.unwrap();
        let again = remove_user_references(&h.services, "org1", "u1").await.unwrap();
        assert_eq!(again, CascadeSummary::default());
    }

    #[tokio::test]
    async fn converges_after_partial_run() {
        let h = scenario().await;
        // as if a previous run stopped right after step 1
        h.engagements.delete_item("e1").await.unwrap();

        remove_user_references(&h.services, "org1", "u1").await.unwrap();
        let u1 = h.user("u1").await.unwrap();
        assert!(u1.mentions.iter().all(|m| m.engagement_id != "e1"));
        assert_eq!(u1.role_in("org1"), None);
        let admin = h.user("admin").await.unwrap();
        assert!(admin.mentions.iter().all(|m| m.engagement_id != "e1"));
    }
}
