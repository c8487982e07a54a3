use super::common::{new_id, ActionType, StatusType};
use crate::database::Entity;
use crate::utils::dates::{get_time_duration, now_iso, TimeDuration};
use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementStatus {
    #[default]
    NotStarted,
    Open,
    Assigned,
    InProgress,
    Pending,
    Closed,
    Completed,
}

impl EngagementStatus {
    pub fn is_inactive(self) -> bool {
        matches!(self, EngagementStatus::Closed | EngagementStatus::Completed)
    }
}

/// Audit-log entry embedded in an engagement, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbAction {
    pub user_id: String,
    pub org_id: String,
    pub date: String,
    pub comment: String,
    pub tagged_user_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbEngagement {
    pub id: String,
    pub org_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: EngagementStatus,
    pub start_date: String,
    pub end_date: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub actions: Vec<DbAction>,
}

impl Entity for DbEngagement {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbEngagement {
    /// Date of the most recent action, falling back to the start date.
    pub fn last_activity(&self) -> &str {
        self.actions
            .last()
            .map(|a| a.date.as_str())
            .unwrap_or(self.start_date.as_str())
    }

    pub fn push_action(&mut self, user_id: &str, comment: String) {
        self.actions.push(create_db_action(user_id, &self.org_id, comment, None));
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Action {
    pub user_id: String,
    pub org_id: String,
    pub date: String,
    pub comment: String,
    pub tagged_user_id: Option<String>,
    pub tags: Vec<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Engagement {
    pub id: String,
    pub org_id: String,
    pub title: String,
    pub description: String,
    pub status: EngagementStatus,
    pub start_date: String,
    pub end_date: Option<String>,
    pub user_id: Option<String>,
    pub contacts: Vec<String>,
    pub tags: Vec<String>,
    pub actions: Vec<Action>,
    /// Time left until `end_date`, absent when there is no end date.
    pub time_remaining: Option<TimeDuration>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct EngagementInput {
    pub engagement_id: Option<String>,
    pub org_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub end_date: Option<String>,
    pub user_id: Option<String>,
    pub contacts: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ActionInput {
    pub comment: String,
    pub tagged_user_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct EngagementResponse {
    pub message: String,
    pub status: StatusType,
    pub engagement: Option<Engagement>,
}

impl EngagementResponse {
    pub fn success(message: String, engagement: Engagement) -> Self {
        EngagementResponse { message, status: StatusType::Success, engagement: Some(engagement) }
    }

    pub fn failed(message: String) -> Self {
        EngagementResponse { message, status: StatusType::Failed, engagement: None }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct EngagementSubscriptionEvent {
    pub action: ActionType,
    pub message: String,
    pub engagement: Option<Engagement>,
}

/// Flattened engagement row for the org data export.
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct EngagementExportRow {
    pub engagement_id: String,
    pub title: String,
    pub status: EngagementStatus,
    pub start_date: String,
    pub end_date: Option<String>,
    pub assignee: Option<String>,
    pub contact_names: Vec<String>,
    pub tags: Vec<String>,
    pub action_count: i32,
}

pub fn create_db_action(
    user_id: &str,
    org_id: &str,
    comment: String,
    tagged_user_id: Option<String>,
) -> DbAction {
    DbAction {
        user_id: user_id.to_string(),
        org_id: org_id.to_string(),
        date: now_iso(),
        comment,
        tagged_user_id,
        tags: Vec::new(),
    }
}

pub fn create_db_engagement(input: EngagementInput, org_id: &str, title: &str) -> DbEngagement {
    let user_id = super::common::non_blank(input.user_id.as_deref()).map(str::to_string);
    DbEngagement {
        id: new_id(),
        org_id: org_id.to_string(),
        title: title.to_string(),
        description: input.description.unwrap_or_default(),
        status: if user_id.is_some() { EngagementStatus::Assigned } else { EngagementStatus::Open },
        start_date: now_iso(),
        end_date: input.end_date,
        user_id,
        contacts: input.contacts.unwrap_or_default(),
        tags: input.tags.unwrap_or_default(),
        actions: Vec::new(),
    }
}

pub fn create_gql_action(action: &DbAction) -> Action {
    Action {
        user_id: action.user_id.clone(),
        org_id: action.org_id.clone(),
        date: action.date.clone(),
        comment: action.comment.clone(),
        tagged_user_id: action.tagged_user_id.clone(),
        tags: action.tags.clone(),
    }
}

pub fn create_gql_engagement(engagement: &DbEngagement) -> Engagement {
    let now = now_iso();
    Engagement {
        id: engagement.id.clone(),
        org_id: engagement.org_id.clone(),
        title: engagement.title.clone(),
        description: engagement.description.clone(),
        status: engagement.status,
        start_date: engagement.start_date.clone(),
        end_date: engagement.end_date.clone(),
        user_id: engagement.user_id.clone(),
        contacts: engagement.contacts.clone(),
        tags: engagement.tags.clone(),
        // newest first for display
        actions: engagement.actions.iter().rev().map(create_gql_action).collect(),
        time_remaining: engagement
            .end_date
            .as_deref()
            .and_then(|end| get_time_duration(&now, end)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dates::TimeUnit;

    #[test]
    fn assigned_on_creation_when_user_given() {
        let input = EngagementInput { user_id: Some("u1".into()), ..Default::default() };
        let e = create_db_engagement(input, "org1", "Food");
        assert_eq!(e.status, EngagementStatus::Assigned);

        let e = create_db_engagement(EngagementInput::default(), "org1", "Food");
        assert_eq!(e.status, EngagementStatus::Open);
        assert!(e.user_id.is_none());
    }

    #[test]
    fn gql_actions_are_newest_first_and_overdue_flagged() {
        let mut e = fixtures::engagement("e1", "org1", None);
        e.actions.push(DbAction {
            user_id: "u1".into(),
            org_id: "org1".into(),
            date: "2021-01-01T00:00:00Z".into(),
            comment: "first".into(),
            tagged_user_id: None,
            tags: vec![],
        });
        e.push_action("u1", "second".into());
        e.end_date = Some("2000-01-01T00:00:00Z".into());

        let gql = create_gql_engagement(&e);
        assert_eq!(gql.actions[0].comment, "second");
        assert_eq!(gql.time_remaining.unwrap().unit, TimeUnit::Overdue);
    }
}
