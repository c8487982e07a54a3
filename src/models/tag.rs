use super::common::{new_id, StatusType};
use crate::database::Entity;
use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagCategory {
    ClientInfo,
    Request,
    Service,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbTag {
    pub id: String,
    pub org_id: String,
    pub label: String,
    pub description: Option<String>,
    pub category: Option<TagCategory>,
}

impl Entity for DbTag {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: String,
    pub org_id: String,
    pub label: String,
    pub description: Option<String>,
    pub category: TagCategory,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct TagInput {
    pub id: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub category: Option<TagCategory>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct TagResponse {
    pub message: String,
    pub status: StatusType,
    pub tag: Option<Tag>,
}

impl TagResponse {
    pub fn success(message: String, tag: Tag) -> Self {
        TagResponse { message, status: StatusType::Success, tag: Some(tag) }
    }

    pub fn failed(message: String) -> Self {
        TagResponse { message, status: StatusType::Failed, tag: None }
    }
}

pub fn create_db_tag(input: TagInput, org_id: &str) -> DbTag {
    DbTag {
        id: input.id.unwrap_or_else(new_id),
        org_id: org_id.to_string(),
        label: input.label.trim().to_string(),
        description: input.description,
        category: Some(input.category.unwrap_or_default()),
    }
}

pub fn create_gql_tag(tag: &DbTag) -> Tag {
    Tag {
        id: tag.id.clone(),
        org_id: tag.org_id.clone(),
        label: tag.label.clone(),
        description: tag.description.clone(),
        category: tag.category.unwrap_or_default(),
    }
}

impl TagCategory {
    pub fn label(self) -> &'static str {
        match self {
            TagCategory::ClientInfo => "Client info",
            TagCategory::Request => "Request",
            TagCategory::Service => "Service",
            TagCategory::Other => "Other",
        }
    }
}

/// The tags of one category within an org. One group per `(org_id, category)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbTagGroup {
    pub id: String,
    pub org_id: String,
    pub category: TagCategory,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entity for DbTagGroup {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct TagGroup {
    pub id: String,
    pub org_id: String,
    pub category: TagCategory,
    pub label: String,
    pub tags: Vec<String>,
}

pub fn create_db_tag_group(org_id: &str, category: TagCategory, tags: Vec<String>) -> DbTagGroup {
    DbTagGroup {
        id: new_id(),
        org_id: org_id.to_string(),
        category,
        label: category.label().to_string(),
        tags,
    }
}

pub fn create_gql_tag_group(group: &DbTagGroup) -> TagGroup {
    TagGroup {
        id: group.id.clone(),
        org_id: group.org_id.clone(),
        category: group.category,
        label: group.label.clone(),
        tags: group.tags.clone(),
    }
}
