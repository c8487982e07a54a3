use crate::database::Entity;
use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbAttribute {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbOrganization {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<DbAttribute>,
}

impl Entity for DbOrganization {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub users: Vec<String>,
    pub contacts: Vec<String>,
    pub tags: Vec<String>,
    pub attributes: Vec<Attribute>,
}

pub fn create_gql_organization(org: &DbOrganization) -> Organization {
    Organization {
        id: org.id.clone(),
        name: org.name.clone(),
        description: org.description.clone(),
        users: org.users.clone(),
        contacts: org.contacts.clone(),
        tags: org.tags.clone(),
        attributes: org
            .attributes
            .iter()
            .map(|a| Attribute {
                id: a.id.clone(),
                label: a.label.clone(),
                description: a.description.clone(),
            })
            .collect(),
    }
}
