use super::common::{Address, AddressInput, DbAddress, RoleType, StatusType};
use crate::database::Entity;
use crate::utils::dates::format_time_from_today;
use async_graphql::{InputObject, SimpleObject};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbRole {
    pub org_id: String,
    pub role_type: RoleType,
}

/// Record of a user being tagged in an engagement action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbMention {
    pub engagement_id: String,
    pub created_at: String,
    pub created_by: String,
    pub message: Option<String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub dismissed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbUser {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<DbAddress>,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<DbRole>,
    #[serde(default)]
    pub mentions: Vec<DbMention>,
    pub fcm_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expiration: Option<String>,
    pub last_login: Option<String>,
    pub preferences: Option<String>,
}

impl Entity for DbUser {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbUser {
    pub fn role_in(&self, org_id: &str) -> Option<RoleType> {
        self.roles
            .iter()
            .filter(|r| r.org_id == org_id)
            .map(|r| r.role_type)
            .max_by_key(|r| r.rank())
    }

    pub fn org_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.roles.iter().map(|r| r.org_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct UserName {
    pub first: String,
    pub middle: Option<String>,
    pub last: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct UserRole {
    pub org_id: String,
    pub role_type: RoleType,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Mention {
    pub engagement_id: String,
    pub created_at: String,
    pub created_by: String,
    pub message: Option<String>,
    pub seen: bool,
    pub dismissed: bool,
    /// `Today at 9:15 AM` style label.
    pub display_time: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub name: UserName,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub roles: Vec<UserRole>,
    pub mentions: Vec<Mention>,
    pub last_login: Option<String>,
    pub preferences: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct RoleInput {
    pub org_id: String,
    pub role_type: RoleType,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct UserInput {
    pub id: Option<String>,
    pub first: String,
    pub middle: Option<String>,
    pub last: String,
    pub user_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<AddressInput>,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub preferences: Option<String>,
    pub roles: Option<Vec<RoleInput>>,
}

#[derive(InputObject, Debug, Clone)]
pub struct UserFcmInput {
    pub fcm_token: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct MentionInput {
    pub engagement_id: String,
    pub created_at: String,
    /// Applies the flag to every mention of the user when set.
    pub mark_all: Option<bool>,
    pub value: Option<bool>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct UserResponse {
    pub message: String,
    pub status: StatusType,
    pub user: Option<User>,
}

impl UserResponse {
    pub fn success(message: String, user: User) -> Self {
        UserResponse { message, status: StatusType::Success, user: Some(user) }
    }

    pub fn failed(message: String) -> Self {
        UserResponse { message, status: StatusType::Failed, user: None }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct AuthenticationResponse {
    pub message: String,
    pub status: StatusType,
    pub access_token: Option<String>,
    pub user: Option<User>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct MentionSubscriptionEvent {
    pub action: super::common::ActionType,
    pub message: String,
    pub mention: Option<Mention>,
}

pub fn create_gql_mention(mention: &DbMention, now: NaiveDateTime) -> Mention {
    Mention {
        engagement_id: mention.engagement_id.clone(),
        created_at: mention.created_at.clone(),
        created_by: mention.created_by.clone(),
        message: mention.message.clone(),
        seen: mention.seen,
        dismissed: mention.dismissed,
        display_time: format_time_from_today(&mention.created_at, now),
    }
}

/// Output shape of a user. Credentials and reset tokens never leave the server.
pub fn create_gql_user(user: &DbUser) -> User {
    let now = chrono::Utc::now().naive_utc();
    User {
        id: user.id.clone(),
        user_name: user.user_name.clone(),
        name: UserName {
            first: user.first_name.clone(),
            middle: user.middle_name.clone(),
            last: user.last_name.clone(),
        },
        email: user.email.clone(),
        phone: user.phone.clone(),
        address: user.address.clone().map(Address::from),
        description: user.description.clone(),
        additional_info: user.additional_info.clone(),
        roles: user
            .roles
            .iter()
            .map(|r| UserRole { org_id: r.org_id.clone(), role_type: r.role_type })
            .collect(),
        mentions: user.mentions.iter().map(|m| create_gql_mention(m, now)).collect(),
        last_login: user.last_login.clone(),
        preferences: user.preferences.clone(),
    }
}

pub fn create_db_user(input: UserInput, password_hash: String) -> DbUser {
    DbUser {
        id: input.id.unwrap_or_else(super::common::new_id),
        first_name: input.first,
        middle_name: input.middle,
        last_name: input.last,
        user_name: input.user_name,
        email: input.email.trim().to_lowercase(),
        phone: input.phone,
        address: input.address.map(DbAddress::from),
        description: input.description,
        additional_info: input.additional_info,
        password: password_hash,
        roles: input
            .roles
            .unwrap_or_default()
            .into_iter()
            .map(|r| DbRole { org_id: r.org_id, role_type: r.role_type })
            .collect(),
        mentions: Vec::new(),
        fcm_token: None,
        password_reset_token: None,
        password_reset_token_expiration: None,
        last_login: None,
        preferences: input.preferences,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_role_in_org_wins() {
        let mut user = fixtures::user("u1", "org1", RoleType::User);
        user.roles.push(DbRole { org_id: "org1".into(), role_type: RoleType::Admin });
        assert_eq!(user.role_in("org1"), Some(RoleType::Admin));
        assert_eq!(user.role_in("org2"), None);
    }

    #[test]
    fn gql_user_hides_credentials() {
        let mut user = fixtures::user("u1", "org1", RoleType::User);
        user.password = "hash".into();
        user.password_reset_token = Some("secret".into());
        let gql = create_gql_user(&user);
        let debug = format!("{:?}", gql);
        assert!(!debug.contains("hash"));
        assert!(!debug.contains("secret"));
        assert_eq!(gql.name.first, "First-u1");
    }

    #[test]
    fn db_user_normalises_email() {
        let input = UserInput {
            first: "Ada".into(),
            last: "Lovelace".into(),
            user_name: "ada".into(),
            email: "  Ada@Example.ORG ".into(),
            ..Default::default()
        };
        let user = create_db_user(input, "hash".into());
        assert_eq!(user.email, "ada@example.org");
        assert!(!user.id.is_empty());
    }
}
