use super::common::{new_id, Address, AddressInput, DbAddress, StatusType};
use crate::database::Entity;
use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbDemographics {
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
    pub preferred_language: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub preferred_contact_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbContact {
    pub id: String,
    pub org_id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<DbAddress>,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub demographics: DbDemographics,
    pub notes: Option<String>,
}

impl Entity for DbContact {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct ContactName {
    pub first: String,
    pub middle: Option<String>,
    pub last: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Demographics {
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
    pub preferred_language: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub preferred_contact_time: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
#[graphql(complex)]
pub struct Contact {
    pub id: String,
    pub org_id: String,
    pub name: ContactName,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<Address>,
    pub status: ContactStatus,
    pub tags: Vec<String>,
    pub demographics: Demographics,
    pub notes: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct DemographicsInput {
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
    pub preferred_language: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub preferred_contact_time: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ContactInput {
    pub id: Option<String>,
    pub org_id: Option<String>,
    pub first: String,
    pub middle: Option<String>,
    pub last: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<AddressInput>,
    pub tags: Option<Vec<String>>,
    pub demographics: Option<DemographicsInput>,
    pub notes: Option<String>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct ContactResponse {
    pub message: String,
    pub status: StatusType,
    pub contact: Option<Contact>,
}

impl ContactResponse {
    pub fn success(message: String, contact: Contact) -> Self {
        ContactResponse { message, status: StatusType::Success, contact: Some(contact) }
    }

    pub fn failed(message: String) -> Self {
        ContactResponse { message, status: StatusType::Failed, contact: None }
    }
}

impl From<DemographicsInput> for DbDemographics {
    fn from(input: DemographicsInput) -> Self {
        DbDemographics {
            gender: input.gender,
            race: input.race,
            ethnicity: input.ethnicity,
            preferred_language: input.preferred_language,
            preferred_contact_method: input.preferred_contact_method,
            preferred_contact_time: input.preferred_contact_time,
        }
    }
}

pub fn create_db_contact(input: ContactInput, org_id: &str) -> DbContact {
    DbContact {
        id: input.id.unwrap_or_else(new_id),
        org_id: org_id.to_string(),
        first_name: input.first,
        middle_name: input.middle,
        last_name: input.last,
        email: input.email,
        phone: input.phone,
        date_of_birth: input.date_of_birth,
        address: input.address.map(DbAddress::from),
        status: ContactStatus::Active,
        tags: input.tags.unwrap_or_default(),
        demographics: input.demographics.map(DbDemographics::from).unwrap_or_default(),
        notes: input.notes,
    }
}

pub fn create_gql_contact(contact: &DbContact) -> Contact {
    let d = &contact.demographics;
    Contact {
        id: contact.id.clone(),
        org_id: contact.org_id.clone(),
        name: ContactName {
            first: contact.first_name.clone(),
            middle: contact.middle_name.clone(),
            last: contact.last_name.clone(),
        },
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        date_of_birth: contact.date_of_birth.clone(),
        address: contact.address.clone().map(Address::from),
        status: contact.status,
        tags: contact.tags.clone(),
        demographics: Demographics {
            gender: d.gender.clone(),
            race: d.race.clone(),
            ethnicity: d.ethnicity.clone(),
            preferred_language: d.preferred_language.clone(),
            preferred_contact_method: d.preferred_contact_method.clone(),
            preferred_contact_time: d.preferred_contact_time.clone(),
        },
        notes: contact.notes.clone(),
    }
}
