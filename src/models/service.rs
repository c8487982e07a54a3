use super::common::{new_id, StatusType};
use crate::database::Entity;
use crate::utils::dates::{now_iso, parse_date};
use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    #[default]
    Active,
    Inactive,
    Archive,
}

/// Field kinds. The camelCase aliases are the keys older documents were
/// written with; the startup migration rewrites them.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceFieldType {
    #[serde(alias = "singleText")]
    SingleText,
    #[serde(alias = "multilineText")]
    MultilineText,
    #[serde(alias = "number")]
    Number,
    #[serde(alias = "date")]
    Date,
    #[serde(alias = "singleChoice")]
    SingleChoice,
    #[serde(alias = "multiChoice")]
    MultiChoice,
}

#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldRequirement {
    Required,
    #[default]
    Optional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbFieldChoice {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbServiceField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub field_type: ServiceFieldType,
    #[serde(default)]
    pub requirement: FieldRequirement,
    #[serde(default)]
    pub choices: Vec<DbFieldChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbService {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ServiceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fields: Vec<DbServiceField>,
    #[serde(default)]
    pub contact_form_enabled: bool,
}

impl Entity for DbService {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbAnswerField {
    pub field_id: String,
    pub value: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbServiceAnswer {
    pub id: String,
    pub service_id: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    pub fields: Vec<DbAnswerField>,
    pub created_at: String,
}

impl Entity for DbServiceAnswer {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct FieldChoice {
    pub id: String,
    pub label: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct ServiceField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    #[graphql(name = "type")]
    pub field_type: ServiceFieldType,
    pub requirement: FieldRequirement,
    pub choices: Vec<FieldChoice>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ServiceStatus,
    pub tags: Vec<String>,
    pub fields: Vec<ServiceField>,
    pub contact_form_enabled: bool,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct AnswerField {
    pub field_id: String,
    pub value: Option<String>,
    pub values: Vec<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct ServiceAnswer {
    pub id: String,
    pub service_id: String,
    pub contacts: Vec<String>,
    pub fields: Vec<AnswerField>,
    pub created_at: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct FieldChoiceInput {
    pub id: Option<String>,
    pub label: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct ServiceFieldInput {
    pub id: Option<String>,
    pub label: String,
    pub description: Option<String>,
    #[graphql(name = "type")]
    pub field_type: ServiceFieldType,
    pub requirement: Option<FieldRequirement>,
    pub choices: Option<Vec<FieldChoiceInput>>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ServiceInput {
    pub id: Option<String>,
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ServiceStatus>,
    pub tags: Option<Vec<String>>,
    pub fields: Option<Vec<ServiceFieldInput>>,
    pub contact_form_enabled: Option<bool>,
}

#[derive(InputObject, Debug, Clone)]
pub struct AnswerFieldInput {
    pub field_id: String,
    pub value: Option<String>,
    pub values: Option<Vec<String>>,
}

#[derive(InputObject, Debug, Clone)]
pub struct ServiceAnswerInput {
    pub service_id: String,
    pub contacts: Option<Vec<String>>,
    pub fields: Vec<AnswerFieldInput>,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct ServiceResponse {
    pub message: String,
    pub status: StatusType,
    pub service: Option<Service>,
}

impl ServiceResponse {
    pub fn success(message: String, service: Service) -> Self {
        ServiceResponse { message, status: StatusType::Success, service: Some(service) }
    }

    pub fn failed(message: String) -> Self {
        ServiceResponse { message, status: StatusType::Failed, service: None }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct ServiceAnswerResponse {
    pub message: String,
    pub status: StatusType,
    pub service_answer: Option<ServiceAnswer>,
}

impl ServiceAnswerResponse {
    pub fn success(message: String, answer: ServiceAnswer) -> Self {
        ServiceAnswerResponse { message, status: StatusType::Success, service_answer: Some(answer) }
    }

    pub fn failed(message: String) -> Self {
        ServiceAnswerResponse { message, status: StatusType::Failed, service_answer: None }
    }
}

/// Why an answer was rejected. Each variant maps to a localization key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerViolation {
    MissingRequired(String),
    UnknownField(String),
    InvalidChoice(String),
    InvalidNumber(String),
    InvalidDate(String),
}

impl AnswerViolation {
    pub fn localization_key(&self) -> &'static str {
        match self {
            AnswerViolation::MissingRequired(_) => "createServiceAnswers.missingRequired",
            AnswerViolation::UnknownField(_) => "createServiceAnswers.unknownField",
            AnswerViolation::InvalidChoice(_) => "createServiceAnswers.invalidChoice",
            AnswerViolation::InvalidNumber(_) => "createServiceAnswers.invalidNumber",
            AnswerViolation::InvalidDate(_) => "createServiceAnswers.invalidDate",
        }
    }

    pub fn field(&self) -> &str {
        match self {
            AnswerViolation::MissingRequired(f)
            | AnswerViolation::UnknownField(f)
            | AnswerViolation::InvalidChoice(f)
            | AnswerViolation::InvalidNumber(f)
            | AnswerViolation::InvalidDate(f) => f,
        }
    }
}

fn has_value(answer: &DbAnswerField) -> bool {
    answer.value.as_deref().map_or(false, |v| !v.trim().is_empty()) || !answer.values.is_empty()
}

/// Checks submitted answers against the service's field definitions.
pub fn validate_answer(service: &DbService, fields: &[DbAnswerField]) -> Result<(), AnswerViolation> {
    let definitions: HashMap<&str, &DbServiceField> =
        service.fields.iter().map(|f| (f.id.as_str(), f)).collect();

    for answer in fields {
        let Some(definition) = definitions.get(answer.field_id.as_str()) else {
            return Err(AnswerViolation::UnknownField(answer.field_id.clone()));
        };
        if !has_value(answer) {
            continue;
        }
        let is_choice = |v: &str| definition.choices.iter().any(|c| c.id == v);
        let label = definition.label.clone();
        match definition.field_type {
            ServiceFieldType::SingleChoice => {
                let ok = answer.value.as_deref().map_or(false, is_choice) && answer.values.is_empty();
                if !ok {
                    return Err(AnswerViolation::InvalidChoice(label));
                }
            }
            ServiceFieldType::MultiChoice => {
                let mut selected: Vec<&str> = answer.values.iter().map(String::as_str).collect();
                selected.extend(answer.value.as_deref());
                if !selected.into_iter().all(is_choice) {
                    return Err(AnswerViolation::InvalidChoice(label));
                }
            }
            ServiceFieldType::Number => {
                let parsed = answer.value.as_deref().map(|v| v.trim().parse::<f64>());
                if !matches!(parsed, Some(Ok(n)) if n.is_finite()) {
                    return Err(AnswerViolation::InvalidNumber(label));
                }
            }
            ServiceFieldType::Date => {
                if answer.value.as_deref().and_then(parse_date).is_none() {
                    return Err(AnswerViolation::InvalidDate(label));
                }
            }
            ServiceFieldType::SingleText | ServiceFieldType::MultilineText => {}
        }
    }

    for definition in &service.fields {
        if definition.requirement != FieldRequirement::Required {
            continue;
        }
        let answered = fields
            .iter()
            .any(|a| a.field_id == definition.id && has_value(a));
        if !answered {
            return Err(AnswerViolation::MissingRequired(definition.label.clone()));
        }
    }
    Ok(())
}

fn create_db_field(input: ServiceFieldInput) -> DbServiceField {
    DbServiceField {
        id: input.id.unwrap_or_else(new_id),
        label: input.label,
        description: input.description,
        field_type: input.field_type,
        requirement: input.requirement.unwrap_or_default(),
        choices: input
            .choices
            .unwrap_or_default()
            .into_iter()
            .map(|c| DbFieldChoice { id: c.id.unwrap_or_else(new_id), label: c.label })
            .collect(),
    }
}

pub fn create_db_service(input: ServiceInput) -> DbService {
    DbService {
        id: input.id.unwrap_or_else(new_id),
        org_id: input.org_id,
        name: input.name,
        description: input.description,
        status: input.status.unwrap_or_default(),
        tags: input.tags.unwrap_or_default(),
        fields: input.fields.unwrap_or_default().into_iter().map(create_db_field).collect(),
        contact_form_enabled: input.contact_form_enabled.unwrap_or(false),
    }
}

pub fn create_db_service_answer(input: ServiceAnswerInput) -> DbServiceAnswer {
    DbServiceAnswer {
        id: new_id(),
        service_id: input.service_id,
        contacts: input.contacts.unwrap_or_default(),
        fields: input
            .fields
            .into_iter()
            .map(|f| DbAnswerField {
                field_id: f.field_id,
                value: f.value,
                values: f.values.unwrap_or_default(),
            })
            .collect(),
        created_at: now_iso(),
    }
}

pub fn create_gql_service(service: &DbService) -> Service {
    Service {
        id: service.id.clone(),
        org_id: service.org_id.clone(),
        name: service.name.clone(),
        description: service.description.clone(),
        status: service.status,
        tags: service.tags.clone(),
        fields: service
            .fields
            .iter()
            .map(|f| ServiceField {
                id: f.id.clone(),
                label: f.label.clone(),
                description: f.description.clone(),
                field_type: f.field_type,
                requirement: f.requirement,
                choices: f
                    .choices
                    .iter()
                    .map(|c| FieldChoice { id: c.id.clone(), label: c.label.clone() })
                    .collect(),
            })
            .collect(),
        contact_form_enabled: service.contact_form_enabled,
    }
}

pub fn create_gql_service_answer(answer: &DbServiceAnswer) -> ServiceAnswer {
    ServiceAnswer {
        id: answer.id.clone(),
        service_id: answer.service_id.clone(),
        contacts: answer.contacts.clone(),
        fields: answer
            .fields
            .iter()
            .map(|f| AnswerField {
                field_id: f.field_id.clone(),
                value: f.value.clone(),
                values: f.values.clone(),
            })
            .collect(),
        created_at: answer.created_at.clone(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{answer, service};
    use super::*;

    #[test]
    fn accepts_complete_valid_answer() {
        let s = service("s1", "org1");
        let fields = vec![
            answer("name", Some("Jane"), &[]),
            answer("size", Some("3"), &[]),
            answer("pick", Some("c2"), &[]),
            answer("many", None, &["c1", "c2"]),
            answer("when", Some("2021-02-03"), &[]),
        ];
        assert_eq!(validate_answer(&s, &fields), Ok(()));
    }

    #[test]
    fn rejects_missing_required_field() {
        let s = service("s1", "org1");
        let err = validate_answer(&s, &[answer("name", Some("  "), &[])]).unwrap_err();
        assert_eq!(err, AnswerViolation::MissingRequired("NAME".into()));
    }

    #[test]
    fn rejects_bad_values() {
        let s = service("s1", "org1");
        let base = answer("name", Some("Jane"), &[]);
        let cases = vec![
            (answer("pick", Some("zz"), &[]), AnswerViolation::InvalidChoice("PICK".into())),
            (answer("many", None, &["c1", "zz"]), AnswerViolation::InvalidChoice("MANY".into())),
            (answer("size", Some("three"), &[]), AnswerViolation::InvalidNumber("SIZE".into())),
            (answer("when", Some("soon"), &[]), AnswerViolation::InvalidDate("WHEN".into())),
            (answer("ghost", Some("x"), &[]), AnswerViolation::UnknownField("ghost".into())),
        ];
        for (bad, expected) in cases {
            assert_eq!(validate_answer(&s, &[base.clone(), bad]), Err(expected));
        }
    }

    #[test]
    fn legacy_field_type_keys_still_deserialize() {
        let doc = mongodb::bson::doc! {
            "id": "f1", "label": "Name", "description": null, "type": "singleText",
        };
        let field: DbServiceField = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(field.field_type, ServiceFieldType::SingleText);
        let rewritten = mongodb::bson::to_document(&field).unwrap();
        assert_eq!(rewritten.get_str("type").unwrap(), "SINGLE_TEXT");
    }
}
