use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// Placeholder row served by the documented REST listing.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactSummary>,
    pub count: usize,
}

/// Static sample data. Real contact access goes through GraphQL.
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "Sample contact listing", body = ContactListResponse)
    )
)]
pub async fn list_contacts() -> HttpResponse {
    let contacts = vec![
        ContactSummary {
            id: "sample-1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        },
        ContactSummary {
            id: "sample-2".to_string(),
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
        },
    ];
    HttpResponse::Ok().json(ContactListResponse { count: contacts.len(), contacts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_rt::test]
    async fn serves_placeholder_contacts() {
        let app = test::init_service(App::new().route("/api/contacts", web::get().to(list_contacts))).await;
        let body: ContactListResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/contacts").to_request())
                .await;
        assert_eq!(body.count, 2);
        assert_eq!(body.contacts[0].first_name, "Jane");
    }
}
