use crate::database::{Collection, Page};
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::{require_auth, require_org_role};
use crate::models::{
    create_db_service, create_db_service_answer, create_gql_service, create_gql_service_answer,
    non_blank, validate_answer, DbService, MoveDirection, RoleType, Service, ServiceAnswer,
    ServiceAnswerInput, ServiceAnswerResponse, ServiceInput, ServiceResponse, ServiceStatus,
    VoidResponse,
};
use crate::services::Services;
use crate::utils::dates::sort_by_date;
use crate::utils::error::AppError;
use crate::utils::list::{move_down, move_up};
use mongodb::bson::doc;
use std::borrow::Cow;

async fn load_service(services: &Services, service_id: &str) -> Result<Option<DbService>, AppError> {
    services.collections.services.item_by_id(service_id).await
}

pub async fn create_service(
    services: &Services,
    ctx: &RequestContext,
    service: ServiceInput,
) -> Result<ServiceResponse, AppError> {
    require_auth(ctx)?;
    if non_blank(Some(service.name.as_str())).is_none() {
        return Ok(ServiceResponse::failed(services.t("createService.nameRequired", &ctx.locale)));
    }
    require_org_role(ctx, &service.org_id, RoleType::User)?;

    let mut new_service = create_db_service(service);
    new_service.name = new_service.name.trim().to_string();
    services.collections.services.insert_item(&new_service).await?;

    services.telemetry.track_event(
        "createService",
        &[("orgId", new_service.org_id.as_str()), ("serviceId", new_service.id.as_str())],
    );
    Ok(ServiceResponse::success(
        services.t("createService.success", &ctx.locale),
        create_gql_service(&new_service),
    ))
}

/// Replaces the provided parts of a service. The owning org never changes.
pub async fn update_service(
    services: &Services,
    ctx: &RequestContext,
    service: ServiceInput,
) -> Result<ServiceResponse, AppError> {
    require_auth(ctx)?;
    let not_found = || Ok(ServiceResponse::failed(services.t("service.notFound", &ctx.locale)));
    if non_blank(Some(service.name.as_str())).is_none() {
        return Ok(ServiceResponse::failed(services.t("createService.nameRequired", &ctx.locale)));
    }
    let Some(service_id) = service.id.clone() else {
        return not_found();
    };
    let Some(mut existing) = load_service(services, &service_id).await? else {
        return not_found();
    };
    require_org_role(ctx, &existing.org_id, RoleType::User)?;

    let has_status = service.status.is_some();
    let has_tags = service.tags.is_some();
    let has_fields = service.fields.is_some();
    let contact_form_enabled = service.contact_form_enabled;
    let incoming = create_db_service(service);

    existing.name = incoming.name.trim().to_string();
    existing.description = incoming.description;
    if has_status {
        existing.status = incoming.status;
    }
    if has_tags {
        existing.tags = incoming.tags;
    }
    if has_fields {
        existing.fields = incoming.fields;
    }
    if let Some(enabled) = contact_form_enabled {
        existing.contact_form_enabled = enabled;
    }
    services.collections.services.update_item(&existing).await?;

    Ok(ServiceResponse::success(
        services.t("updateService.success", &ctx.locale),
        create_gql_service(&existing),
    ))
}

pub async fn move_service_field(
    services: &Services,
    ctx: &RequestContext,
    service_id: &str,
    field_id: &str,
    direction: MoveDirection,
) -> Result<ServiceResponse, AppError> {
    require_auth(ctx)?;
    let Some(mut service) = load_service(services, service_id).await? else {
        return Ok(ServiceResponse::failed(services.t("service.notFound", &ctx.locale)));
    };
    require_org_role(ctx, &service.org_id, RoleType::User)?;
    let Some(index) = service.fields.iter().position(|f| f.id == field_id) else {
        return Ok(ServiceResponse::failed(services.t("moveServiceField.fieldNotFound", &ctx.locale)));
    };

    let moved = match direction {
        MoveDirection::Up => move_up(&service.fields, index),
        MoveDirection::Down => move_down(&service.fields, index),
    };
    // at the edge nothing moves and nothing is written
    let reordered = match moved {
        Cow::Owned(fields) => Some(fields),
        Cow::Borrowed(_) => None,
    };
    if let Some(fields) = reordered {
        service.fields = fields;
        services.collections.services.update_item(&service).await?;
    }

    Ok(ServiceResponse::success(
        services.t("moveServiceField.success", &ctx.locale),
        create_gql_service(&service),
    ))
}

pub async fn create_service_answer(
    services: &Services,
    ctx: &RequestContext,
    answer: ServiceAnswerInput,
) -> Result<ServiceAnswerResponse, AppError> {
    require_auth(ctx)?;
    let Some(service) = load_service(services, &answer.service_id).await? else {
        return Ok(ServiceAnswerResponse::failed(services.t("service.notFound", &ctx.locale)));
    };
    require_org_role(ctx, &service.org_id, RoleType::User)?;
    if service.status != ServiceStatus::Active {
        return Ok(ServiceAnswerResponse::failed(services.t("createServiceAnswers.inactive", &ctx.locale)));
    }

    let new_answer = create_db_service_answer(answer);
    if let Err(violation) = validate_answer(&service, &new_answer.fields) {
        return Ok(ServiceAnswerResponse::failed(services.t_with(
            violation.localization_key(),
            &ctx.locale,
            &[("field", violation.field())],
        )));
    }
    services.collections.service_answers.insert_item(&new_answer).await?;

    services.telemetry.track_event(
        "createServiceAnswer",
        &[("serviceId", service.id.as_str()), ("answerId", new_answer.id.as_str())],
    );
    Ok(ServiceAnswerResponse::success(
        services.t("createServiceAnswers.success", &ctx.locale),
        create_gql_service_answer(&new_answer),
    ))
}

pub async fn delete_service_answer(
    services: &Services,
    ctx: &RequestContext,
    service_id: &str,
    answer_id: &str,
) -> Result<VoidResponse, AppError> {
    require_auth(ctx)?;
    let Some(service) = load_service(services, service_id).await? else {
        return Ok(VoidResponse::failed(services.t("service.notFound", &ctx.locale)));
    };
    require_org_role(ctx, &service.org_id, RoleType::User)?;

    let answers = &services.collections.service_answers;
    let belongs = answers
        .exist(doc! { "id": answer_id, "service_id": service_id })
        .await?;
    if !belongs || !answers.delete_item(answer_id).await? {
        return Ok(VoidResponse::failed(services.t("serviceAnswer.notFound", &ctx.locale)));
    }
    Ok(VoidResponse::success(services.t("deleteServiceAnswer.success", &ctx.locale)))
}

pub async fn services_for_org(
    services: &Services,
    ctx: &RequestContext,
    org_id: &str,
) -> Result<Vec<Service>, AppError> {
    require_org_role(ctx, org_id, RoleType::User)?;
    let mut found = services
        .collections
        .services
        .items(doc! { "org_id": org_id }, Page::default())
        .await?;
    found.sort_by_key(|s| s.name.to_lowercase());
    Ok(found.iter().map(create_gql_service).collect())
}

/// Answers of one service, newest first.
pub async fn service_answers(
    services: &Services,
    ctx: &RequestContext,
    service_id: &str,
) -> Result<Vec<ServiceAnswer>, AppError> {
    require_auth(ctx)?;
    let Some(service) = load_service(services, service_id).await? else {
        return Ok(Vec::new());
    };
    require_org_role(ctx, &service.org_id, RoleType::User)?;
    let mut found = services
        .collections
        .service_answers
        .items(doc! { "service_id": service_id }, Page::default())
        .await?;
    found.sort_by(|a, b| sort_by_date(Some(&a.created_at), Some(&b.created_at)));
    Ok(found.iter().map(create_gql_service_answer).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactors::testing::Harness;
    use crate::models::service::fixtures::service;
    use crate::models::{AnswerFieldInput, StatusType};

    fn field(field_id: &str, value: &str) -> AnswerFieldInput {
        AnswerFieldInput { field_id: field_id.into(), value: Some(value.into()), values: None }
    }

    fn answer(fields: Vec<AnswerFieldInput>) -> ServiceAnswerInput {
        ServiceAnswerInput { service_id: "s1".into(), contacts: None, fields }
    }

    async fn with_service() -> Harness {
        let h = Harness::seeded().await;
        h.service_forms.insert_item(&service("s1", "org1")).await.unwrap();
        h
    }

    #[tokio::test]
    async fn create_requires_name_and_membership() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("u1").await;
        let nameless = ServiceInput { org_id: "org1".into(), name: " ".into(), ..Default::default() };
        let result = create_service(&h.services, &ctx, nameless).await.unwrap();
        assert_eq!(result.status, StatusType::Failed);

        let foreign = ServiceInput { org_id: "org9".into(), name: "Rides".into(), ..Default::default() };
        assert!(matches!(
            create_service(&h.services, &ctx, foreign).await,
            Err(AppError::Forbidden(_))
        ));

        let ok = ServiceInput { org_id: "org1".into(), name: "Rides".into(), ..Default::default() };
        let created = create_service(&h.services, &ctx, ok).await.unwrap().service.unwrap();
        assert_eq!(created.status, ServiceStatus::Active);
        assert_eq!(services_for_org(&h.services, &ctx, "org1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_only_touches_provided_parts() {
        let h = with_service().await;
        let ctx = h.ctx("u1").await;
        let change = ServiceInput {
            id: Some("s1".into()),
            org_id: "org2".into(),
            name: "Pantry".into(),
            status: Some(ServiceStatus::Inactive),
            ..Default::default()
        };
        let updated = update_service(&h.services, &ctx, change).await.unwrap().service.unwrap();
        assert_eq!(updated.name, "Pantry");
        assert_eq!(updated.org_id, "org1");
        assert_eq!(updated.status, ServiceStatus::Inactive);
        assert_eq!(updated.fields.len(), 5);
    }

    #[tokio::test]
    async fn moving_fields_reorders_and_stops_at_edges() {
        let h = with_service().await;
        let ctx = h.ctx("u1").await;

        let moved = move_service_field(&h.services, &ctx, "s1", "size", MoveDirection::Up)
            .await
            .unwrap()
            .service
            .unwrap();
        let order: Vec<&str> = moved.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(order, vec!["size", "name", "pick", "many", "when"]);

        let edge = move_service_field(&h.services, &ctx, "s1", "when", MoveDirection::Down)
            .await
            .unwrap();
        assert_eq!(edge.status, StatusType::Success);
        assert_eq!(edge.service.unwrap().fields[4].id, "when");

        let missing = move_service_field(&h.services, &ctx, "s1", "nope", MoveDirection::Down)
            .await
            .unwrap();
        assert_eq!(missing.status, StatusType::Failed);
    }

    #[tokio::test]
    async fn answers_are_validated_against_the_form() {
        let h = with_service().await;
        let ctx = h.ctx("u1").await;

        let missing = create_service_answer(&h.services, &ctx, answer(vec![field("size", "3")]))
            .await
            .unwrap();
        assert_eq!(missing.message, "NAME is required");

        let bad_number = create_service_answer(
            &h.services,
            &ctx,
            answer(vec![field("name", "Jane"), field("size", "lots")]),
        )
        .await
        .unwrap();
        assert_eq!(bad_number.message, "SIZE must be a number");
        assert_eq!(h.service_answers.insert_calls(), 0);

        let ok = create_service_answer(
            &h.services,
            &ctx,
            answer(vec![field("name", "Jane"), field("pick", "c2")]),
        )
        .await
        .unwrap();
        assert_eq!(ok.status, StatusType::Success);
        assert_eq!(service_answers(&h.services, &ctx, "s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_services_reject_answers() {
        let h = Harness::seeded().await;
        let mut inactive = service("s1", "org1");
        inactive.status = ServiceStatus::Inactive;
        h.service_forms.insert_item(&inactive).await.unwrap();
        let ctx = h.ctx("u1").await;

        let result = create_service_answer(&h.services, &ctx, answer(vec![field("name", "Jane")]))
            .await
            .unwrap();
        assert_eq!(result.message, h.services.t("createServiceAnswers.inactive", "en-US"));
    }

    #[tokio::test]
    async fn delete_answer_checks_its_service() {
        let h = with_service().await;
        h.service_forms.insert_item(&service("s2", "org1")).await.unwrap();
        let ctx = h.ctx("u1").await;
        let created = create_service_answer(&h.services, &ctx, answer(vec![field("name", "Jane")]))
            .await
            .unwrap()
            .service_answer
            .unwrap();

        let wrong = delete_service_answer(&h.services, &ctx, "s2", &created.id).await.unwrap();
        assert_eq!(wrong.status, StatusType::Failed);
        let ok = delete_service_answer(&h.services, &ctx, "s1", &created.id).await.unwrap();
        assert_eq!(ok.status, StatusType::Success);
        assert!(h.service_answers.snapshot().await.is_empty());
    }
}
