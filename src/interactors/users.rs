use super::cascade::remove_user_references;
use super::load_org;
use crate::database::Collection;
use crate::middleware::auth::RequestContext;
use crate::middleware::directives::{require_auth, require_org_role, require_self_or_org_admin};
use crate::models::{
    create_db_user, create_gql_mention, create_gql_user, ActionType, AuthenticationResponse,
    DbAddress, DbUser, MentionInput, RoleType, StatusType, UserFcmInput, UserInput,
    UserResponse, VoidResponse,
};
use crate::services::{MailMessage, Mailer, Services};
use crate::utils::dates::{now_iso, parse_date};
use crate::utils::error::AppError;
use crate::utils::text::generate_password;
use mongodb::bson::{self, doc, Bson, Document};
use subtle::ConstantTimeEq;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const GENERATED_PASSWORD_LENGTH: usize = 16;

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn load_user(services: &Services, user_id: &str) -> Result<Option<DbUser>, AppError> {
    services.collections.users.item_by_id(user_id).await
}

async fn set_fields(services: &Services, user_id: &str, fields: Document) -> Result<bool, AppError> {
    services.collections.users.update_by_id(user_id, doc! { "$set": fields }).await
}

async fn user_name_taken(
    services: &Services,
    user_name: &str,
    except: Option<&str>,
) -> Result<bool, AppError> {
    let mut filter = doc! { "user_name": user_name.trim() };
    if let Some(id) = except {
        filter.insert("id", doc! { "$ne": id });
    }
    services.collections.users.exist(filter).await
}

/// Self, or an admin of any organization the target belongs to.
fn require_self_or_admin_of(ctx: &RequestContext, target: &DbUser) -> Result<(), AppError> {
    let identity = require_auth(ctx)?;
    if identity.id() == target.id {
        return Ok(());
    }
    let orgs = target.org_ids();
    if orgs
        .iter()
        .any(|org_id| require_org_role(ctx, org_id, RoleType::Admin).is_ok())
    {
        return Ok(());
    }
    // report the first org so the error names something useful
    require_self_or_org_admin(ctx, &target.id, orgs.first().map(String::as_str)).map(|_| ())
}

pub async fn authenticate(
    services: &Services,
    ctx: &RequestContext,
    user_name: &str,
    password: &str,
) -> Result<AuthenticationResponse, AppError> {
    let failed = || AuthenticationResponse {
        message: services.t("auth.invalid", &ctx.locale),
        status: StatusType::Failed,
        access_token: None,
        user: None,
    };

    // either the user name or the email address identifies the account
    let login = doc! {
        "$or": [
            { "user_name": user_name.trim() },
            { "email": normalise_email(user_name) },
        ]
    };
    let Some(mut user) = services.collections.users.item(login).await? else {
        return Ok(failed());
    };
    if !services.authenticator.verify_password(password, &user.password) {
        log::warn!("🔒 Failed sign-in for {}", user.user_name);
        return Ok(failed());
    }

    let token = services.authenticator.issue_token(&user)?;
    user.last_login = Some(now_iso());
    set_fields(services, &user.id, doc! { "last_login": user.last_login.as_deref() }).await?;
    services.telemetry.track_event("authenticate", &[("userId", user.id.as_str())]);

    Ok(AuthenticationResponse {
        message: services.t("auth.success", &ctx.locale),
        status: StatusType::Success,
        access_token: Some(token),
        user: Some(create_gql_user(&user)),
    })
}

pub async fn create_new_user(
    services: &Services,
    ctx: &RequestContext,
    user: UserInput,
) -> Result<UserResponse, AppError> {
    let identity = require_auth(ctx)?;
    let org_ids: Vec<String> = match &user.roles {
        Some(roles) if !roles.is_empty() => roles.iter().map(|r| r.org_id.clone()).collect(),
        _ => return Ok(UserResponse::failed(services.t("createNewUser.rolesRequired", &ctx.locale))),
    };
    for org_id in &org_ids {
        require_org_role(ctx, org_id, RoleType::Admin)?;
    }

    let email = normalise_email(&user.email);
    if services.collections.users.exist(doc! { "email": email.as_str() }).await? {
        return Ok(UserResponse::failed(services.t_with(
            "createNewUser.emailExists",
            &ctx.locale,
            &[("email", email.as_str())],
        )));
    }
    if user_name_taken(services, &user.user_name, None).await? {
        return Ok(UserResponse::failed(services.t_with(
            "createNewUser.userNameExists",
            &ctx.locale,
            &[("userName", user.user_name.trim())],
        )));
    }
    for org_id in &org_ids {
        load_org(services, org_id).await?;
    }

    let password = generate_password(GENERATED_PASSWORD_LENGTH);
    let hash = services.authenticator.hash_password(&password)?;
    let new_user = create_db_user(user, hash);
    services.collections.users.insert_item(&new_user).await?;

    for org_id in &org_ids {
        services
            .collections
            .organizations
            .update_by_id(org_id, doc! { "$addToSet": { "users": new_user.id.as_str() } })
            .await?;
    }

    let name = new_user.display_name();
    let link = format!("{}/login", services.config.origin);
    let welcome = MailMessage {
        to: new_user.email.clone(),
        subject: services.t("email.welcomeSubject", &ctx.locale),
        body: services.t_with(
            "email.welcomeBody",
            &ctx.locale,
            &[
                ("name", name.as_str()),
                ("userName", new_user.user_name.as_str()),
                ("password", password.as_str()),
                ("link", link.as_str()),
            ],
        ),
    };
    if let Err(e) = services.mailer.send(welcome).await {
        log::warn!("⚠️  Welcome mail to {} failed: {}", new_user.id, e);
    }

    services
        .telemetry
        .track_event("createNewUser", &[("userId", new_user.id.as_str()), ("by", identity.id())]);
    log::info!("👤 Created user {}", new_user.id);
    Ok(UserResponse::success(
        services.t("createNewUser.success", &ctx.locale),
        create_gql_user(&new_user),
    ))
}

pub async fn update_user(
    services: &Services,
    ctx: &RequestContext,
    user: UserInput,
) -> Result<UserResponse, AppError> {
    require_auth(ctx)?;
    let not_found = || Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    let Some(user_id) = user.id.clone() else {
        return not_found();
    };
    let Some(mut existing) = load_user(services, &user_id).await? else {
        return not_found();
    };
    require_self_or_admin_of(ctx, &existing)?;

    let email = normalise_email(&user.email);
    if let Some(other) = services.collections.users.item(doc! { "email": email.as_str() }).await? {
        if other.id != existing.id {
            return Ok(UserResponse::failed(services.t_with(
                "updateUser.emailExists",
                &ctx.locale,
                &[("email", email.as_str())],
            )));
        }
    }
    if user_name_taken(services, &user.user_name, Some(&existing.id)).await? {
        return Ok(UserResponse::failed(services.t_with(
            "updateUser.userNameExists",
            &ctx.locale,
            &[("userName", user.user_name.trim())],
        )));
    }

    // roles change through membership operations only
    existing.first_name = user.first;
    existing.middle_name = user.middle;
    existing.last_name = user.last;
    existing.user_name = user.user_name;
    existing.email = email;
    existing.phone = user.phone;
    existing.address = user.address.map(DbAddress::from);
    existing.description = user.description;
    existing.additional_info = user.additional_info;
    existing.preferences = user.preferences;
    let profile = doc! {
        "first_name": existing.first_name.as_str(),
        "middle_name": existing.middle_name.as_deref(),
        "last_name": existing.last_name.as_str(),
        "user_name": existing.user_name.as_str(),
        "email": existing.email.as_str(),
        "phone": existing.phone.as_deref(),
        "address": bson::to_bson(&existing.address)?,
        "description": existing.description.as_deref(),
        "additional_info": existing.additional_info.as_deref(),
        "preferences": existing.preferences.as_deref(),
    };
    set_fields(services, &existing.id, profile).await?;

    Ok(UserResponse::success(
        services.t("updateUser.success", &ctx.locale),
        create_gql_user(&existing),
    ))
}

pub async fn update_user_fcm_token(
    services: &Services,
    ctx: &RequestContext,
    input: UserFcmInput,
) -> Result<UserResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(mut user) = load_user(services, identity.id()).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    user.fcm_token = Some(input.fcm_token).filter(|t| !t.is_empty());
    set_fields(services, &user.id, doc! { "fcm_token": user.fcm_token.as_deref() }).await?;
    Ok(UserResponse::success(
        services.t("updateUserFcmToken.success", &ctx.locale),
        create_gql_user(&user),
    ))
}

fn too_short(services: &Services, ctx: &RequestContext, password: &str) -> Option<String> {
    if password.chars().count() >= MIN_PASSWORD_LENGTH {
        return None;
    }
    let min = MIN_PASSWORD_LENGTH.to_string();
    Some(services.t_with("setUserPassword.tooShort", &ctx.locale, &[("min", min.as_str())]))
}

pub async fn set_user_password(
    services: &Services,
    ctx: &RequestContext,
    old_password: &str,
    new_password: &str,
) -> Result<UserResponse, AppError> {
    let identity = require_auth(ctx)?;
    if let Some(message) = too_short(services, ctx, new_password) {
        return Ok(UserResponse::failed(message));
    }
    let Some(mut user) = load_user(services, identity.id()).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    if !services.authenticator.verify_password(old_password, &user.password) {
        return Ok(UserResponse::failed(services.t("setUserPassword.invalidOld", &ctx.locale)));
    }
    user.password = services.authenticator.hash_password(new_password)?;
    set_fields(services, &user.id, doc! { "password": user.password.as_str() }).await?;
    Ok(UserResponse::success(
        services.t("setUserPassword.success", &ctx.locale),
        create_gql_user(&user),
    ))
}

pub async fn initiate_password_reset(
    services: &Services,
    ctx: &RequestContext,
    email: &str,
) -> Result<VoidResponse, AppError> {
    let email = normalise_email(email);
    let Some(user) = services.collections.users.item(doc! { "email": email.as_str() }).await? else {
        // same answer as a real reset so accounts can't be enumerated
        log::debug!("Password reset requested for unknown email");
        return Ok(VoidResponse::success(services.t("initiatePasswordReset.success", &ctx.locale)));
    };

    let minutes = services.config.password_reset_ttl_minutes;
    let token = services.token_issuer.issue_reset_token();
    let expires = chrono::Utc::now() + chrono::Duration::minutes(minutes);
    let stored = doc! {
        "password_reset_token": token.as_str(),
        "password_reset_token_expiration": expires.to_rfc3339(),
    };
    set_fields(services, &user.id, stored).await?;

    let link = format!(
        "{}/passwordReset?email={}&resetToken={}",
        services.config.origin,
        urlencoding::encode(&user.email),
        urlencoding::encode(&token)
    );
    let name = user.display_name();
    let minutes = minutes.to_string();
    let message = MailMessage {
        to: user.email.clone(),
        subject: services.t("email.resetSubject", &ctx.locale),
        body: services.t_with(
            "email.resetBody",
            &ctx.locale,
            &[("name", name.as_str()), ("link", link.as_str()), ("minutes", minutes.as_str())],
        ),
    };

    if let Err(e) = services.mailer.send(message).await {
        log::error!("❌ Password reset mail for {} failed: {}", user.id, e);
        set_fields(services, &user.id, cleared_reset_token()).await?;
        return Ok(VoidResponse::failed(services.t("initiatePasswordReset.mailFailed", &ctx.locale)));
    }

    services.telemetry.track_event("initiatePasswordReset", &[("userId", user.id.as_str())]);
    Ok(VoidResponse::success(services.t("initiatePasswordReset.success", &ctx.locale)))
}

fn cleared_reset_token() -> Document {
    doc! { "password_reset_token": Bson::Null, "password_reset_token_expiration": Bson::Null }
}

pub async fn execute_password_reset(
    services: &Services,
    ctx: &RequestContext,
    email: &str,
    reset_token: &str,
    password: &str,
) -> Result<VoidResponse, AppError> {
    let invalid = || Ok(VoidResponse::failed(services.t("executePasswordReset.invalid", &ctx.locale)));

    let email = normalise_email(email);
    let Some(user) = services.collections.users.item(doc! { "email": email.as_str() }).await? else {
        return invalid();
    };
    let Some(stored) = user.password_reset_token.as_deref() else {
        return invalid();
    };

    // the token is single use whatever the outcome; only one redemption claims it
    let claimed = services
        .collections
        .users
        .update_items(
            doc! { "id": user.id.as_str(), "password_reset_token": stored },
            doc! { "$set": cleared_reset_token() },
            Vec::new(),
        )
        .await?;
    if claimed == 0 {
        return invalid();
    }

    let matches: bool = stored.as_bytes().ct_eq(reset_token.as_bytes()).into();
    if !matches {
        return invalid();
    }
    let expired = user
        .password_reset_token_expiration
        .as_deref()
        .and_then(parse_date)
        .map_or(true, |at| at < chrono::Utc::now().naive_utc());
    if expired {
        return Ok(VoidResponse::failed(services.t("executePasswordReset.expired", &ctx.locale)));
    }
    if let Some(message) = too_short(services, ctx, password) {
        return Ok(VoidResponse::failed(message));
    }

    let hash = services.authenticator.hash_password(password)?;
    set_fields(services, &user.id, doc! { "password": hash }).await?;
    services.telemetry.track_event("executePasswordReset", &[("userId", user.id.as_str())]);
    Ok(VoidResponse::success(services.t("executePasswordReset.success", &ctx.locale)))
}

pub async fn delete_user(
    services: &Services,
    ctx: &RequestContext,
    user_id: &str,
) -> Result<VoidResponse, AppError> {
    require_auth(ctx)?;
    let Some(user) = load_user(services, user_id).await? else {
        return Ok(VoidResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    let orgs = user.org_ids();
    if orgs.is_empty() {
        require_self_or_org_admin(ctx, user_id, None)?;
    }
    for org_id in &orgs {
        require_org_role(ctx, org_id, RoleType::Admin)?;
    }

    for org_id in &orgs {
        remove_user_references(services, org_id, user_id).await?;
    }
    services.collections.users.delete_item(user_id).await?;

    services.telemetry.track_event("deleteUser", &[("userId", user_id)]);
    log::info!("🗑️  Deleted user {}", user_id);
    Ok(VoidResponse::success(services.t("deleteUser.success", &ctx.locale)))
}

pub async fn remove_user_from_organization(
    services: &Services,
    ctx: &RequestContext,
    user_id: &str,
    org_id: &str,
) -> Result<UserResponse, AppError> {
    require_org_role(ctx, org_id, RoleType::Admin)?;
    let Some(user) = load_user(services, user_id).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    let org = load_org(services, org_id).await?;
    if user.role_in(org_id).is_none() && !org.users.iter().any(|id| id == user_id) {
        return Ok(UserResponse::failed(services.t("removeUserFromOrganization.notMember", &ctx.locale)));
    }

    remove_user_references(services, org_id, user_id).await?;
    let Some(user) = load_user(services, user_id).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    services
        .telemetry
        .track_event("removeUserFromOrganization", &[("userId", user_id), ("orgId", org_id)]);
    Ok(UserResponse::success(
        services.t("removeUserFromOrganization.success", &ctx.locale),
        create_gql_user(&user),
    ))
}

#[derive(Clone, Copy)]
enum MentionFlag {
    Seen,
    Dismissed,
}

async fn mark_mentions(
    services: &Services,
    ctx: &RequestContext,
    input: MentionInput,
    flag: MentionFlag,
) -> Result<UserResponse, AppError> {
    let identity = require_auth(ctx)?;
    let Some(user) = load_user(services, identity.id()).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };

    let mark_all = input.mark_all.unwrap_or(false);
    let value = input.value.unwrap_or(true);
    let selected = |engagement_id: &str, created_at: &str| {
        mark_all || (engagement_id == input.engagement_id && created_at == input.created_at)
    };
    if !user.mentions.iter().any(|m| selected(&m.engagement_id, &m.created_at)) {
        return Ok(UserResponse::failed(services.t("markMention.notFound", &ctx.locale)));
    }

    let field = match flag {
        MentionFlag::Seen => "seen",
        MentionFlag::Dismissed => "dismissed",
    };
    let (path, array_filters) = if mark_all {
        (format!("mentions.$[].{field}"), Vec::new())
    } else {
        let target = doc! {
            "m.engagement_id": input.engagement_id.as_str(),
            "m.created_at": input.created_at.as_str(),
        };
        (format!("mentions.$[m].{field}"), vec![target])
    };
    let mut fields = Document::new();
    fields.insert(path, value);
    services
        .collections
        .users
        .update_items(doc! { "id": user.id.as_str() }, doc! { "$set": fields }, array_filters)
        .await?;

    let Some(user) = load_user(services, &user.id).await? else {
        return Ok(UserResponse::failed(services.t("user.notFound", &ctx.locale)));
    };
    let now = chrono::Utc::now().naive_utc();
    let message = services.t("markMention.success", &ctx.locale);
    for mention in user.mentions.iter().filter(|m| selected(&m.engagement_id, &m.created_at)) {
        services.publisher.publish_mention(
            &user.id,
            ActionType::Updated,
            message.clone(),
            Some(create_gql_mention(mention, now)),
        );
    }
    Ok(UserResponse::success(message, create_gql_user(&user)))
}

pub async fn mark_mention_seen(
    services: &Services,
    ctx: &RequestContext,
    input: MentionInput,
) -> Result<UserResponse, AppError> {
    mark_mentions(services, ctx, input, MentionFlag::Seen).await
}

pub async fn mark_mention_dismissed(
    services: &Services,
    ctx: &RequestContext,
    input: MentionInput,
) -> Result<UserResponse, AppError> {
    mark_mentions(services, ctx, input, MentionFlag::Dismissed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactors::testing::Harness;
    use crate::models::{DbMention, DbRole, RoleInput};
    use crate::services::mailer::fakes::RecordingMailer;
    use futures::StreamExt;

    fn new_user_input(email: &str) -> UserInput {
        UserInput {
            first: "Ada".into(),
            last: "Lovelace".into(),
            user_name: "ada".into(),
            email: email.into(),
            roles: Some(vec![RoleInput { org_id: "org1".into(), role_type: RoleType::User }]),
            ..Default::default()
        }
    }

    async fn with_password(h: &Harness, id: &str, password: &str) {
        let mut user = h.user(id).await.unwrap();
        user.password = h.services.authenticator.hash_password(password).unwrap();
        h.users.update_item(&user).await.unwrap();
    }

    #[tokio::test]
    async fn authenticate_issues_token_and_records_login() {
        let h = Harness::seeded().await;
        with_password(&h, "u1", "correct horse").await;
        let ctx = RequestContext::anonymous("en-US");

        let bad = authenticate(&h.services, &ctx, "user-u1", "wrong").await.unwrap();
        assert_eq!(bad.status, StatusType::Failed);
        assert!(bad.access_token.is_none());

        let ok = authenticate(&h.services, &ctx, "user-u1", "correct horse").await.unwrap();
        assert_eq!(ok.status, StatusType::Success);
        let claims = h.services.authenticator.verify_token(&ok.access_token.unwrap()).unwrap();
        assert_eq!(claims.sub, "u1");
        assert!(h.user("u1").await.unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn authenticate_accepts_email_address() {
        let h = Harness::seeded().await;
        with_password(&h, "u1", "correct horse").await;
        let ctx = RequestContext::anonymous("en-US");

        let ok = authenticate(&h.services, &ctx, " U1@Example.org ", "correct horse").await.unwrap();
        assert_eq!(ok.status, StatusType::Success);
        assert_eq!(ok.user.unwrap().id, "u1");

        let bad = authenticate(&h.services, &ctx, "u1@example.org", "wrong").await.unwrap();
        assert_eq!(bad.status, StatusType::Failed);
    }

    #[tokio::test]
    async fn create_new_user_requires_unique_email_and_sends_welcome() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("admin").await;

        let dup = create_new_user(&h.services, &ctx, new_user_input("U1@example.org")).await.unwrap();
        assert_eq!(dup.status, StatusType::Failed);

        let created = create_new_user(&h.services, &ctx, new_user_input("ada@example.org"))
            .await
            .unwrap();
        assert_eq!(created.status, StatusType::Success);
        let id = created.user.unwrap().id;
        let org = h.organizations.item_by_id("org1").await.unwrap().unwrap();
        assert!(org.users.contains(&id));

        let mail = h.mailer.sent();
        assert_eq!(mail.len(), 1);
        assert_eq!(mail[0].to, "ada@example.org");
        assert!(!h.user(&id).await.unwrap().password.is_empty());
    }

    #[tokio::test]
    async fn user_names_stay_unique() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("admin").await;

        let mut input = new_user_input("ada@example.org");
        input.user_name = "user-u1".into();
        let dup = create_new_user(&h.services, &ctx, input).await.unwrap();
        assert_eq!(dup.status, StatusType::Failed);
        assert_eq!(
            dup.message,
            h.services.t_with("createNewUser.userNameExists", "en-US", &[("userName", "user-u1")])
        );
        assert_eq!(h.users.count(doc! {}).await.unwrap(), 2);

        let mut input = new_user_input("u1@example.org");
        input.id = Some("u1".into());
        input.user_name = "user-admin".into();
        let taken = update_user(&h.services, &h.ctx("u1").await, input).await.unwrap();
        assert_eq!(taken.status, StatusType::Failed);
        assert_eq!(h.user("u1").await.unwrap().user_name, "user-u1");

        // keeping one's own name is fine
        let mut input = new_user_input("u1@example.org");
        input.id = Some("u1".into());
        input.user_name = "user-u1".into();
        let kept = update_user(&h.services, &h.ctx("u1").await, input).await.unwrap();
        assert_eq!(kept.status, StatusType::Success);
    }

    #[tokio::test]
    async fn create_new_user_for_unknown_org_writes_nothing() {
        let h = Harness::seeded().await;
        let mut admin = h.user("admin").await.unwrap();
        admin.roles.push(DbRole { org_id: "ghost".into(), role_type: RoleType::Admin });
        let ctx = RequestContext::for_user(admin, "en-US");

        let mut input = new_user_input("ada@example.org");
        input.roles = Some(vec![RoleInput { org_id: "ghost".into(), role_type: RoleType::User }]);
        let result = create_new_user(&h.services, &ctx, input).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(h.users.count(doc! {}).await.unwrap(), 2);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn create_new_user_is_admin_only() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("u1").await;
        let result = create_new_user(&h.services, &ctx, new_user_input("x@example.org")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let anonymous = RequestContext::anonymous("en-US");
        let result = create_new_user(&h.services, &anonymous, new_user_input("x@example.org")).await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn update_user_rejects_email_of_someone_else() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("u1").await;
        let mut input = new_user_input("admin@example.org");
        input.id = Some("u1".into());
        let result = update_user(&h.services, &ctx, input).await.unwrap();
        assert_eq!(result.status, StatusType::Failed);

        let mut input = new_user_input("u1@example.org");
        input.id = Some("u1".into());
        input.first = "Renamed".into();
        let result = update_user(&h.services, &ctx, input).await.unwrap();
        assert_eq!(result.status, StatusType::Success);
        assert_eq!(h.user("u1").await.unwrap().first_name, "Renamed");
        // roles untouched
        assert_eq!(h.user("u1").await.unwrap().role_in("org1"), Some(RoleType::User));
    }

    #[tokio::test]
    async fn fcm_token_is_saved_and_cleared() {
        let h = Harness::seeded().await;
        let ctx = h.ctx("u1").await;

        let saved = update_user_fcm_token(&h.services, &ctx, UserFcmInput { fcm_token: "device-2".into() })
            .await
            .unwrap();
        assert_eq!(saved.status, StatusType::Success);
        let stored = h.user("u1").await.unwrap();
        assert_eq!(stored.fcm_token.as_deref(), Some("device-2"));
        assert_eq!(stored.first_name, "First-u1");

        update_user_fcm_token(&h.services, &ctx, UserFcmInput { fcm_token: String::new() })
            .await
            .unwrap();
        assert!(h.user("u1").await.unwrap().fcm_token.is_none());

        let anonymous = RequestContext::anonymous("en-US");
        let result = update_user_fcm_token(&h.services, &anonymous, UserFcmInput { fcm_token: "x".into() }).await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn set_password_checks_old_one() {
        let h = Harness::seeded().await;
        with_password(&h, "u1", "old-password").await;
        let ctx = h.ctx("u1").await;

        let short = set_user_password(&h.services, &ctx, "old-password", "short").await.unwrap();
        assert_eq!(short.status, StatusType::Failed);
        let wrong = set_user_password(&h.services, &ctx, "nope", "new-password").await.unwrap();
        assert_eq!(wrong.status, StatusType::Failed);
        let ok = set_user_password(&h.services, &ctx, "old-password", "new-password").await.unwrap();
        assert_eq!(ok.status, StatusType::Success);

        let stored = h.user("u1").await.unwrap().password;
        assert!(h.services.authenticator.verify_password("new-password", &stored));
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let h = Harness::seeded().await;
        let ctx = RequestContext::anonymous("en-US");

        let unknown = initiate_password_reset(&h.services, &ctx, "nobody@example.org").await.unwrap();
        let known = initiate_password_reset(&h.services, &ctx, "U1@example.org").await.unwrap();
        assert_eq!(unknown.status, StatusType::Success);
        assert_eq!(unknown.message, known.message);
        assert_eq!(h.mailer.sent().len(), 1);

        let token = h.user("u1").await.unwrap().password_reset_token.unwrap();
        assert!(h.mailer.sent()[0].body.contains("resetToken="));

        let done = execute_password_reset(&h.services, &ctx, "u1@example.org", &token, "brand-new-pw")
            .await
            .unwrap();
        assert_eq!(done.status, StatusType::Success);
        let user = h.user("u1").await.unwrap();
        assert!(user.password_reset_token.is_none());
        assert!(h.services.authenticator.verify_password("brand-new-pw", &user.password));

        // single use
        let again = execute_password_reset(&h.services, &ctx, "u1@example.org", &token, "brand-new-pw")
            .await
            .unwrap();
        assert_eq!(again.status, StatusType::Failed);
    }

    #[tokio::test]
    async fn wrong_or_expired_reset_token_is_discarded() {
        let h = Harness::seeded().await;
        let ctx = RequestContext::anonymous("en-US");
        initiate_password_reset(&h.services, &ctx, "u1@example.org").await.unwrap();

        let wrong = execute_password_reset(&h.services, &ctx, "u1@example.org", "guess", "brand-new-pw")
            .await
            .unwrap();
        assert_eq!(wrong.status, StatusType::Failed);
        assert!(h.user("u1").await.unwrap().password_reset_token.is_none());

        let mut user = h.user("u1").await.unwrap();
        user.password_reset_token = Some("tok".into());
        user.password_reset_token_expiration = Some("2000-01-01T00:00:00Z".into());
        h.users.update_item(&user).await.unwrap();
        let expired = execute_password_reset(&h.services, &ctx, "u1@example.org", "tok", "brand-new-pw")
            .await
            .unwrap();
        assert_eq!(expired.message, h.services.t("executePasswordReset.expired", "en-US"));
    }

    #[tokio::test]
    async fn short_password_still_spends_the_reset_token() {
        let h = Harness::seeded().await;
        let ctx = RequestContext::anonymous("en-US");
        initiate_password_reset(&h.services, &ctx, "u1@example.org").await.unwrap();
        let token = h.user("u1").await.unwrap().password_reset_token.unwrap();

        let short = execute_password_reset(&h.services, &ctx, "u1@example.org", &token, "short")
            .await
            .unwrap();
        assert_eq!(short.status, StatusType::Failed);
        assert!(short.message.contains(&MIN_PASSWORD_LENGTH.to_string()));
        assert!(h.user("u1").await.unwrap().password_reset_token.is_none());

        let retry = execute_password_reset(&h.services, &ctx, "u1@example.org", &token, "long-enough-pw")
            .await
            .unwrap();
        assert_eq!(retry.message, h.services.t("executePasswordReset.invalid", "en-US"));
    }

    #[tokio::test]
    async fn failed_reset_mail_clears_token() {
        let h = Harness::with_mailer(RecordingMailer::failing());
        h.add_org("org1", &["u1"]).await;
        h.add_user("u1", "org1", RoleType::User).await;
        let ctx = RequestContext::anonymous("en-US");

        let result = initiate_password_reset(&h.services, &ctx, "u1@example.org").await.unwrap();
        assert_eq!(result.status, StatusType::Failed);
        assert!(h.user("u1").await.unwrap().password_reset_token.is_none());
    }

    #[tokio::test]
    async fn delete_user_requires_admin_and_cascades() {
        let h = Harness::seeded().await;
        let forbidden = delete_user(&h.services, &h.ctx("u1").await, "admin").await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        let ok = delete_user(&h.services, &h.ctx("admin").await, "u1").await.unwrap();
        assert_eq!(ok.status, StatusType::Success);
        assert!(h.user("u1").await.is_none());
        let org = h.organizations.item_by_id("org1").await.unwrap().unwrap();
        assert_eq!(org.users, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn deleting_a_member_of_several_orgs_needs_admin_of_each() {
        let h = Harness::seeded().await;
        h.add_org("org2", &["boss", "u1"]).await;
        h.add_user("boss", "org2", RoleType::Admin).await;
        let mut member = h.user("u1").await.unwrap();
        member.roles.push(DbRole { org_id: "org2".into(), role_type: RoleType::User });
        h.users.update_item(&member).await.unwrap();

        let partial = delete_user(&h.services, &h.ctx("admin").await, "u1").await;
        assert!(matches!(partial, Err(AppError::Forbidden(_))));
        assert!(h.user("u1").await.is_some());

        let mut both = h.user("admin").await.unwrap();
        both.roles.push(DbRole { org_id: "org2".into(), role_type: RoleType::Admin });
        h.users.update_item(&both).await.unwrap();
        let ok = delete_user(&h.services, &h.ctx("admin").await, "u1").await.unwrap();
        assert_eq!(ok.status, StatusType::Success);
        assert!(h.user("u1").await.is_none());
        for (org_id, left) in [("org1", "admin"), ("org2", "boss")] {
            let org = h.organizations.item_by_id(org_id).await.unwrap().unwrap();
            assert_eq!(org.users, vec![left.to_string()]);
        }
    }

    #[tokio::test]
    async fn remove_from_organization_reports_non_members() {
        let h = Harness::seeded().await;
        h.add_user("outsider", "org2", RoleType::User).await;
        let ctx = h.ctx("admin").await;

        let missing = remove_user_from_organization(&h.services, &ctx, "outsider", "org1").await.unwrap();
        assert_eq!(missing.status, StatusType::Failed);

        let removed = remove_user_from_organization(&h.services, &ctx, "u1", "org1").await.unwrap();
        assert_eq!(removed.status, StatusType::Success);
        assert!(removed.user.unwrap().roles.is_empty());
    }

    #[tokio::test]
    async fn marking_mentions_publishes_updates() {
        let h = Harness::seeded().await;
        let mut user = h.user("u1").await.unwrap();
        for (engagement_id, created_at) in [("e1", "2021-01-01T00:00:00Z"), ("e2", "2021-01-02T00:00:00Z")] {
            user.mentions.push(DbMention {
                engagement_id: engagement_id.into(),
                created_at: created_at.into(),
                created_by: "admin".into(),
                message: None,
                seen: false,
                dismissed: false,
            });
        }
        h.users.update_item(&user).await.unwrap();
        let ctx = h.ctx("u1").await;
        let mut updates = Box::pin(h.services.publisher.subscribe_to_mentions("u1"));

        let one = MentionInput {
            engagement_id: "e1".into(),
            created_at: "2021-01-01T00:00:00Z".into(),
            mark_all: None,
            value: None,
        };
        let result = mark_mention_seen(&h.services, &ctx, one).await.unwrap();
        assert_eq!(result.status, StatusType::Success);
        let event = updates.next().await.unwrap();
        assert_eq!(event.action, ActionType::Updated);
        assert_eq!(event.mention.unwrap().engagement_id, "e1");

        let all = MentionInput {
            engagement_id: String::new(),
            created_at: String::new(),
            mark_all: Some(true),
            value: Some(true),
        };
        mark_mention_dismissed(&h.services, &ctx, all).await.unwrap();
        let stored = h.user("u1").await.unwrap();
        assert!(stored.mentions.iter().all(|m| m.dismissed));
        assert!(stored.mentions[0].seen && !stored.mentions[1].seen);

        let unknown = MentionInput {
            engagement_id: "nope".into(),
            created_at: "x".into(),
            mark_all: None,
            value: None,
        };
        let missing = mark_mention_seen(&h.services, &ctx, unknown).await.unwrap();
        assert_eq!(missing.status, StatusType::Failed);
    }
}
