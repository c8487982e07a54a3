//! Authorization checks run before a resolver touches any data.

use super::auth::{Identity, RequestContext};
use crate::models::RoleType;
use crate::utils::error::AppError;

/// `auth`: any signed-in specialist.
pub fn require_auth(ctx: &RequestContext) -> Result<&Identity, AppError> {
    ctx.identity
        .as_ref()
        .ok_or_else(|| AppError::Authentication("sign in required".to_string()))
}

/// `orgAuth`: member of `org_id` holding at least `min_role`.
pub fn require_org_role<'a>(
    ctx: &'a RequestContext,
    org_id: &str,
    min_role: RoleType,
) -> Result<&'a Identity, AppError> {
    let identity = require_auth(ctx)?;
    match identity.user.role_in(org_id) {
        Some(role) if role.rank() >= min_role.rank() => Ok(identity),
        Some(_) => Err(AppError::Forbidden(format!("{:?} role required in {}", min_role, org_id))),
        None => Err(AppError::Forbidden(format!("not a member of {}", org_id))),
    }
}

/// The user themselves, or an admin of `org_id`.
pub fn require_self_or_org_admin<'a>(
    ctx: &'a RequestContext,
    user_id: &str,
    org_id: Option<&str>,
) -> Result<&'a Identity, AppError> {
    let identity = require_auth(ctx)?;
    if identity.id() == user_id {
        return Ok(identity);
    }
    match org_id {
        Some(org_id) => require_org_role(ctx, org_id, RoleType::Admin),
        None => Err(AppError::Forbidden("only the user may do this".to_string())),
    }
}

pub fn require_self<'a>(ctx: &'a RequestContext, user_id: &str) -> Result<&'a Identity, AppError> {
    require_self_or_org_admin(ctx, user_id, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::user;

    #[test]
    fn anonymous_requests_are_unauthenticated() {
        let ctx = RequestContext::anonymous("en-US");
        assert!(matches!(require_auth(&ctx), Err(AppError::Authentication(_))));
        assert!(matches!(
            require_org_role(&ctx, "org1", RoleType::User),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn org_role_rank_is_enforced() {
        let ctx = RequestContext::for_user(user("u1", "org1", RoleType::User), "en-US");
        assert!(require_org_role(&ctx, "org1", RoleType::User).is_ok());
        assert!(matches!(
            require_org_role(&ctx, "org1", RoleType::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            require_org_role(&ctx, "org2", RoleType::User),
            Err(AppError::Forbidden(_))
        ));

        let admin = RequestContext::for_user(user("a1", "org1", RoleType::Admin), "en-US");
        assert!(require_org_role(&admin, "org1", RoleType::User).is_ok());
        assert!(require_self_or_org_admin(&admin, "u1", Some("org1")).is_ok());
        assert!(require_self_or_org_admin(&ctx, "a1", Some("org1")).is_err());
        assert!(require_self(&ctx, "u1").is_ok());
    }
}
