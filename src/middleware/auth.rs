use crate::models::DbUser;
use crate::services::Services;
use actix_web::HttpRequest;

/// The authenticated specialist behind a request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: DbUser,
}

impl Identity {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Per-request data handed to every resolver.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    pub locale: String,
}

impl RequestContext {
    pub fn anonymous(locale: &str) -> Self {
        RequestContext { identity: None, locale: locale.to_string() }
    }

    pub fn for_user(user: DbUser, locale: &str) -> Self {
        RequestContext { identity: Some(Identity { user }), locale: locale.to_string() }
    }
}

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the identity for a raw token. Invalid or stale tokens yield an
/// anonymous context; the `auth` checks reject it where needed.
pub async fn context_for_token(services: &Services, token: Option<&str>, locale: String) -> RequestContext {
    let Some(token) = token else {
        return RequestContext { identity: None, locale };
    };

    let claims = match services.authenticator.verify_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("Rejected bearer token: {}", e);
            return RequestContext { identity: None, locale };
        }
    };

    match services.collections.users.item_by_id(&claims.sub).await {
        Ok(Some(user)) => RequestContext { identity: Some(Identity { user }), locale },
        Ok(None) => {
            log::warn!("⚠️  Token for unknown user {}", claims.sub);
            RequestContext { identity: None, locale }
        }
        Err(e) => {
            log::error!("❌ Failed to load identity {}: {}", claims.sub, e);
            RequestContext { identity: None, locale }
        }
    }
}

pub async fn context_for_request(services: &Services, req: &HttpRequest) -> RequestContext {
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    let locale = services.localization.negotiate(header("Accept-Language"));
    context_for_token(services, bearer_token(header("Authorization")), locale).await
}
