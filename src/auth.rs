use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Header carrying the login of the authenticated user, set by the session
/// layer in front of this service.
pub const USER_LOGIN_HEADER: &str = "x-user-login";

/// Login of the requesting user, if the session layer supplied one.
///
/// Authentication happens upstream; this extractor only reads the result and
/// never rejects a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUser(pub Option<String>);

impl SessionUser {
    pub fn login(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let login = parts
            .headers
            .get(USER_LOGIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Self(login))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> SessionUser {
        let (mut parts, _) = req.into_parts();
        SessionUser::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_login_header() {
        let req = Request::builder()
            .header(USER_LOGIN_HEADER, "alice")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.login(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_or_blank_header() {
        assert_eq!(extract(Request::new(())).await, SessionUser(None));

        let req = Request::builder()
            .header(USER_LOGIN_HEADER, "  ")
            .body(())
            .unwrap();
        assert_eq!(extract(req).await.login(), None);
    }
}
