use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use greatbig::services::AuthConfig;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub scope: KeyScope,
}

#[derive(Clone)]
pub struct ApiKeyAuth {
    read_only_keys: Vec<String>,
    read_write_keys: Vec<String>,
}

impl ApiKeyAuth {
    pub fn from_config(config: &AuthConfig) -> Self {
        let clean = |keys: &[String]| -> Vec<String> {
            keys.iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            read_only_keys: clean(&config.read_only_keys),
            read_write_keys: clean(&config.read_write_keys),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.read_only_keys.is_empty() || !self.read_write_keys.is_empty()
    }

    pub fn authenticate(&self, token: &str) -> Option<AuthContext> {
        if contains_key(&self.read_write_keys, token) {
            Some(AuthContext {
                scope: KeyScope::ReadWrite,
            })
        } else if contains_key(&self.read_only_keys, token) {
            Some(AuthContext {
                scope: KeyScope::ReadOnly,
            })
        } else {
            None
        }
    }
}

/// Compare against every key without short-circuiting on the first match
fn contains_key(keys: &[String], token: &str) -> bool {
    keys.iter().fold(false, |found, key| {
        found | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
    })
}

pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let auth = request.extensions().get::<ApiKeyAuth>().cloned();

    let Some(auth) = auth else {
        return next.run(request).await;
    };

    if !auth.is_enabled() {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) => match auth.authenticate(token) {
            Some(context) => {
                let mut request = request;
                request.extensions_mut().insert(context);
                next.run(request).await
            },
            None => (StatusCode::UNAUTHORIZED, "Invalid API key").into_response(),
        },
        None => (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response(),
    }
}

/// Middleware to enforce write access
pub async fn require_write(request: Request, next: Next) -> Response {
    if let Some(context) = request.extensions().get::<AuthContext>() {
        if context.scope != KeyScope::ReadWrite {
            return (StatusCode::FORBIDDEN, "Write access required").into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(ro: &[&str], rw: &[&str]) -> ApiKeyAuth {
        ApiKeyAuth::from_config(&AuthConfig {
            read_only_keys: ro.iter().map(|s| s.to_string()).collect(),
            read_write_keys: rw.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn disabled_without_keys() {
        assert!(!auth(&[], &[]).is_enabled());
        assert!(!auth(&["  "], &[""]).is_enabled());
    }

    #[test]
    fn resolves_scopes() {
        let auth = auth(&["reader"], &["writer"]);
        assert_eq!(
            auth.authenticate("writer").unwrap().scope,
            KeyScope::ReadWrite
        );
        assert_eq!(
            auth.authenticate("reader").unwrap().scope,
            KeyScope::ReadOnly
        );
        assert!(auth.authenticate("stranger").is_none());
        assert!(auth.authenticate("write").is_none());
    }
}
