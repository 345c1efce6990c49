//! Shared harness for router tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use directory_access::{SessionConfig, SessionManager, TokenConfig, TokenManager};
use directory_api::{create_router, AppConfig, AppState};
use directory_core::{NewUser, User};
use directory_crypto::{hash_password, CredentialCipher, EncryptionKey};
use directory_storage::{DirectoryStore, InMemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";

/// A router over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub state: Arc<AppState>,
}

/// How a request authenticates.
#[derive(Debug, Clone)]
pub enum Auth {
    Anonymous,
    Bearer(String),
    /// Session cookie plus the CSRF cookie/header pair, when given.
    Session { session: String, csrf: Option<String> },
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of a cookie set by the response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie(name).and_then(|raw| {
            let first = raw.split(';').next()?;
            let (_, value) = first.split_once('=')?;
            Some(value.to_string())
        })
    }

    /// The raw `Set-Cookie` header for a cookie.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig {
            debug: true,
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let cipher = CredentialCipher::new(&EncryptionKey::generate()).unwrap();
        let state = AppState::builder()
            .store(store.clone() as Arc<dyn DirectoryStore>)
            .cipher(cipher)
            .tokens(Arc::new(TokenManager::new(TokenConfig::new("test-secret"))))
            .sessions(Arc::new(SessionManager::new(SessionConfig::default())))
            .config(config)
            .build()
            .unwrap();
        let state = Arc::new(state);

        Self {
            router: create_router(state.clone()),
            store,
            state,
        }
    }

    pub async fn create_user(&self, username: &str, is_staff: bool) -> User {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                is_staff,
            })
            .await
            .unwrap()
    }

    /// Creates a user and returns an access token for it.
    pub async fn bearer(&self, username: &str, is_staff: bool) -> Auth {
        let user = self.create_user(username, is_staff).await;
        let pair = self.state.tokens.create_token_pair(&user).unwrap();
        Auth::Bearer(pair.access)
    }

    /// Logs in through the API and returns session credentials.
    pub async fn session(&self, username: &str, is_staff: bool) -> Auth {
        self.create_user(username, is_staff).await;

        let csrf = self.send(Method::GET, "/api/auth/csrf", &Auth::Anonymous, None).await;
        let token = csrf.body["csrfToken"].as_str().unwrap().to_string();

        let login = self
            .send(
                Method::POST,
                "/api/auth/login",
                &Auth::Session {
                    session: String::new(),
                    csrf: Some(token),
                },
                Some(serde_json::json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);

        Auth::Session {
            session: login.cookie("sessionid").unwrap(),
            csrf: login.cookie("csrftoken"),
        }
    }

    pub async fn send(&self, method: Method, uri: &str, auth: &Auth, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        match auth {
            Auth::Anonymous => {}
            Auth::Bearer(token) => {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            Auth::Session { session, csrf } => {
                let mut cookies = vec![format!("sessionid={session}")];
                if let Some(csrf) = csrf {
                    cookies.push(format!("csrftoken={csrf}"));
                    builder = builder.header("x-csrftoken", csrf.as_str());
                }
                builder = builder.header(header::COOKIE, cookies.join("; "));
            }
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.dispatch(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, auth: &Auth) -> TestResponse {
        self.send(Method::GET, uri, auth, None).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, headers, body }
    }
}
