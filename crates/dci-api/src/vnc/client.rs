// VNC API HTTP client
//
// Wraps `reqwest::Client` with Tungsten Fabric URL construction, fq-name
// resolution, and status-code mapping. Resource operations live in
// sibling files as inherent methods to keep this module focused on
// transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::vnc::models::{DEFAULT_DOMAIN, FqNameToIdRequest, FqNameToIdResponse};

/// How requests to the VNC API server are authenticated.
#[derive(Debug, Clone, Default)]
pub enum VncAuth {
    /// API server running with `auth = noauth`.
    #[default]
    None,
    /// HTTP basic credentials (API server `auth = keystone` behind a proxy
    /// or the built-in basic authenticator).
    Basic {
        username: String,
        password: SecretString,
    },
    /// Pre-issued Keystone token, sent as `X-Auth-Token`.
    Token(SecretString),
}

/// Raw HTTP client for one project on one Tungsten Fabric API server.
pub struct VncClient {
    http: reqwest::Client,
    base_url: Url,
    project: String,
    auth: VncAuth,
}

impl VncClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API server root, e.g. `http://10.0.0.5:8082`.
    pub fn new(
        base_url: Url,
        project: impl Into<String>,
        auth: VncAuth,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let VncAuth::Token(token) = &auth {
            let mut value = reqwest::header::HeaderValue::from_str(token.expose_secret())
                .map_err(|e| Error::Authentication {
                    message: format!("invalid token header value: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert("X-Auth-Token", value);
        }
        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url,
            project: project.into(),
            auth,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        project: impl Into<String>,
        auth: VncAuth,
    ) -> Self {
        Self {
            http,
            base_url,
            project: project.into(),
            auth,
        }
    }

    /// The project every DCI object is scoped to.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The API server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fully-qualified name of an object directly under the project.
    pub fn fq_name(&self, name: &str) -> Vec<String> {
        vec![
            DEFAULT_DOMAIN.to_owned(),
            self.project.clone(),
            name.to_owned(),
        ]
    }

    /// Fully-qualified name of the project itself.
    pub fn project_fq_name(&self) -> Vec<String> {
        vec![DEFAULT_DOMAIN.to_owned(), self.project.clone()]
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            VncAuth::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
            VncAuth::None | VncAuth::Token(_) => builder,
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        resource: &'static str,
        identifier: &str,
    ) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.authorize(self.http.get(url)).send().await?;
        let body = Self::check_status(resp, resource, identifier).await?;
        Self::decode(&body)
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
        resource: &'static str,
        identifier: &str,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.authorize(self.http.post(url).json(body)).send().await?;
        let body = Self::check_status(resp, resource, identifier).await?;
        Self::decode(&body)
    }

    pub(crate) async fn delete(
        &self,
        url: Url,
        resource: &'static str,
        identifier: &str,
    ) -> Result<(), Error> {
        debug!("DELETE {url}");
        let resp = self.authorize(self.http.delete(url)).send().await?;
        Self::check_status(resp, resource, identifier).await?;
        Ok(())
    }

    /// Map non-success statuses onto typed errors, returning the body text
    /// on success.
    async fn check_status(
        resp: reqwest::Response,
        resource: &'static str,
        identifier: &str,
    ) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let preview = body.chars().take(200).collect::<String>();
        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Error::Authentication {
                    message: format!("HTTP {status}: {preview}"),
                }
            }
            reqwest::StatusCode::NOT_FOUND => Error::NotFound {
                resource,
                identifier: identifier.to_owned(),
            },
            reqwest::StatusCode::CONFLICT => Error::RefsExist {
                resource,
                identifier: identifier.to_owned(),
                message: preview,
            },
            _ => Error::Vnc {
                message: preview,
                status: status.as_u16(),
            },
        })
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })
    }

    // ── Name resolution ──────────────────────────────────────────────

    /// Resolve an fq-name to a UUID via `POST /fqname-to-id`.
    pub async fn fq_name_to_id(&self, kind: &'static str, fq_name: &[String]) -> Result<Uuid, Error> {
        let url = self.url("fqname-to-id")?;
        let body = FqNameToIdRequest { kind, fq_name };
        let resp: FqNameToIdResponse = self.post(url, &body, kind, &fq_name.join(":")).await?;
        Ok(resp.uuid)
    }

    /// Resolve the configured project, failing if it does not exist.
    ///
    /// Doubles as a liveness probe for the API server.
    pub async fn project_uuid(&self) -> Result<Uuid, Error> {
        self.fq_name_to_id("project", &self.project_fq_name()).await
    }
}
