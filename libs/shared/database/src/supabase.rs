use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::DatabaseError;

/// Thin PostgREST client for the Supabase project.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| DatabaseError::InvalidRequest("anon key is not a valid header value".to_string()))?;
        headers.insert("apikey", api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Fall back to the anon key so public reads still pass row-level security.
        let bearer = auth_token.unwrap_or(&self.anon_key);
        if !bearer.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|_| DatabaseError::InvalidRequest("bearer token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// `Prefer: return=representation`, so writes echo the affected rows.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let text = self.send(method, path, auth_token, body, extra_headers).await?;
        let data = serde_json::from_str::<T>(&text)?;
        Ok(data)
    }

    /// Issue a request whose response body is irrelevant (e.g. DELETE without representation).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), DatabaseError> {
        self.send(method, path, auth_token, body, None).await.map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<String, DatabaseError> {
        if self.base_url.is_empty() {
            return Err(DatabaseError::Unavailable("SUPABASE_URL is not configured".to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), text));
        }

        Ok(text)
    }
}

fn classify_failure(status: u16, body: String) -> DatabaseError {
    let sql_state = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_string));

    // Only unique and exclusion violations are slot conflicts. A 409 with another
    // SQL state (e.g. a foreign key violation) is a plain API error.
    match (status, sql_state.as_deref()) {
        (_, Some("23505" | "23P01")) | (409, None) => {
            warn!("Constraint conflict ({}): {}", status, body);
            DatabaseError::Conflict(body)
        }
        (401 | 403, _) => {
            error!("API auth error ({}): {}", status, body);
            DatabaseError::Auth(body)
        }
        (404, _) => DatabaseError::NotFound(body),
        (500..=599, _) => {
            error!("Upstream error ({}): {}", status, body);
            DatabaseError::Unavailable(format!("status {}: {}", status, body))
        }
        _ => {
            error!("API error ({}): {}", status, body);
            DatabaseError::Api { status, body }
        }
    }
}
