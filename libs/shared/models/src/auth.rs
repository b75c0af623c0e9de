use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    /// Older tokens carry the subject as `user_id`.
    pub user_id: Option<serde_json::Value>,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    pub fn subject(&self) -> Option<String> {
        if let Some(sub) = &self.sub {
            return Some(sub.clone());
        }
        match &self.user_id {
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        }
    }

    /// First role claim that names an application role. Supabase puts
    /// `authenticated` at the top level and the app role in `app_metadata`.
    pub fn resolve_role(&self) -> Result<Role, String> {
        let metadata_role = |meta: &Option<serde_json::Value>| {
            meta.as_ref()
                .and_then(|meta| meta.get("role"))
                .and_then(|role| role.as_str())
                .map(str::to_string)
        };

        let candidates = [
            self.role.clone(),
            metadata_role(&self.app_metadata),
            metadata_role(&self.user_metadata),
        ];

        let mut first_error = None;
        for candidate in candidates.into_iter().flatten() {
            match candidate.parse::<Role>() {
                Ok(role) => return Ok(role),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| "Token has no role".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Psychologist,
    Psychiatrist,
    Admin,
}

impl Role {
    pub fn is_professional(&self) -> bool {
        matches!(self, Role::Psychologist | Role::Psychiatrist)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "patient" | "paciente" => Ok(Role::Patient),
            "psychologist" | "psicologo" | "psicólogo" => Ok(Role::Psychologist),
            "psychiatrist" | "psiquiatra" => Ok(Role::Psychiatrist),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Psychologist => write!(f, "psychologist"),
            Role::Psychiatrist => write!(f, "psychiatrist"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_user(&self, id: Uuid) -> bool {
        self.user_id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_legacy_portuguese_names() {
        assert_eq!("Paciente".parse::<Role>(), Ok(Role::Patient));
        assert_eq!("Psicologo".parse::<Role>(), Ok(Role::Psychologist));
        assert_eq!("Psiquiatra".parse::<Role>(), Ok(Role::Psychiatrist));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("authenticated".parse::<Role>().is_err());
    }

    #[test]
    fn supabase_role_comes_from_app_metadata() {
        let claims: JwtClaims = serde_json::from_value(serde_json::json!({
            "sub": "6f1c2a4e-9d1b-4c55-a0e2-2f3c5b7d9e11",
            "role": "authenticated",
            "app_metadata": { "provider": "email", "role": "psiquiatra" },
            "user_metadata": { "role": "patient" }
        }))
        .unwrap();
        assert_eq!(claims.resolve_role(), Ok(Role::Psychiatrist));

        let user_only: JwtClaims = serde_json::from_value(serde_json::json!({
            "role": "authenticated",
            "user_metadata": { "role": "paciente" }
        }))
        .unwrap();
        assert_eq!(user_only.resolve_role(), Ok(Role::Patient));

        let none: JwtClaims = serde_json::from_value(serde_json::json!({ "role": "authenticated" })).unwrap();
        assert_eq!(none.resolve_role(), Err("unknown role 'authenticated'".to_string()));
    }

    #[test]
    fn subject_falls_back_to_numeric_user_id() {
        let claims: JwtClaims = serde_json::from_value(serde_json::json!({
            "user_id": 42,
            "role": "patient"
        }))
        .unwrap();
        assert_eq!(claims.subject().as_deref(), Some("42"));
    }
}
