use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Professional, ProfessionalRef, ScheduleError};

/// Lookup of professionals by id and type.
#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    async fn find(&self, professional: ProfessionalRef) -> Result<Option<Professional>, ScheduleError>;
}

pub struct SupabaseProfessionalDirectory {
    supabase: SupabaseClient,
}

impl SupabaseProfessionalDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ProfessionalDirectory for SupabaseProfessionalDirectory {
    async fn find(&self, professional: ProfessionalRef) -> Result<Option<Professional>, ScheduleError> {
        let path = format!(
            "/rest/v1/professionals?id=eq.{}&professional_type=eq.{}&select=id,professional_type,display_name,consultation_fee_cents,active",
            professional.id, professional.professional_type
        );
        let rows: Vec<Professional> = self.supabase.request(Method::GET, &path, None, None).await?;
        debug!("Directory lookup for {} returned {} rows", professional.id, rows.len());
        Ok(rows.into_iter().next())
    }
}

#[derive(Default)]
pub struct InMemoryProfessionalDirectory {
    professionals: RwLock<HashMap<Uuid, Professional>>,
}

impl InMemoryProfessionalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, professional: Professional) {
        self.professionals.write().await.insert(professional.id, professional);
    }
}

#[async_trait]
impl ProfessionalDirectory for InMemoryProfessionalDirectory {
    async fn find(&self, professional: ProfessionalRef) -> Result<Option<Professional>, ScheduleError> {
        let professionals = self.professionals.read().await;
        Ok(professionals
            .get(&professional.id)
            .filter(|p| p.professional_type == professional.professional_type)
            .cloned())
    }
}
