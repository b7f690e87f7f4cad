use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use crate::models::{DirectoryError, PatientRecord, ProfessionalRecord};

// ==============================================================================
// DIRECTORY TRAITS
// ==============================================================================

/// Read-only lookup against the external patient directory.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn find(&self, patient_id: Uuid) -> Result<Option<PatientRecord>, DirectoryError>;
}

/// Read-only lookup against the external professional directory.
#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    async fn find(&self, professional_id: Uuid)
        -> Result<Option<ProfessionalRecord>, DirectoryError>;
}

// ==============================================================================
// RELATIONAL BACKEND IMPLEMENTATIONS
// ==============================================================================

pub struct PostgrestPatientDirectory {
    db: Arc<PostgrestClient>,
}

impl PostgrestPatientDirectory {
    pub fn new(db: Arc<PostgrestClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatientDirectory for PostgrestPatientDirectory {
    async fn find(&self, patient_id: Uuid) -> Result<Option<PatientRecord>, DirectoryError> {
        debug!("Looking up patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}&limit=1", patient_id);
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        match result.into_iter().next() {
            Some(record) => {
                let patient: PatientRecord = serde_json::from_value(record)
                    .map_err(|e| DirectoryError::Malformed(format!("patient record: {}", e)))?;
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }
}

pub struct PostgrestProfessionalDirectory {
    db: Arc<PostgrestClient>,
}

impl PostgrestProfessionalDirectory {
    pub fn new(db: Arc<PostgrestClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfessionalDirectory for PostgrestProfessionalDirectory {
    async fn find(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalRecord>, DirectoryError> {
        debug!("Looking up professional {}", professional_id);

        let path = format!("/rest/v1/professionals?id=eq.{}&limit=1", professional_id);
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        match result.into_iter().next() {
            Some(record) => {
                let professional: ProfessionalRecord = serde_json::from_value(record)
                    .map_err(|e| {
                        DirectoryError::Malformed(format!("professional record: {}", e))
                    })?;
                Ok(Some(professional))
            }
            None => Ok(None),
        }
    }
}

// ==============================================================================
// IN-PROCESS IMPLEMENTATIONS
// ==============================================================================

/// In-process directory for single-node deployments and tests.
#[derive(Default)]
pub struct InMemoryPatientDirectory {
    patients: RwLock<Vec<PatientRecord>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, patient: PatientRecord) {
        self.patients.write().await.push(patient);
    }
}

#[async_trait]
impl PatientDirectory for InMemoryPatientDirectory {
    async fn find(&self, patient_id: Uuid) -> Result<Option<PatientRecord>, DirectoryError> {
        let patients = self.patients.read().await;
        Ok(patients.iter().find(|p| p.id == patient_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryProfessionalDirectory {
    professionals: RwLock<Vec<ProfessionalRecord>>,
}

impl InMemoryProfessionalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, professional: ProfessionalRecord) {
        self.professionals.write().await.push(professional);
    }
}

#[async_trait]
impl ProfessionalDirectory for InMemoryProfessionalDirectory {
    async fn find(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalRecord>, DirectoryError> {
        let professionals = self.professionals.read().await;
        Ok(professionals.iter().find(|p| p.id == professional_id).cloned())
    }
}
