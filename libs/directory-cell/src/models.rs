// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// DIRECTORY RECORDS
// ==============================================================================

/// Patient as the external directory sees it. This subsystem only ever reads
/// these records to validate booking inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl PatientRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: ProfessionalRole,
    pub active: bool,
}

impl ProfessionalRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Role decides which event kinds the professional may host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalRole {
    Physician,
    Surgeon,
}

impl fmt::Display for ProfessionalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfessionalRole::Physician => write!(f, "physician"),
            ProfessionalRole::Surgeon => write!(f, "surgeon"),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed directory record: {0}")]
    Malformed(String),
}
