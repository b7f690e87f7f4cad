// libs/directory-cell/tests/integration_test.rs

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::{
    DirectoryError, InMemoryPatientDirectory, InMemoryProfessionalDirectory,
    PatientDirectory, PatientRecord, PostgrestPatientDirectory,
    PostgrestProfessionalDirectory, ProfessionalDirectory, ProfessionalRecord,
    ProfessionalRole,
};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

fn test_config(backend_url: &str) -> AppConfig {
    AppConfig {
        backend_url: backend_url.to_string(),
        backend_api_key: "test-api-key".to_string(),
        notify_url: String::new(),
        bind_addr: "0.0.0.0:3000".to_string(),
    }
}

fn test_client(mock_server: &MockServer) -> Arc<PostgrestClient> {
    Arc::new(PostgrestClient::new(&test_config(&mock_server.uri())))
}

// ==============================================================================
// PATIENT DIRECTORY
// ==============================================================================

#[tokio::test]
async fn test_patient_lookup_queries_by_id() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestPatientDirectory::new(test_client(&mock_server));

    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .and(query_param("limit", "1"))
        .and(header("apikey", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": patient_id, "first_name": "John", "last_name": "Doe"}
        ])))
        .mount(&mock_server)
        .await;

    let patient = directory.find(patient_id).await.unwrap().unwrap();
    assert_eq!(patient.id, patient_id);
    assert_eq!(patient.full_name(), "John Doe");
}

#[tokio::test]
async fn test_missing_patient_resolves_to_none() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestPatientDirectory::new(test_client(&mock_server));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let patient = directory.find(Uuid::new_v4()).await.unwrap();
    assert!(patient.is_none());
}

#[tokio::test]
async fn test_directory_outage_maps_to_unavailable() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestPatientDirectory::new(test_client(&mock_server));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = directory.find(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
}

#[tokio::test]
async fn test_undecodable_patient_record_is_malformed() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestPatientDirectory::new(test_client(&mock_server));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "not-a-uuid", "first_name": 42}
        ])))
        .mount(&mock_server)
        .await;

    let result = directory.find(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DirectoryError::Malformed(_))));
}

// ==============================================================================
// PROFESSIONAL DIRECTORY
// ==============================================================================

#[tokio::test]
async fn test_professional_lookup_decodes_role_and_active_flag() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestProfessionalDirectory::new(test_client(&mock_server));

    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .and(query_param("id", format!("eq.{}", professional_id)))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": professional_id,
                "first_name": "Sarah",
                "last_name": "Chen",
                "role": "surgeon",
                "active": true
            }
        ])))
        .mount(&mock_server)
        .await;

    let professional = directory.find(professional_id).await.unwrap().unwrap();
    assert_eq!(professional.role, ProfessionalRole::Surgeon);
    assert!(professional.active);
    assert_eq!(professional.full_name(), "Sarah Chen");
}

#[tokio::test]
async fn test_missing_professional_resolves_to_none() {
    let mock_server = MockServer::start().await;
    let directory = PostgrestProfessionalDirectory::new(test_client(&mock_server));

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let professional = directory.find(Uuid::new_v4()).await.unwrap();
    assert!(professional.is_none());
}

// ==============================================================================
// IN-PROCESS DIRECTORIES
// ==============================================================================

#[tokio::test]
async fn test_in_memory_directories_find_what_was_added() {
    let patients = InMemoryPatientDirectory::new();
    let professionals = InMemoryProfessionalDirectory::new();

    let patient_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();

    patients
        .add(PatientRecord {
            id: patient_id,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
        })
        .await;
    professionals
        .add(ProfessionalRecord {
            id: professional_id,
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            role: ProfessionalRole::Physician,
            active: true,
        })
        .await;

    assert!(patients.find(patient_id).await.unwrap().is_some());
    assert!(patients.find(Uuid::new_v4()).await.unwrap().is_none());

    let professional = professionals.find(professional_id).await.unwrap().unwrap();
    assert_eq!(professional.role, ProfessionalRole::Physician);
    assert!(professionals.find(Uuid::new_v4()).await.unwrap().is_none());
}
