// libs/catalog-cell/src/services/directory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use booking_cell::models::{Patient, PatientRegistration};
use booking_cell::services::collaborators::{PatientDirectory, RemoteError};

use crate::seed::CatalogSeed;

/// Mocked patient registry, keyed by identity number.
pub struct InMemoryPatientDirectory {
    patients: RwLock<HashMap<String, Patient>>,
    latency: Duration,
}

impl InMemoryPatientDirectory {
    pub fn new(config: &AppConfig, seed: &CatalogSeed) -> Self {
        let patients = seed
            .patients
            .iter()
            .map(|p| (p.identity_number.clone(), p.clone()))
            .collect();
        Self {
            patients: RwLock::new(patients),
            latency: Duration::from_millis(config.remote_latency_ms),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl PatientDirectory for InMemoryPatientDirectory {
    async fn search_patient(
        &self,
        identity_number: &str,
    ) -> Result<Option<Patient>, RemoteError> {
        self.simulate_latency().await;
        debug!("Directory lookup for {}", identity_number);
        Ok(self.patients.read().await.get(identity_number).cloned())
    }

    async fn register_patient(
        &self,
        registration: &PatientRegistration,
    ) -> Result<Patient, RemoteError> {
        self.simulate_latency().await;
        let mut patients = self.patients.write().await;
        if patients.contains_key(&registration.identity_number) {
            return Err(RemoteError::Unavailable(format!(
                "patient {} is already registered",
                registration.identity_number
            )));
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            identity_number: registration.identity_number.clone(),
            given_names: registration.given_names.clone(),
            family_names: registration.family_names.clone(),
            phone: registration.phone.clone(),
            email: registration.email.clone(),
            birth_date: registration.birth_date,
        };
        patients.insert(patient.identity_number.clone(), patient.clone());
        debug!("Registered patient {}", patient.identity_number);
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::default_seed;
    use chrono::NaiveDate;

    fn directory() -> InMemoryPatientDirectory {
        InMemoryPatientDirectory::new(&AppConfig::for_tests(), &default_seed())
    }

    #[tokio::test]
    async fn test_seeded_patient_is_found() {
        let found = directory().search_patient("12345678").await.unwrap();
        assert_eq!(found.unwrap().given_names, "María");
    }

    #[tokio::test]
    async fn test_unknown_identity_number_is_not_found() {
        let found = directory().search_patient("99999999").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_registration_persists_and_rejects_duplicates() {
        let dir = directory();
        let registration = PatientRegistration {
            identity_number: "99999999".to_string(),
            given_names: "Jorge".to_string(),
            family_names: "Salas Vega".to_string(),
            phone: "912345678".to_string(),
            email: "jorge.salas@example.com".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 11, 2).unwrap(),
        };

        let patient = dir.register_patient(&registration).await.unwrap();
        assert_eq!(patient.identity_number, "99999999");
        assert!(dir.search_patient("99999999").await.unwrap().is_some());

        let duplicate = dir.register_patient(&registration).await;
        assert!(matches!(duplicate, Err(RemoteError::Unavailable(_))));
    }
}
