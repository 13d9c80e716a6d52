// libs/catalog-cell/src/seed.rs
//
// Reference data for the mocked remotes. Built once per process and shared
// into the collaborator services.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use uuid::Uuid;

use booking_cell::models::{Location, Patient, Service, ServiceCategory};

#[derive(Debug, Clone)]
pub struct CatalogSeed {
    pub locations: Vec<Location>,
    pub services: HashMap<Uuid, Vec<Service>>,
    pub patients: Vec<Patient>,
}

impl CatalogSeed {
    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }
}

fn location(name: &str, address: &str, phone: &str, opens: (u32, u32), closes: (u32, u32), available: bool) -> Location {
    Location {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: address.to_string(),
        phone: phone.to_string(),
        opens_at: NaiveTime::from_hms_opt(opens.0, opens.1, 0).unwrap(),
        closes_at: NaiveTime::from_hms_opt(closes.0, closes.1, 0).unwrap(),
        available,
    }
}

fn service(name: &str, category: ServiceCategory, duration_minutes: i32, price: f64, available: bool) -> Service {
    Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category,
        duration_minutes,
        price,
        available,
    }
}

fn service_menu() -> Vec<Service> {
    vec![
        service(
            "Consulta de medicina general",
            ServiceCategory::GeneralMedicine,
            30,
            80.0,
            true,
        ),
        service("Limpieza dental", ServiceCategory::Dentistry, 45, 120.0, true),
        service(
            "Blanqueamiento dental",
            ServiceCategory::Dentistry,
            60,
            250.0,
            false,
        ),
        service(
            "Consulta dermatológica",
            ServiceCategory::Dermatology,
            30,
            95.5,
            true,
        ),
        service(
            "Control oftalmológico",
            ServiceCategory::Ophthalmology,
            30,
            85.0,
            true,
        ),
        service(
            "Perfil de laboratorio",
            ServiceCategory::Laboratory,
            15,
            45.0,
            true,
        ),
        service(
            "Sesión de terapia física",
            ServiceCategory::Physiotherapy,
            60,
            70.0,
            true,
        ),
    ]
}

pub fn default_seed() -> CatalogSeed {
    let locations = vec![
        location(
            "Sede San Isidro",
            "Av. Javier Prado Este 1010, San Isidro",
            "014221100",
            (9, 0),
            (18, 0),
            true,
        ),
        location(
            "Sede Miraflores",
            "Av. Larco 345, Miraflores",
            "014458899",
            (8, 0),
            (20, 0),
            true,
        ),
        location(
            "Sede Surco",
            "Av. Caminos del Inca 257, Santiago de Surco",
            "012754433",
            (9, 0),
            (17, 0),
            true,
        ),
        // Under renovation; listed but not bookable.
        location(
            "Sede Callao",
            "Av. Sáenz Peña 620, Callao",
            "014296677",
            (9, 0),
            (17, 0),
            false,
        ),
    ];

    let services = locations
        .iter()
        .map(|l| (l.id, service_menu()))
        .collect::<HashMap<_, _>>();

    let patients = vec![Patient {
        id: Uuid::new_v4(),
        identity_number: "12345678".to_string(),
        given_names: "María".to_string(),
        family_names: "Fernández Rojas".to_string(),
        phone: "987654321".to_string(),
        email: "maria.fernandez@example.com".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 20).unwrap(),
    }];

    CatalogSeed {
        locations,
        services,
        patients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_contains_the_reference_location_and_service() {
        let seed = default_seed();
        let sede = seed.location_by_name("Sede San Isidro").unwrap();
        assert!(sede.available);

        let menu = &seed.services[&sede.id];
        assert!(menu.iter().any(|s| s.price == 80.0 && s.available));
    }

    #[test]
    fn test_seed_has_a_registered_patient() {
        let seed = default_seed();
        assert!(seed
            .patients
            .iter()
            .any(|p| p.identity_number == "12345678"));
    }
}
