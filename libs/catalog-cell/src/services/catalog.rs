// libs/catalog-cell/src/services/catalog.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use booking_cell::models::{Location, Service, SlotHold, TimeSlot};
use booking_cell::services::collaborators::{CareCatalog, RemoteError};

use crate::seed::CatalogSeed;

const PROVIDERS: [&str; 3] = ["Dra. Quispe Mamani", "Dr. Huamán Torres", "Dra. Castro León"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey {
    location_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
}

/// Slot identities and active holds. Slot ids are minted on first listing and
/// stay stable across re-listings so a hold can be correlated later.
#[derive(Default)]
struct SlotLedger {
    ids: HashMap<SlotKey, Uuid>,
    keys: HashMap<Uuid, SlotKey>,
    holds: HashMap<Uuid, DateTime<Utc>>,
}

impl SlotLedger {
    fn slot_id(&mut self, key: SlotKey) -> Uuid {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = Uuid::new_v4();
        self.ids.insert(key, id);
        self.keys.insert(id, key);
        id
    }

    /// Active hold expiry, pruning anything already elapsed.
    fn active_hold(&mut self, slot_id: Uuid, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.holds.get(&slot_id) {
            Some(until) if *until > now => Some(*until),
            Some(_) => {
                self.holds.remove(&slot_id);
                None
            }
            None => None,
        }
    }
}

/// Mocked remote slot catalog: locations, per-location service menus, and a
/// deterministic slot grid derived from operating hours and service duration.
pub struct InMemoryCareCatalog {
    locations: Vec<Location>,
    services: HashMap<Uuid, Vec<Service>>,
    ledger: RwLock<SlotLedger>,
    latency: Duration,
}

impl InMemoryCareCatalog {
    pub fn new(config: &AppConfig, seed: &CatalogSeed) -> Self {
        Self {
            locations: seed.locations.clone(),
            services: seed.services.clone(),
            ledger: RwLock::new(SlotLedger::default()),
            latency: Duration::from_millis(config.remote_latency_ms),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn location(&self, location_id: Uuid) -> Result<&Location, RemoteError> {
        self.locations
            .iter()
            .find(|l| l.id == location_id)
            .ok_or_else(|| RemoteError::Unavailable(format!("unknown location {}", location_id)))
    }
}

#[async_trait]
impl CareCatalog for InMemoryCareCatalog {
    async fn list_locations(&self) -> Result<Vec<Location>, RemoteError> {
        self.simulate_latency().await;
        Ok(self.locations.clone())
    }

    async fn list_services(&self, location_id: Uuid) -> Result<Vec<Service>, RemoteError> {
        self.simulate_latency().await;
        self.location(location_id)?;
        Ok(self.services.get(&location_id).cloned().unwrap_or_default())
    }

    async fn list_time_slots(
        &self,
        location_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, RemoteError> {
        self.simulate_latency().await;
        let location = self.location(location_id)?.clone();
        let service = self
            .services
            .get(&location_id)
            .and_then(|menu| menu.iter().find(|s| s.id == service_id))
            .cloned()
            .ok_or_else(|| RemoteError::Unavailable(format!("unknown service {}", service_id)))?;

        if !location.available {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let step = service.duration_minutes.max(5) as u32;
        let opens = location.opens_at.num_seconds_from_midnight() / 60;
        let closes = location.closes_at.num_seconds_from_midnight() / 60;

        let mut ledger = self.ledger.write().await;
        let mut slots = Vec::new();
        let mut minutes = opens;
        while minutes + step <= closes {
            let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap();
            let key = SlotKey {
                location_id,
                date,
                time,
            };
            let id = ledger.slot_id(key);
            let hold = ledger.active_hold(id, now);
            let provider = PROVIDERS[(minutes / 60) as usize % PROVIDERS.len()];

            slots.push(TimeSlot {
                id,
                date,
                time,
                duration_minutes: service.duration_minutes,
                location_id,
                provider_name: Some(provider.to_string()),
                available: true,
                reserved: hold.is_some(),
                reserved_until: hold,
            });
            minutes += step;
        }

        debug!(
            "Listed {} slots at {} for {} on {}",
            slots.len(),
            location.name,
            service.name,
            date
        );
        Ok(slots)
    }

    async fn acquire_hold(
        &self,
        slot_id: Uuid,
        ttl_minutes: i64,
    ) -> Result<SlotHold, RemoteError> {
        self.simulate_latency().await;
        let now = Utc::now();
        let mut ledger = self.ledger.write().await;

        if !ledger.keys.contains_key(&slot_id) {
            return Err(RemoteError::Unavailable(format!("unknown slot {}", slot_id)));
        }
        if ledger.active_hold(slot_id, now).is_some() {
            warn!("Hold rejected, slot {} already held", slot_id);
            return Err(RemoteError::SlotUnavailable);
        }

        let reserved_until = now + chrono::Duration::minutes(ttl_minutes);
        ledger.holds.insert(slot_id, reserved_until);
        debug!("Granted hold on slot {} until {}", slot_id, reserved_until);
        Ok(SlotHold {
            slot_id,
            reserved_until,
        })
    }
}
