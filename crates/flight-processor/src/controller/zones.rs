//! Restricted zone cache and proximity alert bookkeeping.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{info, warn};

use flight_core::{AlertLevel, ApplicationId, RestrictedZone};

use super::FlightController;

/// Zones in effect, replaced as a whole on every refresh.
#[derive(Debug, Clone, Default)]
pub struct ZoneCache {
    pub zones: Arc<Vec<RestrictedZone>>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl FlightController {
    /// Reload restricted zones from the store. A failed load keeps the previous cache.
    pub async fn refresh_zones(&self) {
        let mut zones = match self.store.get_restricted_zones().await {
            Ok(zones) => zones,
            Err(err) => {
                warn!(error = %format!("{:#}", err), "Restricted zone refresh failed, keeping cached zones");
                return;
            }
        };

        zones.retain(|zone| {
            let usable = zone.radius_m >= 0.0 && zone.lat.is_finite() && zone.lon.is_finite();
            if !usable {
                warn!(zone_id = zone.id, name = %zone.name, "Ignoring malformed restricted zone");
            }
            usable
        });

        let count = zones.len();
        *self.zones.write().await = ZoneCache {
            zones: Arc::new(zones),
            loaded_at: Some(self.now()),
        };
        info!(zones = count, "Loaded restricted zones into cache");
    }

    /// Current zone snapshot. Cheap: shares the cached vector.
    pub async fn zones(&self) -> Arc<Vec<RestrictedZone>> {
        Arc::clone(&self.zones.read().await.zones)
    }

    pub async fn zone_cache(&self) -> ZoneCache {
        self.zones.read().await.clone()
    }

    /// Record an alert; returns true only the first time per flight, zone and level.
    pub(crate) fn first_alert(
        &self,
        application_id: ApplicationId,
        zone_id: i64,
        level: AlertLevel,
    ) -> bool {
        match self.sent_alerts.entry((application_id, zone_id, level)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(self.now());
                true
            }
        }
    }

    pub(crate) fn clear_alerts(&self, application_id: ApplicationId) {
        self.sent_alerts
            .retain(|(flight, _, _), _| *flight != application_id);
    }
}
