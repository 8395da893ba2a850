//! Shared data holder used by every ecobee entity

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::client::{EcobeeClient, EcobeeResult};
use super::model::{RemoteSensor, Thermostat};
use super::EcobeeConfig;

/// Wraps the vendor client and throttles cloud refreshes
///
/// Every entity calls [`EcobeeData::update`] on each poll; only the first
/// call within `min_time_between_updates` reaches the cloud. Concurrent
/// callers wait for the in-flight refresh instead of starting their own.
pub struct EcobeeData {
    client: Arc<dyn EcobeeClient>,
    min_time_between_updates: Duration,
    last_update: Mutex<Option<Instant>>,
}

impl EcobeeData {
    pub fn new(client: Arc<dyn EcobeeClient>, config: &EcobeeConfig) -> Self {
        Self::with_throttle(client, config.min_time_between_updates())
    }

    pub fn with_throttle(client: Arc<dyn EcobeeClient>, min_time_between_updates: Duration) -> Self {
        Self {
            client,
            min_time_between_updates,
            last_update: Mutex::new(None),
        }
    }

    /// Refresh from the cloud unless a refresh happened recently
    ///
    /// Returns whether the client was actually refreshed.
    #[instrument(skip(self))]
    pub async fn update(&self) -> EcobeeResult<bool> {
        let mut last_update = self.last_update.lock().await;

        if let Some(at) = *last_update {
            if at.elapsed() < self.min_time_between_updates {
                debug!("Skipping throttled ecobee update");
                return Ok(false);
            }
        }

        self.client.update().await?;
        *last_update = Some(Instant::now());
        debug!("Updated ecobee data");
        Ok(true)
    }

    /// Refresh from the cloud regardless of the throttle
    #[instrument(skip(self))]
    pub async fn update_forced(&self) -> EcobeeResult<()> {
        let mut last_update = self.last_update.lock().await;
        self.client.update().await?;
        *last_update = Some(Instant::now());
        debug!("Updated ecobee data without throttle");
        Ok(())
    }

    pub fn thermostat_count(&self) -> usize {
        self.client.thermostat_count()
    }

    pub fn get_thermostat(&self, index: usize) -> EcobeeResult<Thermostat> {
        self.client.get_thermostat(index)
    }

    pub fn get_remote_sensors(&self, index: usize) -> EcobeeResult<Vec<RemoteSensor>> {
        self.client.get_remote_sensors(index)
    }

    pub fn set_ventilator_min_on_time_home(&self, index: usize, minutes: i64) -> EcobeeResult<()> {
        debug!(index, minutes, "Setting ventilator minimum on time (home)");
        self.client.set_ventilator_min_on_time_home(index, minutes)
    }

    pub fn set_ventilator_min_on_time_away(&self, index: usize, minutes: i64) -> EcobeeResult<()> {
        debug!(index, minutes, "Setting ventilator minimum on time (away)");
        self.client.set_ventilator_min_on_time_away(index, minutes)
    }

    pub fn set_ventilator_timer(&self, index: usize, on: bool) -> EcobeeResult<()> {
        debug!(index, on, "Setting ventilator timer");
        self.client.set_ventilator_timer(index, on)
    }
}
