//! In-memory ecobee client
//!
//! Serves thermostats from memory, counts refreshes and records every
//! setter call for assertions.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ha_components::ecobee::{
    EcobeeClient, EcobeeError, EcobeeResult, RemoteSensor, Thermostat, CAPABILITY_OCCUPANCY,
};

/// A setter call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum SetterCall {
    MinOnTimeHome(usize, i64),
    MinOnTimeAway(usize, i64),
    Timer(usize, bool),
}

#[derive(Default)]
pub struct MockClient {
    thermostats: Mutex<Vec<Thermostat>>,
    calls: Mutex<Vec<SetterCall>>,
    updates: AtomicUsize,
    fail_updates: AtomicBool,
    fail_setters: AtomicBool,
}

impl MockClient {
    pub fn new(thermostats: Vec<Thermostat>) -> Self {
        Self {
            thermostats: Mutex::new(thermostats),
            ..Default::default()
        }
    }

    /// Number of `update()` calls that reached the client
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<SetterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_setters(&self, fail: bool) {
        self.fail_setters.store(fail, Ordering::SeqCst);
    }

    /// Change a thermostat as if the cloud reported new data
    pub fn modify(&self, index: usize, f: impl FnOnce(&mut Thermostat)) {
        f(&mut self.thermostats.lock().unwrap()[index]);
    }

    /// Set the occupancy capability value of a named sensor
    pub fn set_occupancy(&self, index: usize, sensor: &str, value: &str) {
        self.modify(index, |t| {
            let sensor = t
                .remote_sensors
                .iter_mut()
                .find(|s| s.name == sensor)
                .expect("sensor exists");
            let capability = sensor
                .capability
                .iter_mut()
                .find(|c| c.capability_type == CAPABILITY_OCCUPANCY)
                .expect("sensor reports occupancy");
            capability.value = value.to_string();
        });
    }

    fn record(&self, call: SetterCall) -> EcobeeResult<()> {
        if self.fail_setters.load(Ordering::SeqCst) {
            return Err(EcobeeError::Api("setter rejected".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl EcobeeClient for MockClient {
    async fn update(&self) -> EcobeeResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(EcobeeError::Api("cloud unreachable".to_string()));
        }
        Ok(())
    }

    fn thermostat_count(&self) -> usize {
        self.thermostats.lock().unwrap().len()
    }

    fn get_thermostat(&self, index: usize) -> EcobeeResult<Thermostat> {
        self.thermostats
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .ok_or(EcobeeError::ThermostatNotFound(index))
    }

    fn get_remote_sensors(&self, index: usize) -> EcobeeResult<Vec<RemoteSensor>> {
        Ok(self.get_thermostat(index)?.remote_sensors)
    }

    fn set_ventilator_min_on_time_home(&self, index: usize, minutes: i64) -> EcobeeResult<()> {
        self.record(SetterCall::MinOnTimeHome(index, minutes))
    }

    fn set_ventilator_min_on_time_away(&self, index: usize, minutes: i64) -> EcobeeResult<()> {
        self.record(SetterCall::MinOnTimeAway(index, minutes))
    }

    fn set_ventilator_timer(&self, index: usize, on: bool) -> EcobeeResult<()> {
        self.record(SetterCall::Timer(index, on))
    }
}
