//! Shared harness for the ecobee integration tests

#![allow(dead_code)]

mod fixtures;
mod mock_client;

pub use fixtures::*;
pub use mock_client::*;

use std::sync::Arc;
use std::time::Duration;

use ha_components::ecobee::EcobeeData;

/// Mock client over the fixture thermostats plus a data holder that never
/// throttles
pub fn setup_data() -> (Arc<MockClient>, Arc<EcobeeData>) {
    let client = Arc::new(MockClient::new(thermostats()));
    let data = Arc::new(EcobeeData::with_throttle(client.clone(), Duration::ZERO));
    (client, data)
}
