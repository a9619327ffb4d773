//! Network control plane and streaming core for a camera-equipped WiFi RC vehicle.
//!
//! The crate owns the parts with real state: choosing between station mode and
//! the provisioning access point, the provisioning portal itself, the camera
//! broadcast loop and the inbound control vector. Radio, camera, WebSocket
//! transport, key-value storage and mDNS are collaborators reached through
//! traits; `platform::esp32` binds the ones the ESP32 HAL provides.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod connectivity;
pub mod control;
pub mod credentials;
pub mod discovery;
pub mod error;
#[cfg(feature = "esp32")]
pub mod platform;
pub mod provisioning;
pub mod runtime;
pub mod stream;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use connectivity::{ConnectivityManager, ConnectivityState, ConnectivityStatus};
pub use control::{ControlState, ControlVector};
pub use credentials::CredentialStore;
pub use provisioning::ProvisioningService;
pub use stream::BroadcastPipeline;
pub use types::Credentials;
