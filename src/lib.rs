//! Captive configuration portal for small WiFi devices.
//!
//! On boot, [`trigger::EntryTrigger`] watches a button for a short window. If
//! the operator asks for it, [`captive_portal::PortalController`] brings up an
//! open access point with a wildcard DNS responder and serves an HTML form
//! generated from a [`schema::FieldSchema`]. Saved values go through a
//! [`store::ValueStore`] into a [`storage::FieldStorage`] backend, then the
//! device restarts.

pub mod bounded;
pub mod captive_portal;
pub mod config;
pub mod error;
#[cfg(feature = "espidf")]
pub mod hal;
pub mod schema;
pub mod storage;
pub mod store;
pub mod trigger;

pub use config::PortalConfig;
pub use error::{ConfigError, SchemaError, StoreError};
pub use schema::{FieldDescriptor, FieldSchema};
pub use storage::{FieldStorage, MemoryStorage, SlotStorage};
pub use store::ValueStore;
pub use trigger::{EntryTrigger, Heartbeat, NoHeartbeat, TriggerInput, TriggerOutcome};
