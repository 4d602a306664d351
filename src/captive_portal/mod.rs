//! SoftAP + Web 配网模块
//!
//! 提供基于 WiFi AP 模式和 HTTP 服务器的设备配网功能。

pub mod controller;
pub mod dns;
pub mod exchange;
pub mod handlers;
pub mod html;
#[cfg(feature = "espidf")]
mod server;

pub use controller::{ap_ssid, PortalController, PortalNetwork, PortalState, Restart, Tick};
pub use exchange::{PortalClient, Request, Response};
#[cfg(feature = "espidf")]
pub use server::EspPortalNetwork;
