//! 配网门户状态机
//!
//! `Idle -> PortalActive -> RestartPending -> Restarting`. All portal state is
//! owned here and only touched from [`PortalController::tick`]; transports
//! reach it through the request queue.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::dns::DnsResponder;
use super::exchange::{self, PortalClient, Request, RequestQueue, Response};
use super::handlers;
use crate::bounded::truncate_to;
use crate::config::PortalConfig;
use crate::storage::FieldStorage;
use crate::store::ValueStore;
use crate::trigger::Heartbeat;

/// 802.11 SSIDs are at most 32 bytes.
const MAX_SSID_LEN: usize = 32;

/// Radio side of the portal: the access point and the HTTP listener.
pub trait PortalNetwork {
    /// Hardware address; its last three bytes end up in the SSID.
    fn hardware_id(&self) -> [u8; 6];

    /// Brings up an open access point named `ssid` at `config.ap_ip` and an
    /// HTTP listener on `config.http_port` that forwards requests to `client`.
    fn start(
        &mut self,
        ssid: &str,
        config: &PortalConfig,
        client: PortalClient,
    ) -> anyhow::Result<()>;

    /// Tears down the access point and any station connection.
    fn stop(&mut self);
}

/// Hard device reset.
pub trait Restart {
    fn restart(&mut self) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalState {
    Idle,
    PortalActive,
    RestartPending,
    Restarting,
}

/// What the scheduler should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Portal not started; nothing was done.
    Idle,
    /// Sleep this long, then tick again.
    Continue(Duration),
    /// Network is down; sleep this long, then reset the device.
    Restart(Duration),
}

/// `<app>-<last three hardware id bytes in hex>`, shortened to fit an SSID.
pub fn ap_ssid(app_name: &str, hardware_id: [u8; 6]) -> String {
    let suffix = format!(
        "-{:02X}{:02X}{:02X}",
        hardware_id[3], hardware_id[4], hardware_id[5]
    );
    let app = truncate_to(app_name, MAX_SSID_LEN - suffix.len());
    format!("{app}{suffix}")
}

pub struct PortalController<S, N, H> {
    config: PortalConfig,
    store: ValueStore<S>,
    network: N,
    heartbeat: H,
    state: PortalState,
    client: PortalClient,
    queue: RequestQueue,
    dns: Option<DnsResponder>,
    ssid: Option<String>,
}

impl<S, N, H> PortalController<S, N, H>
where
    S: FieldStorage,
    N: PortalNetwork,
    H: Heartbeat,
{
    pub fn new(config: PortalConfig, store: ValueStore<S>, network: N, heartbeat: H) -> Self {
        let (client, queue) = exchange::channel(config.queue_depth);
        Self {
            config,
            store,
            network,
            heartbeat,
            state: PortalState::Idle,
            client,
            queue,
            dns: None,
            ssid: None,
        }
    }

    /// `Idle -> PortalActive`: access point, HTTP listener and wildcard DNS.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.state != PortalState::Idle {
            anyhow::bail!("portal cannot start from {:?}", self.state);
        }
        log::info!("entering configuration mode");

        let ssid = ap_ssid(&self.config.app_name, self.network.hardware_id());
        self.network.start(&ssid, &self.config, self.client.clone())?;

        let dns_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.dns_port));
        match DnsResponder::bind(dns_addr, self.config.ap_ip, self.config.dns_ttl) {
            Ok(dns) => self.dns = Some(dns),
            // The portal is still reachable by address, just not by arbitrary name.
            Err(e) => log::error!("DNS responder unavailable on {}: {}", dns_addr, e),
        }

        log::info!("join WiFi '{}' (open)", ssid);
        log::info!("then browse to any page (e.g. 'http://{}')", self.config.ap_ip);
        self.ssid = Some(ssid);
        self.state = PortalState::PortalActive;
        Ok(())
    }

    /// One pass of the cooperative loop. Never blocks.
    pub fn tick(&mut self) -> Tick {
        match self.state {
            PortalState::Idle => return Tick::Idle,
            PortalState::Restarting => return Tick::Restart(self.config.restart_flush()),
            PortalState::PortalActive | PortalState::RestartPending => {}
        }

        self.heartbeat.toggle();
        if self.state == PortalState::RestartPending {
            self.shutdown();
            return Tick::Restart(self.config.restart_flush());
        }

        if let Some(dns) = self.dns.as_mut() {
            if let Err(e) = dns.poll() {
                log::error!("DNS poll failed: {}", e);
            }
        }
        if let Some(exchange) = self.queue.try_next() {
            let response = self.handle(&exchange.request);
            exchange.respond(response);
        }
        Tick::Continue(self.config.loop_interval())
    }

    /// Routes one request. `/save` and `/restart` schedule the restart.
    /// Outside `PortalActive`/`RestartPending` every request gets a 503.
    pub fn handle(&mut self, request: &Request) -> Response {
        if matches!(self.state, PortalState::Idle | PortalState::Restarting) {
            log::warn!("'{}' while {:?}, rejecting", request.path, self.state);
            return Response::unavailable();
        }
        let (response, restart) = handlers::dispatch(&self.config, &mut self.store, request);
        if restart && self.state == PortalState::PortalActive {
            log::info!("restart scheduled");
            self.state = PortalState::RestartPending;
        }
        response
    }

    /// Drives [`tick`](Self::tick) forever, then resets the device.
    pub fn run<F, R>(mut self, mut sleep: F, mut restarter: R) -> !
    where
        F: FnMut(Duration),
        R: Restart,
    {
        loop {
            match self.tick() {
                Tick::Continue(pause) => sleep(pause),
                Tick::Idle => sleep(self.config.loop_interval()),
                Tick::Restart(flush) => {
                    sleep(flush);
                    restarter.restart()
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.queue.close();
        // Whatever raced the restart still gets an answer.
        while let Some(exchange) = self.queue.try_next() {
            exchange.respond(Response::unavailable());
        }
        self.dns = None;
        self.network.stop();
        self.state = PortalState::Restarting;
        log::info!("restart will now be invoked...");
    }

    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref()
    }

    /// Handle for transports to submit requests.
    pub fn client(&self) -> PortalClient {
        self.client.clone()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn store(&self) -> &ValueStore<S> {
        &self.store
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn heartbeat(&self) -> &H {
        &self.heartbeat
    }

    pub fn dns_addr(&self) -> Option<SocketAddr> {
        self.dns.as_ref().and_then(|d| d.local_addr().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_has_hex_suffix() {
        assert_eq!(
            ap_ssid("nCLC", [0x5C, 0xCF, 0x7F, 0x0a, 0xb1, 0xFF]),
            "nCLC-0AB1FF"
        );
    }

    #[test]
    fn long_app_names_are_shortened() {
        let ssid = ap_ssid(&"x".repeat(40), [0; 6]);
        assert_eq!(ssid.len(), MAX_SSID_LEN);
        assert!(ssid.ends_with("-000000"));
    }
}
