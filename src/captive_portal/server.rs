//! HTTP 服务器和 SoftAP 管理

use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    http::{
        server::{Configuration, EspHttpConnection, EspHttpServer, Request as EspRequest},
        Method as EspMethod,
    },
    io::{Read, Write},
    ipv4::{self, Mask, Subnet},
    netif::{EspNetif, NetifConfiguration, NetifStack},
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration as WifiConfig, EspWifi,
        WifiDriver,
    },
};
use http::Method;

use super::controller::PortalNetwork;
use super::exchange::{PortalClient, Request};
use crate::config::PortalConfig;

/// Form posts beyond this are cut off.
const MAX_BODY: usize = 4096;

/// SoftAP plus HTTP listener on the ESP-IDF stack.
///
/// Handlers run on the HTTP server task and only forward requests to the
/// portal loop through a [`PortalClient`].
pub struct EspPortalNetwork {
    modem: Option<Modem>,
    sysloop: EspSystemEventLoop,
    mac: [u8; 6],
    wifi: Option<BlockingWifi<EspWifi<'static>>>,
    server: Option<EspHttpServer<'static>>,
}

impl EspPortalNetwork {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop, mac: [u8; 6]) -> Self {
        Self {
            modem: Some(modem),
            sysloop,
            mac,
            wifi: None,
            server: None,
        }
    }

    fn start_ap(
        &mut self,
        ssid: &str,
        config: &PortalConfig,
    ) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
        let modem = self
            .modem
            .take()
            .ok_or_else(|| anyhow::anyhow!("modem already in use"))?;

        // AP 网络接口：固定地址，同时作为网关和 DNS
        let ap_netif_config = NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(ipv4::RouterConfiguration {
                subnet: Subnet {
                    gateway: config.ap_ip,
                    mask: Mask(config.ap_prefix_len),
                },
                dhcp_enabled: true,
                dns: Some(config.ap_ip),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        };
        let ap_netif = EspNetif::new_with_conf(&ap_netif_config)?;

        let driver = WifiDriver::new(modem, self.sysloop.clone(), None)?;
        // AP 模式不使用 STA，但 wrap_all 需要
        let sta_netif = EspNetif::new(NetifStack::Sta)?;

        let mut wifi = BlockingWifi::wrap(
            EspWifi::wrap_all(driver, sta_netif, ap_netif)?,
            self.sysloop.clone(),
        )?;

        let ap_config = AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID too long: {}", ssid))?,
            ssid_hidden: false,
            channel: config.ap_channel,
            auth_method: AuthMethod::None,
            max_connections: config.ap_max_connections,
            ..Default::default()
        };

        wifi.set_configuration(&WifiConfig::AccessPoint(ap_config))?;
        wifi.start()?;
        Ok(wifi)
    }

    fn start_http_server(
        config: &PortalConfig,
        client: PortalClient,
    ) -> anyhow::Result<EspHttpServer<'static>> {
        let server_config = Configuration {
            http_port: config.http_port,
            stack_size: 8192,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&server_config)?;

        // Every path goes to the portal loop, which owns the routing.
        let get_client = client.clone();
        server.fn_handler::<anyhow::Error, _>("/*", EspMethod::Get, move |req| {
            forward(req, Method::GET, &get_client)
        })?;
        server.fn_handler::<anyhow::Error, _>("/*", EspMethod::Post, move |req| {
            forward(req, Method::POST, &client)
        })?;

        Ok(server)
    }
}

impl PortalNetwork for EspPortalNetwork {
    fn hardware_id(&self) -> [u8; 6] {
        self.mac
    }

    fn start(
        &mut self,
        ssid: &str,
        config: &PortalConfig,
        client: PortalClient,
    ) -> anyhow::Result<()> {
        let wifi = self.start_ap(ssid, config)?;
        log::info!("SoftAP started: {}", ssid);
        self.wifi = Some(wifi);

        let server = Self::start_http_server(config, client)?;
        log::info!("HTTP server started on {}:{}", config.ap_ip, config.http_port);
        self.server = Some(server);
        Ok(())
    }

    fn stop(&mut self) {
        self.server = None;
        if let Some(mut wifi) = self.wifi.take() {
            if let Err(e) = wifi.disconnect() {
                log::debug!("wifi disconnect: {:?}", e);
            }
            if let Err(e) = wifi.stop() {
                log::warn!("failed to stop wifi: {:?}", e);
            }
        }
    }
}

fn forward(
    mut req: EspRequest<&mut EspHttpConnection<'_>>,
    method: Method,
    client: &PortalClient,
) -> anyhow::Result<()> {
    let uri = req.uri().to_string();
    let body = if method == Method::POST {
        Some(read_body(&mut req)?)
    } else {
        None
    };

    let response = client.call_blocking(Request::new(method, &uri, body.as_deref()));

    let mut resp = req.into_response(
        response.status.as_u16(),
        response.status.canonical_reason(),
        &[("Content-Type", response.content_type)],
    )?;
    resp.write_all(response.body.as_bytes())?;
    Ok(())
}

fn read_body(req: &mut EspRequest<&mut EspHttpConnection<'_>>) -> anyhow::Result<String> {
    let mut body = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let len = req.read(&mut buf)?;
        if len == 0 {
            break;
        }
        body.extend_from_slice(&buf[..len]);
        if body.len() >= MAX_BODY {
            log::warn!("request body cut at {} bytes", body.len());
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
