use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{PinDriver, Pull};

use cfg_portal::captive_portal::{EspPortalNetwork, PortalController};
use cfg_portal::hal::{self, EspRestart, NvsStorage};
use cfg_portal::{
    EntryTrigger, FieldDescriptor, FieldSchema, PortalConfig, TriggerOutcome, ValueStore,
};

static APP_NAME: Option<&str> = std::option_env!("CFG_PORTAL_APP_NAME");

fn schema() -> anyhow::Result<FieldSchema> {
    Ok(FieldSchema::new(vec![
        FieldDescriptor::header("WiFi", "Network to join after restart"),
        FieldDescriptor::field("ssid", "MySSID", 32, "Name of the network"),
        FieldDescriptor::field("Password", "MyPassword", 32, "Password of the network "),
        FieldDescriptor::header("Clock", "Time keeping"),
        FieldDescriptor::field(
            "timezone",
            "CET-1CEST,M3.5.0,M10.5.0/3",
            48,
            "POSIX TZ string",
        ),
        FieldDescriptor::field("ntp", "pool.ntp.org", 32, "Time server"),
    ])?)
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = esp_idf_svc::hal::prelude::Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let partition = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;
    let nvs = esp_idf_svc::nvs::EspDefaultNvs::new(partition, "cfg", true)?;

    let config = PortalConfig::new(APP_NAME.unwrap_or("nCLC"));
    log::info!("{} {}", config.app_name, env!("CARGO_PKG_VERSION"));

    let store = ValueStore::load(schema()?, NvsStorage::new(nvs)).map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        e
    })?;
    hal::log_heap();

    // BOOT 按钮，按下为低电平
    let mut button = PinDriver::input(peripherals.pins.gpio0)?;
    button.set_pull(Pull::Up)?;
    let mut led = PinDriver::output(peripherals.pins.gpio2)?;

    let mut trigger = EntryTrigger::new(config.trigger_window(), config.trigger_poll_interval());
    let outcome = trigger.wait(&mut button, &mut led, std::thread::sleep);

    if outcome == TriggerOutcome::Requested {
        let network = EspPortalNetwork::new(peripherals.modem, sysloop, hal::read_mac());
        let mut portal = PortalController::new(config, store, network, led);
        if let Err(e) = portal.start() {
            log::error!("Failed to start configuration portal: {:?}", e);
            return Err(e);
        }
        hal::log_heap();
        portal.run(std::thread::sleep, EspRestart);
    }

    for (field, value) in store.schema().iter().zip(store.values()) {
        if field.is_header() {
            continue;
        }
        if config.is_sensitive(&field.name) {
            log::info!("{}: '***'", field.name);
        } else {
            log::info!("{}: '{}'", field.name, value);
        }
    }

    Ok(())
}
