#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use cfg_portal::captive_portal::{PortalClient, PortalNetwork};
use cfg_portal::{FieldDescriptor, FieldSchema, PortalConfig};
use embedded_storage::{ReadStorage, Storage};

/// Byte-addressable RAM standing in for an EEPROM. Starts erased.
pub struct Eeprom {
    pub buf: Vec<u8>,
    pub fail_writes: bool,
    pub writes: Vec<(u32, usize)>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EepromError {
    OutOfBounds,
    WriteRejected,
}

impl Eeprom {
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0xff; size],
            fail_writes: false,
            writes: Vec::new(),
        }
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, EepromError> {
        let start = offset as usize;
        let end = start + len;
        if end > self.buf.len() {
            return Err(EepromError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ReadStorage for Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.buf[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(EepromError::WriteRejected);
        }
        let range = self.range(offset, bytes.len())?;
        self.buf[range].copy_from_slice(bytes);
        self.writes.push((offset, bytes.len()));
        Ok(())
    }
}

/// Records what the portal asked of the radio.
#[derive(Default)]
pub struct FakeNetwork {
    pub mac: [u8; 6],
    pub started: Vec<String>,
    pub stopped: usize,
    pub fail_start: bool,
    pub client: Option<PortalClient>,
}

impl FakeNetwork {
    pub fn new(mac: [u8; 6]) -> Self {
        Self {
            mac,
            ..Default::default()
        }
    }
}

impl PortalNetwork for FakeNetwork {
    fn hardware_id(&self) -> [u8; 6] {
        self.mac
    }

    fn start(
        &mut self,
        ssid: &str,
        _config: &PortalConfig,
        client: PortalClient,
    ) -> anyhow::Result<()> {
        if self.fail_start {
            anyhow::bail!("radio unavailable");
        }
        self.started.push(ssid.to_string());
        self.client = Some(client);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped += 1;
    }
}

/// Counts heartbeat toggles.
#[derive(Default)]
pub struct Led {
    pub toggles: usize,
}

impl cfg_portal::Heartbeat for Led {
    fn toggle(&mut self) {
        self.toggles += 1;
    }
}

pub fn schema() -> FieldSchema {
    FieldSchema::new(vec![
        FieldDescriptor::header("WiFi", "Network to join"),
        FieldDescriptor::field("ssid", "MySSID", 32, "Name of the network"),
        FieldDescriptor::field("password", "MyPassword", 32, "Password of the network"),
        FieldDescriptor::field("code", "", 4, "Short code"),
    ])
    .unwrap()
}

/// Defaults with an ephemeral DNS port so tests need no privileges.
pub fn config() -> PortalConfig {
    PortalConfig {
        dns_port: 0,
        ..PortalConfig::new("Test")
    }
}
