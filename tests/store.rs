use cfg_portal::storage::SlotError;
use cfg_portal::{FieldStorage, MemoryStorage, SlotStorage, StoreError, ValueStore};
use pretty_assertions::assert_eq;

mod common;
use common::{schema, Eeprom};

#[test]
fn defaults_until_something_is_saved() {
    let store = ValueStore::load(schema(), MemoryStorage::new()).unwrap();
    assert_eq!(store.count(), 4);
    assert_eq!(store.values(), vec!["", "MySSID", "MyPassword", ""]);
    assert_eq!(store.get_by_name("ssid"), Some("MySSID"));
}

#[test]
fn stored_values_win_over_defaults() {
    let storage = MemoryStorage::new().with_value(1, "HomeNet");
    let store = ValueStore::load(schema(), storage).unwrap();
    assert_eq!(store.get(1), Some("HomeNet"));
    assert_eq!(store.get(2), Some("MyPassword"));
}

#[test]
fn set_truncates_to_max_len() {
    let mut store = ValueStore::load(schema(), MemoryStorage::new()).unwrap();
    let code = store.lookup("code").unwrap();
    store.set(code, "abcdef").unwrap();
    assert_eq!(store.get(code), Some("abcd"));
    assert_eq!(store.storage().value(code), Some("abcd"));

    // Multi-byte characters are never split.
    store.set(code, "aé€").unwrap();
    assert_eq!(store.get(code), Some("aé"));
}

#[test]
fn unknown_and_header_names_do_not_resolve() {
    let mut store = ValueStore::load(schema(), MemoryStorage::new()).unwrap();
    assert_eq!(store.lookup("bogus"), None);
    assert_eq!(store.lookup("WiFi"), None);
    assert_eq!(store.lookup("SSID"), None);
    assert!(matches!(store.set(0, "x"), Err(StoreError::NotEditable(_))));
    assert!(matches!(
        store.set(9, "x"),
        Err(StoreError::IndexOutOfRange(9))
    ));
    assert_eq!(store.count(), 4);
    assert_eq!(store.storage().writes(), 0);
}

#[test]
fn failed_write_keeps_the_cached_value() {
    let mut store = ValueStore::load(schema(), MemoryStorage::new()).unwrap();
    store.storage_mut().set_fail_writes(true);

    let err = store.set(1, "Other").unwrap_err();
    assert!(matches!(err, StoreError::Storage { ref name, .. } if name == "ssid"));
    assert_eq!(store.get(1), Some("MySSID"));
}

#[test]
fn slots_are_laid_out_back_to_back() {
    let slots = SlotStorage::new(Eeprom::new(128), 16, &schema()).unwrap();
    assert_eq!(slots.end(), 16 + 33 + 33 + 5);

    assert_eq!(
        SlotStorage::new(Eeprom::new(70), 0, &schema()).err(),
        Some(SlotError::OutOfBounds {
            needed: 71,
            capacity: 70
        })
    );
}

#[test]
fn erased_eeprom_loads_defaults() {
    let slots = SlotStorage::new(Eeprom::new(128), 0, &schema()).unwrap();
    let store = ValueStore::load(schema(), slots).unwrap();
    assert_eq!(store.values(), vec!["", "MySSID", "MyPassword", ""]);
}

#[test]
fn shorter_value_leaves_no_stale_bytes() {
    let slots = SlotStorage::new(Eeprom::new(128), 0, &schema()).unwrap();
    let mut store = ValueStore::load(schema(), slots).unwrap();
    store.set(1, "LongNetworkName").unwrap();
    store.set(1, "Net").unwrap();

    let spare = SlotStorage::new(Eeprom::new(128), 0, &schema()).unwrap();
    let eeprom = std::mem::replace(store.storage_mut(), spare).into_inner();
    assert_eq!(&eeprom.buf[..3], b"Net");
    assert!(eeprom.buf[3..33].iter().all(|&b| b == 0));
    assert_eq!(eeprom.writes, vec![(0, 33), (0, 33)]);

    // A fresh boot sees the short value.
    let slots = SlotStorage::new(eeprom, 0, &schema()).unwrap();
    let store = ValueStore::load(schema(), slots).unwrap();
    assert_eq!(store.get(1), Some("Net"));
    assert_eq!(store.get(2), Some("MyPassword"));
}

#[test]
fn unterminated_slot_falls_back_to_default() {
    let mut eeprom = Eeprom::new(128);
    eeprom.buf[66..71].copy_from_slice(b"wxyzv");
    let mut slots = SlotStorage::new(eeprom, 0, &schema()).unwrap();
    let field = schema().get(3).unwrap().clone();
    assert_eq!(slots.load(3, &field).unwrap(), None);
    assert_eq!(slots.load(0, &field), Err(SlotError::NoSlot(0)));
}

#[test]
fn eeprom_write_failure_is_reported() {
    let mut eeprom = Eeprom::new(128);
    eeprom.fail_writes = true;
    let slots = SlotStorage::new(eeprom, 0, &schema()).unwrap();
    let mut store = ValueStore::load(schema(), slots).unwrap();
    assert!(store.set(3, "1234").is_err());
    assert_eq!(store.get(3), Some(""));
}

#[test]
fn embedded_nul_cuts_the_value_before_it_is_stored() {
    let slots = SlotStorage::new(Eeprom::new(128), 0, &schema()).unwrap();
    let mut store = ValueStore::load(schema(), slots).unwrap();
    store.set(1, "Home\0Net").unwrap();
    assert_eq!(store.get(1), Some("Home"));

    let spare = SlotStorage::new(Eeprom::new(128), 0, &schema()).unwrap();
    let eeprom = std::mem::replace(store.storage_mut(), spare).into_inner();
    let slots = SlotStorage::new(eeprom, 0, &schema()).unwrap();
    let reloaded = ValueStore::load(schema(), slots).unwrap();
    assert_eq!(reloaded.get(1), store.get(1));
}
