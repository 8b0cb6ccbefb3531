//! Named register and field commands backed by a register map

use super::CommandError;
use crate::buses::BoxedBus;
use regbus_core::map::{Entry, RegisterMap};
use regbus_core::{Device, EventState};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Resolve a name or fail with a helpful error
fn lookup<'m>(map: &'m RegisterMap, name: &str) -> Result<Entry<'m>, CommandError> {
    map.lookup(name).ok_or_else(|| CommandError::UnknownName {
        name: name.to_string(),
        chip: map.chip().to_string(),
    })
}

/// Device address from the command line or the map
pub fn resolve_address(map: &RegisterMap, address: Option<u8>) -> Result<u8, CommandError> {
    address.or(map.address()).ok_or(CommandError::NoAddress)
}

/// Read a named register or field
pub fn get(
    dev: &mut Device<BoxedBus>,
    map: &RegisterMap,
    name: &str,
) -> Result<u8, Box<dyn std::error::Error>> {
    let value = match lookup(map, name)? {
        Entry::Register(reg) => dev.read_register(&reg.descriptor())?,
        Entry::Field(field) => dev.read_field(&field.descriptor())?,
    };
    Ok(value)
}

/// Print a named register or field
pub fn run_get(dev: &mut Device<BoxedBus>, map: &RegisterMap, name: &str) -> CmdResult {
    let value = get(dev, map, name)?;
    println!("0x{:02X}", value);
    Ok(())
}

/// Write a named register or field
pub fn run_set(dev: &mut Device<BoxedBus>, map: &RegisterMap, name: &str, value: u8) -> CmdResult {
    match lookup(map, name)? {
        Entry::Register(reg) => dev.write_register(&reg.descriptor(), value)?,
        Entry::Field(field) => dev.write_field(&field.descriptor(), value)?,
    }
    Ok(())
}

/// Verify a named register or field
///
/// Registers default to their reset value; fields need an explicit value.
pub fn run_check(
    dev: &mut Device<BoxedBus>,
    map: &RegisterMap,
    name: &str,
    expected: Option<u8>,
) -> CmdResult {
    let (label, check) = match lookup(map, name)? {
        Entry::Register(reg) => {
            let descriptor = reg.descriptor();
            let check = match expected {
                Some(value) => dev.read_register_and_verify(&descriptor, value)?,
                None => dev.check_reset(&descriptor)?,
            };
            (reg.name.clone(), check)
        }
        Entry::Field(field) => {
            let expected =
                expected.ok_or_else(|| CommandError::MissingExpected(field.name().to_string()))?;
            let check = dev.read_field_and_verify(&field.descriptor(), expected)?;
            (field.name().to_string(), check)
        }
    };

    if check.is_match() {
        println!("{}: OK (0x{:02X})", label, check.actual);
        Ok(())
    } else {
        Err(CommandError::Mismatch {
            name: label,
            expected: check.expected,
            actual: check.actual,
        }
        .into())
    }
}

/// Acknowledge a named event field
pub fn run_clear(dev: &mut Device<BoxedBus>, map: &RegisterMap, name: &str) -> CmdResult {
    match lookup(map, name)? {
        Entry::Register(reg) => Err(CommandError::NotAField(reg.name.clone()).into()),
        Entry::Field(field) => {
            match dev.clear_event(&field.descriptor())? {
                EventState::Cleared => println!("{}: cleared", field.name()),
                EventState::NotSet => println!("{}: not set", field.name()),
            }
            Ok(())
        }
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use regbus_core::{DeviceConfig, Error};
    use regbus_dummy::DummyBus;

    const MAP: &str = r#"(
        chip: "TMP102",
        address: Some(0x48),
        registers: [
            (name: "TEMP", address: 0x00),
            (name: "CONFIG", address: 0x01, reset: 0x60),
            (name: "STATUS", address: 0x02),
        ],
        fields: [
            (name: "SD", register: "CONFIG", mask: 0x01),
            (name: "RES", register: "CONFIG", mask: 0x60),
            (name: "ALERT", register: "STATUS", mask: 0x20, access: W1C),
            (name: "TEMP_MSB", register: "TEMP", mask: 0xFF, access: RO),
        ],
    )"#;

    fn setup() -> (Device<BoxedBus>, RegisterMap) {
        let map = RegisterMap::load_ron(MAP).unwrap();
        let address = resolve_address(&map, None).unwrap();
        let mut dummy = DummyBus::new_default();
        dummy.attach(address);
        dummy.set_register(address, 0x01, 0x60);
        let dev = Device::new(Box::new(dummy) as BoxedBus, DeviceConfig::new(address));
        (dev, map)
    }

    #[test]
    fn test_get_and_set() {
        let (mut dev, map) = setup();
        assert_eq!(get(&mut dev, &map, "res").unwrap(), 0b11);

        run_set(&mut dev, &map, "SD", 1).unwrap();
        assert_eq!(get(&mut dev, &map, "CONFIG").unwrap(), 0x61);

        run_set(&mut dev, &map, "config", 0x00).unwrap();
        assert_eq!(get(&mut dev, &map, "RES").unwrap(), 0);
    }

    #[test]
    fn test_unknown_name() {
        let (mut dev, map) = setup();
        let err = get(&mut dev, &map, "NOPE").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::UnknownName { .. })
        ));
    }

    #[test]
    fn test_check_against_reset_and_value() {
        let (mut dev, map) = setup();
        run_check(&mut dev, &map, "CONFIG", None).unwrap();
        run_check(&mut dev, &map, "RES", Some(0b11)).unwrap();

        let err = run_check(&mut dev, &map, "RES", Some(0b01)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::Mismatch {
                expected: 0b01,
                actual: 0b11,
                ..
            })
        ));

        let err = run_check(&mut dev, &map, "SD", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::MissingExpected(_))
        ));
    }

    #[test]
    fn test_clear_and_access_classes() {
        let (mut dev, map) = setup();
        run_clear(&mut dev, &map, "ALERT").unwrap();
        assert!(run_clear(&mut dev, &map, "STATUS").is_err());

        let err = run_set(&mut dev, &map, "TEMP_MSB", 1).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::ReadOnly));
    }

    #[test]
    fn test_address_resolution() {
        let map = RegisterMap::load_ron(MAP).unwrap();
        assert_eq!(resolve_address(&map, Some(0x49)).unwrap(), 0x49);

        let bare = RegisterMap::load_ron(r#"(chip: "X")"#).unwrap();
        assert!(matches!(
            resolve_address(&bare, None),
            Err(CommandError::NoAddress)
        ));
    }
}
