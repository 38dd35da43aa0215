//! Constants used by the radio layer
//! Well-known GATT UUIDs for labelling discovered services, plus connection
//! defaults.

use uuid::Uuid;

/// Standard Bluetooth Service UUIDs
pub const UUID_GENERIC_ACCESS_SERVICE: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);
pub const UUID_GENERIC_ATTRIBUTE_SERVICE: Uuid = Uuid::from_u128(0x00001801_0000_1000_8000_00805f9b34fb);
pub const UUID_DEVICE_INFORMATION_SERVICE: Uuid = Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);
pub const UUID_BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// Apple Find My network service, advertised by AirTags and compatible accessories
pub const UUID_FIND_MY_SERVICE: Uuid = Uuid::from_u128(0x0000fd44_0000_1000_8000_00805f9b34fb);

/// Default number of connection attempts for a trigger request
pub const MAX_CONNECT_RETRIES: u32 = 3;

/// Default delay between connection retries in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Timeout for a single connect attempt in seconds
pub const BLUETOOTH_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Human-readable label for a service UUID, if it is a well-known one.
pub fn service_label(uuid: &Uuid) -> Option<&'static str> {
    match *uuid {
        UUID_GENERIC_ACCESS_SERVICE => Some("Generic Access"),
        UUID_GENERIC_ATTRIBUTE_SERVICE => Some("Generic Attribute"),
        UUID_DEVICE_INFORMATION_SERVICE => Some("Device Information"),
        UUID_BATTERY_SERVICE => Some("Battery"),
        UUID_FIND_MY_SERVICE => Some("Find My"),
        _ => None,
    }
}
