//! Error codes reported with internal (bridge-side) failures.

/// The attempt was started with unusable arguments, e.g. a zero timeout.
pub const INVALID_ARGUMENTS: i32 = 100;

/// The SDK reported success but its device data was not a JSON object.
pub const MALFORMED_DEVICE_DATA: i32 = 301;

/// An envelope could not be encoded as JSON.
pub const ENVELOPE_ENCODING: i32 = 302;
