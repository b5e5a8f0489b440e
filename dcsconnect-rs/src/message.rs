use serde::{Deserialize, Serialize};

/// A single cockpit actuation, executed by the script running inside DCS.
///
/// `device` and `code` address a clickable control on the aircraft's cockpit map.
/// `delay` is in milliseconds and applies after the press (and before the depress,
/// when one is requested).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcsCommand {
    pub device: i32,
    pub code: i32,
    pub delay: u32,
    pub activate: Activation,
    #[serde(with = "depress_flag")]
    pub add_depress: bool,
}

impl DcsCommand {
    pub fn new(device: i32, code: i32, delay: u32, activate: Activation, add_depress: bool) -> Self {
        Self {
            device,
            code,
            delay,
            activate,
            add_depress,
        }
    }

    /// A spring-loaded button: press, then release right after.
    pub fn push(device: i32, code: i32) -> Self {
        Self::new(device, code, 0, Activation::Press, true)
    }

    /// A push that waits `delay` ms before the next command runs.
    pub fn push_with_delay(device: i32, code: i32, delay: u32) -> Self {
        Self::new(device, code, delay, Activation::Press, true)
    }

    /// A latching control moved to one of its two positions, no release.
    pub fn toggle(device: i32, code: i32, activate: Activation) -> Self {
        Self::new(device, code, 0, activate, false)
    }
}

impl std::fmt::Display for DcsCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "D:{}, C:{}, Dly: {}, Ac:{}, Dp: {}",
            self.device,
            self.code,
            self.delay,
            i32::from(self.activate),
            self.add_depress as u8
        )
    }
}

/// Direction of a button actuation. DCS takes a double here, but only axis
/// commands use anything other than +1 / -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Activation {
    Press,
    Release,
}

impl From<Activation> for i32 {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Press => 1,
            Activation::Release => -1,
        }
    }
}

impl TryFrom<i32> for Activation {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Activation::Press),
            -1 => Ok(Activation::Release),
            other => Err(format!("activate must be 1 or -1, got {}", other)),
        }
    }
}

/// `addDepress` travels as the text "true"/"false" because the Lua side
/// compares strings. Any other text is rejected instead of defaulting.
mod depress_flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&text),
                &"\"true\" or \"false\"",
            ))
        }
    }
}

/// Position of the F10/free camera as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

/// One pylon of the player aircraft and the store currently loaded on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStation {
    pub station: u8,
    pub name: String,
}

/// The single envelope used for both requests and responses.
///
/// Requests set the flags and `commands`, responses fill in the rest. Anything
/// that does not apply to an exchange is left at its default and omitted on the
/// wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcsMessage {
    #[serde(default, skip_serializing_if = "is_false")]
    pub stop: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fetch_camera_position: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fetch_aircraft_type: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fetch_weapon_stations: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<DcsCommand>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_position: Option<CameraPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_stations: Option<Vec<WeaponStation>>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_empty"
    )]
    pub server_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_command_index: Option<usize>,
    #[serde(rename = "isF10View", default, skip_serializing_if = "Option::is_none")]
    pub is_f10_view: Option<bool>,
}

impl DcsMessage {
    pub fn stop() -> Self {
        Self {
            stop: true,
            ..Default::default()
        }
    }

    pub fn with_commands(commands: Vec<DcsCommand>) -> Self {
        Self {
            commands,
            ..Default::default()
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// The Lua encoder writes `null` for an empty error table.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
