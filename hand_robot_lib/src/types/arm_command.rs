use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used wherever a frame carries no hand
pub const HAND_NOT_DETECTED: &str = "No hand detected";

/// Inclusive angle range of one actuator joint (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointRange {
    pub min: i32,
    pub max: i32,
}

impl JointRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Round to the nearest degree and clamp into the range.
    /// Non-finite input lands on the lower bound.
    pub fn clamp_angle(&self, value: f64) -> i32 {
        if !value.is_finite() {
            return self.min;
        }
        let rounded = value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
        rounded.clamp(self.min, self.max)
    }

    pub fn clamp_int(&self, value: i64) -> i32 {
        value.clamp(self.min as i64, self.max as i64) as i32
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const BASE_ROTATION_RANGE: JointRange = JointRange::new(0, 180);
pub const VERTICAL_MOVEMENT_RANGE: JointRange = JointRange::new(0, 180);
pub const JOINT_HORIZONTAL_RANGE: JointRange = JointRange::new(30, 150);
pub const GRABBER_RANGE: JointRange = JointRange::new(0, 180);

pub const GRABBER_CLOSED: i32 = 180;
pub const GRABBER_OPEN: i32 = 0;

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("empty payload")]
    Empty,
    #[error("expected 4 comma separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid integer field {field:?}")]
    InvalidField { field: String },
    #[error("invalid JSON payload: {0}")]
    Json(String),
}

/// Bounded joint angles sent to the arm.
///
/// Fields are private so that every instance, including deserialized ones,
/// holds angles inside their declared [`JointRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawActuatorCommand")]
pub struct ActuatorCommand {
    base_rotation: i32,
    vertical_movement: i32,
    joint_horizontal: i32,
    grabber: i32,
}

#[derive(Deserialize)]
struct RawActuatorCommand {
    base_rotation: i64,
    vertical_movement: i64,
    joint_horizontal: i64,
    grabber: i64,
}

impl From<RawActuatorCommand> for ActuatorCommand {
    fn from(raw: RawActuatorCommand) -> Self {
        Self {
            base_rotation: BASE_ROTATION_RANGE.clamp_int(raw.base_rotation),
            vertical_movement: VERTICAL_MOVEMENT_RANGE.clamp_int(raw.vertical_movement),
            joint_horizontal: JOINT_HORIZONTAL_RANGE.clamp_int(raw.joint_horizontal),
            grabber: GRABBER_RANGE.clamp_int(raw.grabber),
        }
    }
}

impl ActuatorCommand {
    /// Build a command, clamping every field into its range
    pub fn new(base_rotation: i32, vertical_movement: i32, joint_horizontal: i32, grabber: i32) -> Self {
        Self::from(RawActuatorCommand {
            base_rotation: base_rotation as i64,
            vertical_movement: vertical_movement as i64,
            joint_horizontal: joint_horizontal as i64,
            grabber: grabber as i64,
        })
    }

    pub fn base_rotation(&self) -> i32 {
        self.base_rotation
    }

    pub fn vertical_movement(&self) -> i32 {
        self.vertical_movement
    }

    pub fn joint_horizontal(&self) -> i32 {
        self.joint_horizontal
    }

    pub fn grabber(&self) -> i32 {
        self.grabber
    }

    /// Compact JSON object form, e.g. `{"base_rotation":90,...}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Flat delimited form: `base,vertical,joint,grabber`
    pub fn to_delimited(&self) -> String {
        format!(
            "{},{},{},{}",
            self.base_rotation, self.vertical_movement, self.joint_horizontal, self.grabber
        )
    }

    pub fn encode(&self, encoding: WireEncoding) -> String {
        match encoding {
            WireEncoding::Json => self.to_json(),
            WireEncoding::Delimited => self.to_delimited(),
        }
    }

    /// Parse either wire form. Out-of-range values are clamped.
    pub fn decode(text: &str) -> Result<Self, WireError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WireError::Empty);
        }

        if text.starts_with('{') {
            return serde_json::from_str(text).map_err(|e| WireError::Json(e.to_string()));
        }

        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(WireError::FieldCount(fields.len()));
        }

        let mut values = [0i64; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|_| WireError::InvalidField {
                field: field.to_string(),
            })?;
        }

        Ok(Self::from(RawActuatorCommand {
            base_rotation: values[0],
            vertical_movement: values[1],
            joint_horizontal: values[2],
            grabber: values[3],
        }))
    }
}

/// How commands are laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireEncoding {
    /// Compact JSON object
    #[default]
    Json,
    /// Lightweight comma-delimited text
    Delimited,
}

impl WireEncoding {
    pub fn from_compression(compression_enabled: bool) -> Self {
        if compression_enabled {
            WireEncoding::Delimited
        } else {
            WireEncoding::Json
        }
    }
}

/// Result of mapping one frame: either a command or the explicit
/// "hand not detected" sentinel, which is forwarded instead of suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    Command(ActuatorCommand),
    HandNotDetected,
}

impl CommandOutput {
    pub fn command(&self) -> Option<&ActuatorCommand> {
        match self {
            CommandOutput::Command(command) => Some(command),
            CommandOutput::HandNotDetected => None,
        }
    }

    pub fn encode(&self, encoding: WireEncoding) -> String {
        match (self, encoding) {
            (CommandOutput::Command(command), _) => command.encode(encoding),
            (CommandOutput::HandNotDetected, WireEncoding::Json) => {
                serde_json::json!({ "error": HAND_NOT_DETECTED }).to_string()
            }
            (CommandOutput::HandNotDetected, WireEncoding::Delimited) => {
                format!("error,{}", HAND_NOT_DETECTED)
            }
        }
    }
}

impl From<ActuatorCommand> for CommandOutput {
    fn from(command: ActuatorCommand) -> Self {
        CommandOutput::Command(command)
    }
}
