//! Closed command table shared with the controller firmware.
//!
//! Each command byte has a fixed request and response payload shape; the
//! dispatch here is exhaustive so an unknown byte or a malformed length is a
//! decode error the consumer logs and ignores, never a crash.

use std::fmt;

use bytes::Bytes;

use super::packet::{CommandRequest, DecodedPacket};
use super::{Error, RSP_ACK, RSP_NAK, Result};

/// Number of detection switches on the controller.
pub const SWITCH_COUNT: usize = 8;

/// Smallest accepted distance threshold, in centimeters.
pub const MIN_DISTANCE_CM: u16 = 7;

/// Largest accepted distance threshold, in centimeters.
pub const MAX_DISTANCE_CM: u16 = 1200;

/// Smallest velocity magnitude the device acts on, in miles per hour.
pub const MIN_VELOCITY_MPH: f32 = 2.0;

/// Largest velocity magnitude the device acts on, in miles per hour.
pub const MAX_VELOCITY_MPH: f32 = 120.0;

/// Wire velocities are centimeters per second; consumers work in mph.
pub const MPH_TO_CMS: f32 = 44.704;

/// Convert a consumer-side velocity to the wire unit, truncating toward zero.
#[must_use]
pub fn mph_to_cm_per_s(mph: f32) -> i16 {
    (mph * MPH_TO_CMS) as i16
}

/// Convert a wire velocity back to mph, rounded to the nearest whole value.
#[must_use]
pub fn cm_per_s_to_mph(cm_per_s: i16) -> f32 {
    (f32::from(cm_per_s) / MPH_TO_CMS).round()
}

/// The closed set of command bytes understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Request the status report (switch id, frame counter, error bitmask).
    Status = b'S',
    /// Read all eight distance thresholds.
    ReadDistances = b'D',
    /// Write one distance threshold.
    WriteDistance = b'd',
    /// Read all eight minimum velocity thresholds.
    ReadMinVelocities = b'V',
    /// Read all eight maximum velocity thresholds.
    ReadMaxVelocities = b'v',
    /// Write one velocity threshold (min or max, selected by sub-tag).
    WriteVelocity = b'w',
    /// Read all trigger rules.
    ReadTriggerRules = b'T',
    /// Write one switch's trigger rule.
    WriteTriggerRule = b't',
    /// Read the debug setting.
    ReadDebug = b'G',
    /// Write the debug setting.
    WriteDebug = b'g',
    /// Read the operating mode.
    ReadMode = b'M',
    /// Write the operating mode.
    WriteMode = b'm',
    /// Reset the controller.
    Reset = b'R',
    /// Restore factory defaults on the controller.
    FactoryReset = b'F',
    /// Persist the current configuration to the controller's flash.
    SaveToFlash = b'W',
    /// Positive acknowledgment; payload carries the acknowledged command.
    Ack = RSP_ACK,
    /// Negative acknowledgment; payload carries a [`NakError`] code.
    Nak = RSP_NAK,
}

impl Command {
    /// Convert from a wire byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'S' => Some(Self::Status),
            b'D' => Some(Self::ReadDistances),
            b'd' => Some(Self::WriteDistance),
            b'V' => Some(Self::ReadMinVelocities),
            b'v' => Some(Self::ReadMaxVelocities),
            b'w' => Some(Self::WriteVelocity),
            b'T' => Some(Self::ReadTriggerRules),
            b't' => Some(Self::WriteTriggerRule),
            b'G' => Some(Self::ReadDebug),
            b'g' => Some(Self::WriteDebug),
            b'M' => Some(Self::ReadMode),
            b'm' => Some(Self::WriteMode),
            b'R' => Some(Self::Reset),
            b'F' => Some(Self::FactoryReset),
            b'W' => Some(Self::SaveToFlash),
            RSP_ACK => Some(Self::Ack),
            RSP_NAK => Some(Self::Nak),
            _ => None,
        }
    }

    /// Convert to the wire byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => write!(f, "ACK"),
            Self::Nak => write!(f, "NAK"),
            other => write!(f, "{}", other.as_u8() as char),
        }
    }
}

/// Sub-tag selecting which velocity bound a `w` request writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VelocityBound {
    /// Minimum velocity threshold.
    Min = b'm',
    /// Maximum velocity threshold.
    Max = b'x',
}

impl VelocityBound {
    /// Convert to the wire sub-tag byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for VelocityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
        }
    }
}

/// Error codes carried by NAK responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NakError {
    /// 0x00: no error.
    NoError,
    /// 0x01: frame failed the device-side checksum.
    BadChecksum,
    /// 0x02: command byte not in the device's table.
    UnknownCommand,
    /// 0x03: payload shape rejected by the device.
    InvalidPayload,
    /// 0x04: the device failed to apply the command.
    ExecutionFail,
    /// 0x05: the device timed out executing the command.
    Timeout,
    /// Any code outside the enumerated set.
    Unknown,
}

impl NakError {
    /// Map a wire error code to its variant; unknown codes are not an error.
    #[must_use]
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x00 => Self::NoError,
            0x01 => Self::BadChecksum,
            0x02 => Self::UnknownCommand,
            0x03 => Self::InvalidPayload,
            0x04 => Self::ExecutionFail,
            0x05 => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// User-facing text for this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "No Error",
            Self::BadChecksum => "Bad Checksum",
            Self::UnknownCommand => "Unknown Command",
            Self::InvalidPayload => "Invalid Payload",
            Self::ExecutionFail => "Execution Fail",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl fmt::Display for NakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response payload decoded into its typed shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `S`: status report.
    Status {
        /// Identifier of the most recently fired switch.
        switch_id: u8,
        /// Frames received by the controller since boot.
        frame_count: u32,
        /// Error bitmask, one bit per error code.
        error_flags: u32,
    },
    /// `D`: distance thresholds in centimeters, one per switch.
    Distances([u16; SWITCH_COUNT]),
    /// `V`: minimum velocity thresholds in cm/s, one per switch.
    MinVelocities([i16; SWITCH_COUNT]),
    /// `v`: maximum velocity thresholds in cm/s, one per switch.
    MaxVelocities([i16; SWITCH_COUNT]),
    /// `T`: four trigger flag bytes per switch.
    TriggerRules([[u8; 4]; SWITCH_COUNT]),
    /// `G`: debug setting.
    Debug(u8),
    /// `M`: operating mode.
    Mode(u8),
    /// ACK: the device accepted the named command.
    Ack {
        /// Command being acknowledged.
        command: Command,
    },
    /// NAK: the device rejected a command.
    Nak(NakError),
}

impl Response {
    /// Decode a validated packet into its typed response shape.
    ///
    /// Length checks match the device contract exactly: fixed sizes for the
    /// array responses, at-least-one-byte for the single-value and ACK/NAK
    /// responses. Nothing stricter, so a future firmware revision that
    /// appends bytes to a single-value response still decodes.
    pub fn decode(packet: &DecodedPacket) -> Result<Self> {
        let command = Command::from_u8(packet.command()).ok_or(Error::UnknownCommand {
            byte: packet.command(),
        })?;
        let payload = packet.payload();

        match command {
            Command::Status => {
                need_exact(command, payload, 9)?;
                Ok(Self::Status {
                    switch_id: payload[0],
                    frame_count: u32::from_le_bytes([
                        payload[1], payload[2], payload[3], payload[4],
                    ]),
                    error_flags: u32::from_le_bytes([
                        payload[5], payload[6], payload[7], payload[8],
                    ]),
                })
            }
            Command::ReadDistances => {
                need_exact(command, payload, 2 * SWITCH_COUNT)?;
                let mut values = [0u16; SWITCH_COUNT];
                for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(2)) {
                    *value = u16::from_le_bytes([chunk[0], chunk[1]]);
                }
                Ok(Self::Distances(values))
            }
            Command::ReadMinVelocities => Ok(Self::MinVelocities(velocities(command, payload)?)),
            Command::ReadMaxVelocities => Ok(Self::MaxVelocities(velocities(command, payload)?)),
            Command::ReadTriggerRules => {
                need_exact(command, payload, 4 * SWITCH_COUNT)?;
                let mut rules = [[0u8; 4]; SWITCH_COUNT];
                for (rule, chunk) in rules.iter_mut().zip(payload.chunks_exact(4)) {
                    rule.copy_from_slice(chunk);
                }
                Ok(Self::TriggerRules(rules))
            }
            Command::ReadDebug => {
                need_at_least(command, payload, 1)?;
                Ok(Self::Debug(payload[0]))
            }
            Command::ReadMode => {
                need_at_least(command, payload, 1)?;
                Ok(Self::Mode(payload[0]))
            }
            Command::Ack => {
                need_at_least(command, payload, 1)?;
                let acked = Command::from_u8(payload[0])
                    .ok_or(Error::UnknownCommand { byte: payload[0] })?;
                Ok(Self::Ack { command: acked })
            }
            Command::Nak => {
                need_at_least(command, payload, 1)?;
                Ok(Self::Nak(NakError::from_u8(payload[0])))
            }
            Command::WriteDistance
            | Command::WriteVelocity
            | Command::WriteTriggerRule
            | Command::WriteDebug
            | Command::WriteMode
            | Command::Reset
            | Command::FactoryReset
            | Command::SaveToFlash => Err(Error::UnexpectedResponse { command }),
        }
    }
}

fn need_exact(command: Command, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() == expected {
        Ok(())
    } else {
        Err(Error::PayloadLength {
            command,
            expected,
            got: payload.len(),
        })
    }
}

fn need_at_least(command: Command, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() >= expected {
        Ok(())
    } else {
        Err(Error::PayloadLength {
            command,
            expected,
            got: payload.len(),
        })
    }
}

fn velocities(command: Command, payload: &[u8]) -> Result<[i16; SWITCH_COUNT]> {
    need_exact(command, payload, 2 * SWITCH_COUNT)?;
    let mut values = [0i16; SWITCH_COUNT];
    for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(2)) {
        *value = i16::from_le_bytes([chunk[0], chunk[1]]);
    }
    Ok(values)
}

fn check_index(index: u8) -> Result<()> {
    if usize::from(index) < SWITCH_COUNT {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            field: "switch index",
            value: i64::from(index),
            min: 0,
            max: SWITCH_COUNT as i64 - 1,
        })
    }
}

/// Typed request builders, one per row of the command table.
impl CommandRequest {
    fn bare(command: Command) -> Self {
        Self::from_validated(command.as_u8(), Bytes::new())
    }

    /// `S`: request the status report.
    #[must_use]
    pub fn status() -> Self {
        Self::bare(Command::Status)
    }

    /// `D`: read all distance thresholds.
    #[must_use]
    pub fn read_distances() -> Self {
        Self::bare(Command::ReadDistances)
    }

    /// `V`: read all minimum velocity thresholds.
    #[must_use]
    pub fn read_min_velocities() -> Self {
        Self::bare(Command::ReadMinVelocities)
    }

    /// `v`: read all maximum velocity thresholds.
    #[must_use]
    pub fn read_max_velocities() -> Self {
        Self::bare(Command::ReadMaxVelocities)
    }

    /// `T`: read all trigger rules.
    #[must_use]
    pub fn read_trigger_rules() -> Self {
        Self::bare(Command::ReadTriggerRules)
    }

    /// `G`: read the debug setting.
    #[must_use]
    pub fn read_debug() -> Self {
        Self::bare(Command::ReadDebug)
    }

    /// `M`: read the operating mode.
    #[must_use]
    pub fn read_mode() -> Self {
        Self::bare(Command::ReadMode)
    }

    /// `d`: write one switch's distance threshold in centimeters.
    pub fn write_distance(index: u8, centimeters: u16) -> Result<Self> {
        check_index(index)?;
        if !(MIN_DISTANCE_CM..=MAX_DISTANCE_CM).contains(&centimeters) {
            return Err(Error::OutOfRange {
                field: "distance",
                value: i64::from(centimeters),
                min: i64::from(MIN_DISTANCE_CM),
                max: i64::from(MAX_DISTANCE_CM),
            });
        }
        let cm = centimeters.to_le_bytes();
        let payload = Bytes::copy_from_slice(&[index, cm[0], cm[1]]);
        Ok(Self::from_validated(Command::WriteDistance.as_u8(), payload))
    }

    /// `w`: write one switch's velocity threshold in cm/s.
    ///
    /// The device only acts on magnitudes between [`MIN_VELOCITY_MPH`] and
    /// [`MAX_VELOCITY_MPH`]; values outside that range (expressed on the wire
    /// in cm/s) are rejected before transmission. Use [`mph_to_cm_per_s`] to
    /// produce the wire value.
    pub fn write_velocity(bound: VelocityBound, index: u8, cm_per_s: i16) -> Result<Self> {
        check_index(index)?;
        let min = i32::from(mph_to_cm_per_s(MIN_VELOCITY_MPH));
        let max = i32::from(mph_to_cm_per_s(MAX_VELOCITY_MPH));
        let magnitude = i32::from(cm_per_s).abs();
        if !(min..=max).contains(&magnitude) {
            return Err(Error::OutOfRange {
                field: "velocity magnitude",
                value: i64::from(cm_per_s),
                min: i64::from(min),
                max: i64::from(max),
            });
        }
        let value = cm_per_s.to_le_bytes();
        let payload = Bytes::copy_from_slice(&[bound.as_u8(), index, value[0], value[1]]);
        Ok(Self::from_validated(Command::WriteVelocity.as_u8(), payload))
    }

    /// `t`: write one switch's four trigger flag bytes.
    pub fn write_trigger_rule(index: u8, flags: [u8; 4]) -> Result<Self> {
        check_index(index)?;
        let payload = Bytes::copy_from_slice(&[index, flags[0], flags[1], flags[2], flags[3]]);
        Ok(Self::from_validated(
            Command::WriteTriggerRule.as_u8(),
            payload,
        ))
    }

    /// `g`: write the debug setting.
    #[must_use]
    pub fn write_debug(value: u8) -> Self {
        Self::from_validated(Command::WriteDebug.as_u8(), Bytes::copy_from_slice(&[value]))
    }

    /// `m`: write the operating mode (1 or 2).
    pub fn write_mode(mode: u8) -> Result<Self> {
        if !(1..=2).contains(&mode) {
            return Err(Error::OutOfRange {
                field: "mode",
                value: i64::from(mode),
                min: 1,
                max: 2,
            });
        }
        Ok(Self::from_validated(
            Command::WriteMode.as_u8(),
            Bytes::copy_from_slice(&[mode]),
        ))
    }

    /// `R`: reset the controller.
    #[must_use]
    pub fn reset() -> Self {
        Self::bare(Command::Reset)
    }

    /// `F`: restore factory defaults.
    #[must_use]
    pub fn factory_reset() -> Self {
        Self::bare(Command::FactoryReset)
    }

    /// `W`: persist configuration to flash.
    #[must_use]
    pub fn save_to_flash() -> Self {
        Self::bare(Command::SaveToFlash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(command: u8, payload: &[u8]) -> DecodedPacket {
        DecodedPacket::from_parts(
            command,
            Bytes::copy_from_slice(payload),
            payload.len() as u8,
        )
    }

    #[test]
    fn test_command_byte_roundtrip() {
        for byte in 0u8..=255 {
            if let Some(command) = Command::from_u8(byte) {
                assert_eq!(command.as_u8(), byte);
            }
        }
        assert_eq!(Command::from_u8(0xEE), None);
    }

    #[test]
    fn test_nak_unknown_command_text() {
        let nak = packet(RSP_NAK, &[0x02]);
        let response = Response::decode(&nak).unwrap();
        assert_eq!(response, Response::Nak(NakError::UnknownCommand));
        assert_eq!(NakError::UnknownCommand.to_string(), "Unknown Command");
    }

    #[test]
    fn test_nak_unenumerated_code_maps_to_unknown_error() {
        let nak = packet(RSP_NAK, &[0x7F]);
        assert_eq!(
            Response::decode(&nak).unwrap(),
            Response::Nak(NakError::Unknown)
        );
        assert_eq!(NakError::Unknown.to_string(), "Unknown Error");
    }

    #[test]
    fn test_status_response() {
        let mut payload = vec![3u8];
        payload.extend_from_slice(&1234u32.to_le_bytes());
        payload.extend_from_slice(&0b101u32.to_le_bytes());

        let response = Response::decode(&packet(b'S', &payload)).unwrap();
        assert_eq!(
            response,
            Response::Status {
                switch_id: 3,
                frame_count: 1234,
                error_flags: 0b101,
            }
        );
    }

    #[test]
    fn test_distances_response() {
        let mut payload = Vec::new();
        for i in 0..8u16 {
            payload.extend_from_slice(&(100 * (i + 1)).to_le_bytes());
        }
        let response = Response::decode(&packet(b'D', &payload)).unwrap();
        assert_eq!(
            response,
            Response::Distances([100, 200, 300, 400, 500, 600, 700, 800])
        );
    }

    #[test]
    fn test_velocity_responses_are_signed() {
        let mut payload = Vec::new();
        for i in 0..8i16 {
            payload.extend_from_slice(&(-90 * (i + 1)).to_le_bytes());
        }
        let min = Response::decode(&packet(b'V', &payload)).unwrap();
        assert_eq!(
            min,
            Response::MinVelocities([-90, -180, -270, -360, -450, -540, -630, -720])
        );
        let max = Response::decode(&packet(b'v', &payload)).unwrap();
        assert!(matches!(max, Response::MaxVelocities(_)));
    }

    #[test]
    fn test_trigger_rules_response() {
        let payload: Vec<u8> = (0..32).collect();
        let response = Response::decode(&packet(b'T', &payload)).unwrap();
        let Response::TriggerRules(rules) = response else {
            panic!("expected TriggerRules");
        };
        assert_eq!(rules[0], [0, 1, 2, 3]);
        assert_eq!(rules[7], [28, 29, 30, 31]);
    }

    #[test]
    fn test_single_value_responses_tolerate_extra_bytes() {
        let debug = Response::decode(&packet(b'G', &[1, 0xFF])).unwrap();
        assert_eq!(debug, Response::Debug(1));
        let mode = Response::decode(&packet(b'M', &[2])).unwrap();
        assert_eq!(mode, Response::Mode(2));
    }

    #[test]
    fn test_ack_names_original_command() {
        let response = Response::decode(&packet(RSP_ACK, &[b'd'])).unwrap();
        assert_eq!(
            response,
            Response::Ack {
                command: Command::WriteDistance
            }
        );
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let result = Response::decode(&packet(b'D', &[0u8; 15]));
        assert_eq!(
            result,
            Err(Error::PayloadLength {
                command: Command::ReadDistances,
                expected: 16,
                got: 15,
            })
        );
    }

    #[test]
    fn test_unknown_and_request_only_commands_rejected() {
        assert_eq!(
            Response::decode(&packet(0xEE, &[])),
            Err(Error::UnknownCommand { byte: 0xEE })
        );
        assert_eq!(
            Response::decode(&packet(b'd', &[])),
            Err(Error::UnexpectedResponse {
                command: Command::WriteDistance
            })
        );
    }

    #[test]
    fn test_write_distance_builder() {
        let request = CommandRequest::write_distance(2, 300).unwrap();
        assert_eq!(request.command(), b'd');
        assert_eq!(request.payload().as_ref(), &[2, 0x2C, 0x01]);

        assert!(CommandRequest::write_distance(2, MIN_DISTANCE_CM - 1).is_err());
        assert!(CommandRequest::write_distance(2, MAX_DISTANCE_CM + 1).is_err());
        assert!(CommandRequest::write_distance(8, 300).is_err());
    }

    #[test]
    fn test_write_velocity_builder_layout() {
        let request = CommandRequest::write_velocity(VelocityBound::Min, 1, -90).unwrap();
        assert_eq!(request.command(), b'w');
        let expected = [b'm', 1, (-90i16).to_le_bytes()[0], (-90i16).to_le_bytes()[1]];
        assert_eq!(request.payload().as_ref(), &expected);

        let request = CommandRequest::write_velocity(VelocityBound::Max, 0, 5364).unwrap();
        assert_eq!(request.payload()[0], b'x');
    }

    #[test]
    fn test_write_velocity_builder_rejects_out_of_range_magnitude() {
        // Device range is 2..=120 mph, i.e. 89..=5364 cm/s in magnitude.
        assert!(CommandRequest::write_velocity(VelocityBound::Min, 0, 44).is_err());
        assert!(CommandRequest::write_velocity(VelocityBound::Min, 0, 10_000).is_err());
        assert!(CommandRequest::write_velocity(VelocityBound::Max, 0, -44).is_err());
        assert!(CommandRequest::write_velocity(VelocityBound::Max, 0, -10_000).is_err());
        assert!(CommandRequest::write_velocity(VelocityBound::Max, 0, 0).is_err());

        // Both bounds inclusive, either sign.
        assert!(CommandRequest::write_velocity(VelocityBound::Min, 0, 89).is_ok());
        assert!(CommandRequest::write_velocity(VelocityBound::Min, 0, -89).is_ok());
        assert!(CommandRequest::write_velocity(VelocityBound::Max, 0, 5364).is_ok());
        assert!(CommandRequest::write_velocity(VelocityBound::Max, 0, -5364).is_ok());

        assert!(matches!(
            CommandRequest::write_velocity(VelocityBound::Min, 0, 10_000),
            Err(Error::OutOfRange {
                field: "velocity magnitude",
                value: 10_000,
                min: 89,
                max: 5364,
            })
        ));
    }

    #[test]
    fn test_write_mode_builder() {
        assert_eq!(
            CommandRequest::write_mode(2).unwrap().payload().as_ref(),
            &[2]
        );
        assert!(CommandRequest::write_mode(0).is_err());
        assert!(CommandRequest::write_mode(3).is_err());
    }

    #[test]
    fn test_unit_conversion_matches_device_rounding() {
        // Truncation toward zero on the way out, rounding on the way back.
        assert_eq!(mph_to_cm_per_s(MIN_VELOCITY_MPH), 89);
        assert_eq!(mph_to_cm_per_s(MAX_VELOCITY_MPH), 5364);
        assert_eq!(mph_to_cm_per_s(-2.0), -89);
        assert!((cm_per_s_to_mph(89) - 2.0).abs() < f32::EPSILON);
        assert!((cm_per_s_to_mph(-5364) + 120.0).abs() < f32::EPSILON);
    }
}
