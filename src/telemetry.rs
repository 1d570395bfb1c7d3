//! Telemetry state definitions
//!
//! [`TelemetryState`] is the last known snapshot of the vehicle metrics. It is written only by the
//! frame decoder and read by whatever renders the dashboard.
use core::convert::TryFrom;
#[cfg(feature = "std")]
use core::fmt;
use heapless::Vec;

/// Maximum number of token values kept from a single frame
pub const MAX_FRAME_TOKENS: usize = 32;
pub const FAULT_CODES_LENGTH: usize = 5;

pub type FaultCodes = [u8; FAULT_CODES_LENGTH];
pub type TokenVec = Vec<u8, MAX_FRAME_TOKENS>;

/// Message type carried in the first token of every frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Speed = 0,
    Temperature = 1,
    SumVoltage = 2,
    StateOfCharge = 3,
    DistanceCovered = 4,
    DistanceCoveredPrevious = 5,
    Range = 6,
    FaultCodes = 7,
    ChargeStatus = 8,
}

impl Tag {
    pub const ALL: [Tag; 9] = [
        Tag::Speed,
        Tag::Temperature,
        Tag::SumVoltage,
        Tag::StateOfCharge,
        Tag::DistanceCovered,
        Tag::DistanceCoveredPrevious,
        Tag::Range,
        Tag::FaultCodes,
        Tag::ChargeStatus,
    ];

    /// Number of tokens following the tag which are needed to update the field
    pub const fn payload_len(self) -> usize {
        match self {
            Tag::Speed
            | Tag::Temperature
            | Tag::SumVoltage
            | Tag::StateOfCharge
            | Tag::ChargeStatus => 1,
            Tag::DistanceCovered | Tag::DistanceCoveredPrevious | Tag::Range => 2,
            Tag::FaultCodes => FAULT_CODES_LENGTH,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tag::Speed),
            1 => Ok(Tag::Temperature),
            2 => Ok(Tag::SumVoltage),
            3 => Ok(Tag::StateOfCharge),
            4 => Ok(Tag::DistanceCovered),
            5 => Ok(Tag::DistanceCoveredPrevious),
            6 => Ok(Tag::Range),
            7 => Ok(Tag::FaultCodes),
            8 => Ok(Tag::ChargeStatus),
            unknown => Err(unknown),
        }
    }
}

/// Raw charge status byte, zero means not charging
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChargeStatus(pub u8);

impl ChargeStatus {
    pub fn is_charging(&self) -> bool {
        self.0 != 0
    }
}

#[cfg(feature = "std")]
impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.is_charging() {
            true => write!(f, "Charging"),
            false => write!(f, "Not charging"),
        }
    }
}

/// Last known vehicle metrics plus diagnostics about the most recently decoded frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryState {
    pub speed: u8,
    /// °C
    pub temperature: u8,
    /// V
    pub sum_voltage: u8,
    /// %, not range checked
    pub state_of_charge: u8,
    /// km
    pub distance_covered: u16,
    /// km
    pub distance_covered_previous: u16,
    /// km
    pub range: u16,
    pub fault_codes: FaultCodes,
    pub charge_status: ChargeStatus,
    /// token count of the most recent frame, including the tag
    pub last_frame_length: usize,
    /// first token of the most recent frame
    pub last_tag: u8,
    /// token values of the most recent frame, capped at [`MAX_FRAME_TOKENS`]
    pub last_tokens: TokenVec,
}

impl TelemetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `payload` into the field selected by `tag`.
    ///
    /// Returns `false` and leaves the state untouched when `payload` is shorter than
    /// [`Tag::payload_len`]. Extra tokens are ignored.
    pub fn apply(&mut self, tag: Tag, payload: &[u8]) -> bool {
        if payload.len() < tag.payload_len() {
            return false;
        }
        match tag {
            Tag::Speed => self.speed = payload[0],
            Tag::Temperature => self.temperature = payload[0],
            Tag::SumVoltage => self.sum_voltage = payload[0],
            Tag::StateOfCharge => self.state_of_charge = payload[0],
            Tag::DistanceCovered => self.distance_covered = be_u16(payload),
            Tag::DistanceCoveredPrevious => self.distance_covered_previous = be_u16(payload),
            Tag::Range => self.range = be_u16(payload),
            Tag::FaultCodes => self
                .fault_codes
                .copy_from_slice(&payload[..FAULT_CODES_LENGTH]),
            Tag::ChargeStatus => self.charge_status = ChargeStatus(payload[0]),
        }
        true
    }

    /// Payload tokens which [`Self::apply`] would need to reproduce the current value of `tag`
    pub fn payload(&self, tag: Tag) -> Vec<u8, FAULT_CODES_LENGTH> {
        let be: [u8; 2];
        let bytes: &[u8] = match tag {
            Tag::Speed => core::slice::from_ref(&self.speed),
            Tag::Temperature => core::slice::from_ref(&self.temperature),
            Tag::SumVoltage => core::slice::from_ref(&self.sum_voltage),
            Tag::StateOfCharge => core::slice::from_ref(&self.state_of_charge),
            Tag::DistanceCovered => {
                be = self.distance_covered.to_be_bytes();
                &be
            }
            Tag::DistanceCoveredPrevious => {
                be = self.distance_covered_previous.to_be_bytes();
                &be
            }
            Tag::Range => {
                be = self.range.to_be_bytes();
                &be
            }
            Tag::FaultCodes => &self.fault_codes,
            Tag::ChargeStatus => core::slice::from_ref(&self.charge_status.0),
        };
        Vec::from_slice(bytes).unwrap_or_default()
    }

    /// Records the diagnostics of a decoded frame
    pub(crate) fn note_frame(&mut self, tokens: &[u8], total: usize) {
        self.last_tag = tokens.first().copied().unwrap_or_default();
        self.last_frame_length = total;
        let kept = tokens.len().min(MAX_FRAME_TOKENS);
        self.last_tokens = TokenVec::from_slice(&tokens[..kept]).unwrap_or_default();
    }

    /// Compares only the fields carried by telemetry frames, diagnostics are ignored
    pub fn same_readings(&self, other: &TelemetryState) -> bool {
        Tag::ALL
            .iter()
            .all(|tag| self.payload(*tag) == other.payload(*tag))
    }
}

fn be_u16(payload: &[u8]) -> u16 {
    u16::from_be_bytes([payload[0], payload[1]])
}

#[cfg(feature = "std")]
struct Joined<'a>(&'a [u8], &'a str);

#[cfg(feature = "std")]
impl<'a> fmt::Display for Joined<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(self.1)?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl fmt::Display for TelemetryState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Data: {}", Joined(&self.last_tokens, ","))?;
        writeln!(f, "Frame length: {}", self.last_frame_length)?;
        writeln!(f, "First byte: {}", self.last_tag)?;
        writeln!(f, "Speed: {}", self.speed)?;
        writeln!(f, "Temperature: {} °C", self.temperature)?;
        writeln!(f, "Voltage: {} V", self.sum_voltage)?;
        writeln!(f, "Charge: {}%", self.state_of_charge)?;
        writeln!(f, "Charge status: {}", self.charge_status)?;
        writeln!(f, "Distance covered: {} km", self.distance_covered)?;
        writeln!(f, "Last distance covered: {} km", self.distance_covered_previous)?;
        writeln!(f, "Range: {} km", self.range)?;
        write!(f, "Faults: {}", Joined(&self.fault_codes, ", "))
    }
}
