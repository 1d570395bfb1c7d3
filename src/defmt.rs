use defmt::Formatter;

use crate::frame::codec::CodecError;
use crate::frame::{DecodeMode, DecodeStats, Error as FrameError, Outcome};
use crate::telemetry::{ChargeStatus, Tag, TelemetryState};

impl defmt::Format for CodecError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            CodecError::MalformedToken => defmt::write!(fmt, "MalformedToken"),
            CodecError::TokenOverflow => defmt::write!(fmt, "TokenOverflow"),
            CodecError::NotText => defmt::write!(fmt, "NotText"),
            CodecError::FrameCreateError => defmt::write!(fmt, "FrameCreateError"),
        }
    }
}

impl defmt::Format for FrameError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            FrameError::Codec(e) => defmt::write!(fmt, "Codec({})", e),
            FrameError::AmbiguousEncoding => defmt::write!(fmt, "AmbiguousEncoding"),
        }
    }
}

impl defmt::Format for Tag {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "Tag({=u8})", *self as u8)
    }
}

impl defmt::Format for ChargeStatus {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "ChargeStatus({=u8})", self.0)
    }
}

impl defmt::Format for DecodeMode {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            DecodeMode::Lenient => defmt::write!(fmt, "Lenient"),
            DecodeMode::Validating => defmt::write!(fmt, "Validating"),
        }
    }
}

impl defmt::Format for Outcome {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            Outcome::Empty => defmt::write!(fmt, "Empty"),
            Outcome::Applied(tag) => defmt::write!(fmt, "Applied({})", tag),
            Outcome::ShortPayload(tag) => defmt::write!(fmt, "ShortPayload({})", tag),
            Outcome::UnknownTag(tag) => defmt::write!(fmt, "UnknownTag({=u8})", tag),
            Outcome::Rejected(tag) => defmt::write!(fmt, "Rejected({})", tag),
            Outcome::Malformed(e) => defmt::write!(fmt, "Malformed({})", e),
        }
    }
}

impl defmt::Format for DecodeStats {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "DecodeStats {{ chunks: {=u32}, applied: {=u32}, empty: {=u32}, malformed: {=u32}, short_payloads: {=u32}, unknown_tags: {=u32}, rejected: {=u32} }}",
            self.chunks,
            self.applied,
            self.empty,
            self.malformed,
            self.short_payloads,
            self.unknown_tags,
            self.rejected
        )
    }
}

impl defmt::Format for TelemetryState {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "TelemetryState {{ speed: {=u8}, temperature: {=u8}, sum_voltage: {=u8}, state_of_charge: {=u8}, distance_covered: {=u16}, distance_covered_previous: {=u16}, range: {=u16}, fault_codes: {}, charge_status: {}, last_tag: {=u8}, last_frame_length: {=usize} }}",
            self.speed,
            self.temperature,
            self.sum_voltage,
            self.state_of_charge,
            self.distance_covered,
            self.distance_covered_previous,
            self.range,
            self.fault_codes,
            self.charge_status,
            self.last_tag,
            self.last_frame_length
        )
    }
}

#[cfg(feature = "std")]
impl defmt::Format for crate::session::SessionError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            crate::session::SessionError::NotFound => defmt::write!(fmt, "NotFound"),
            crate::session::SessionError::PermissionDenied => {
                defmt::write!(fmt, "PermissionDenied")
            }
            crate::session::SessionError::InvalidConfig => defmt::write!(fmt, "InvalidConfig"),
            crate::session::SessionError::Disconnected => defmt::write!(fmt, "Disconnected"),
            crate::session::SessionError::Io(kind) => {
                defmt::write!(fmt, "Io({})", defmt::Debug2Format(kind))
            }
        }
    }
}
