//! Telemetry frame decoding
//!
//! Every chunk received from the serial line is treated as one frame: the chunk is split on the
//! `FF` delimiter, empty parts are dropped and the rest is parsed as byte tokens. The first token
//! is the [`Tag`], the following ones its payload.
//!
//! ```text
//! 04 FF 01 FF 2C
//! ^tag  ^high ^low   -> distance_covered = 0x012c = 300
//! ```
//!
//! Frames are not reassembled across chunks. A frame the transport splits into two deliveries
//! is decoded as two shorter frames, the same way the controller firmware and the existing
//! dashboard treat it.
//!
//! The protocol reserves `0xFF` without any escaping, so a payload byte of `0xFF` (or, on hex
//! text transports, a token ending in `F` next to a delimiter) breaks the framing. Decoding keeps
//! that behaviour, [`encode_field`] refuses to produce such frames.
use core::convert::TryFrom;
use core::marker::PhantomData;
#[cfg(feature = "std")]
use core::fmt;

use crate::telemetry::{Tag, TelemetryState, TokenVec};

pub mod codec;

use codec::{CodecError, WireCodec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    Codec(CodecError),
    /// encoded frame would not decode back to the same tokens because of a `0xFF` collision
    AmbiguousEncoding,
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Error {
        Error::Codec(e)
    }
}

#[cfg(feature = "std")]
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Codec(e) => write!(f, "codec error: {}", e),
            Error::AmbiguousEncoding => write!(f, "payload collides with the frame delimiter"),
        }
    }
}

/// Tokens of a single chunk
///
/// Only the first [`MAX_FRAME_TOKENS`](crate::telemetry::MAX_FRAME_TOKENS) values are kept, [`Frame::len`] is always the real count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    tokens: TokenVec,
    total: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, token: u8) {
        // values past the capacity are only counted
        let _ = self.tokens.push(token);
        self.total += 1;
    }

    pub fn tag(&self) -> Option<u8> {
        self.tokens.first().copied()
    }

    pub fn payload(&self) -> &[u8] {
        match self.tokens.len() {
            0 => &[],
            _ => &self.tokens[1..],
        }
    }

    pub fn tokens(&self) -> &[u8] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// How strictly decoded values are checked before they are stored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// values are stored exactly as received
    #[default]
    Lenient,
    /// state of charge above 100 and charge status other than 0 or 1 are refused
    Validating,
}

impl DecodeMode {
    fn accepts(self, tag: Tag, payload: &[u8]) -> bool {
        match (self, tag) {
            (DecodeMode::Lenient, _) => true,
            (DecodeMode::Validating, Tag::StateOfCharge) => payload[0] <= 100,
            (DecodeMode::Validating, Tag::ChargeStatus) => payload[0] <= 1,
            (DecodeMode::Validating, _) => true,
        }
    }
}

/// What decoding one chunk did to the state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// chunk held no tokens, nothing changed
    Empty,
    /// field of the tag was updated
    Applied(Tag),
    /// too few payload tokens for the tag, only diagnostics were updated
    ShortPayload(Tag),
    /// tag outside of the known range, only diagnostics were updated
    UnknownTag(u8),
    /// value refused by [`DecodeMode::Validating`], only diagnostics were updated
    Rejected(Tag),
    /// chunk could not be split into tokens, nothing changed
    Malformed(CodecError),
}

/// Counters of decode outcomes since the decoder was created
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub chunks: u32,
    pub applied: u32,
    pub empty: u32,
    pub malformed: u32,
    pub short_payloads: u32,
    pub unknown_tags: u32,
    pub rejected: u32,
}

impl DecodeStats {
    fn record(&mut self, outcome: &Outcome) {
        self.chunks = self.chunks.wrapping_add(1);
        let counter = match outcome {
            Outcome::Empty => &mut self.empty,
            Outcome::Applied(_) => &mut self.applied,
            Outcome::ShortPayload(_) => &mut self.short_payloads,
            Outcome::UnknownTag(_) => &mut self.unknown_tags,
            Outcome::Rejected(_) => &mut self.rejected,
            Outcome::Malformed(_) => &mut self.malformed,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// Applies a decoded frame to `state`
///
/// Diagnostics (`last_tag`, `last_frame_length`, `last_tokens`) are written for every non-empty
/// frame, the typed field only when the tag is known, the payload long enough and `mode` accepts
/// the value.
pub fn apply_frame(frame: &Frame, state: &mut TelemetryState, mode: DecodeMode) -> Outcome {
    let raw_tag = match frame.tag() {
        Some(t) => t,
        None => return Outcome::Empty,
    };
    state.note_frame(frame.tokens(), frame.len());

    let tag = match Tag::try_from(raw_tag) {
        Ok(tag) => tag,
        Err(unknown) => return Outcome::UnknownTag(unknown),
    };
    let payload = frame.payload();
    if payload.len() < tag.payload_len() {
        return Outcome::ShortPayload(tag);
    }
    if !mode.accepts(tag, payload) {
        return Outcome::Rejected(tag);
    }
    state.apply(tag, payload);
    Outcome::Applied(tag)
}

fn decode_with<C: WireCodec>(
    chunk: &[u8],
    state: &mut TelemetryState,
    mode: DecodeMode,
) -> Outcome {
    match C::decode_frame(chunk) {
        Ok(frame) => apply_frame(&frame, state, mode),
        Err(e) => Outcome::Malformed(e),
    }
}

/// Decodes one received chunk into `state` without validating values
pub fn decode<C: WireCodec>(chunk: &[u8], state: &mut TelemetryState) -> Outcome {
    decode_with::<C>(chunk, state, DecodeMode::Lenient)
}

/// Wire form of the frame carrying the current value of `tag` in `state`
pub fn encode_field<C: WireCodec>(
    tag: Tag,
    state: &TelemetryState,
) -> Result<C::EncodedFrame, Error> {
    let mut tokens = TokenVec::new();
    tokens
        .push(tag as u8)
        .map_err(|_| CodecError::FrameCreateError)?;
    tokens
        .extend_from_slice(&state.payload(tag))
        .map_err(|_| CodecError::FrameCreateError)?;

    let encoded = C::encode_frame(&tokens)?;
    match C::decode_frame(encoded.as_ref()) {
        Ok(frame) if frame.tokens() == &tokens[..] => Ok(encoded),
        _ => Err(Error::AmbiguousEncoding),
    }
}

/// Decoder kept for the lifetime of a serial session
///
/// Decoding itself holds no state between chunks, the decoder only remembers its
/// [`DecodeMode`] and counts outcomes.
pub struct TelemetryDecoder<C: WireCodec> {
    mode: DecodeMode,
    stats: DecodeStats,
    codec: PhantomData<C>,
}

impl<C: WireCodec> TelemetryDecoder<C> {
    pub fn new() -> Self {
        Self::with_mode(DecodeMode::Lenient)
    }

    pub fn with_mode(mode: DecodeMode) -> Self {
        Self {
            mode,
            stats: DecodeStats::default(),
            codec: PhantomData,
        }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Decodes `chunk` into `state`, never fails
    ///
    /// Malformed chunks, short payloads and unknown tags are reported in the returned
    /// [`Outcome`] and leave the affected fields as they were.
    pub fn process_chunk(&mut self, chunk: &[u8], state: &mut TelemetryState) -> Outcome {
        let outcome = decode_with::<C>(chunk, state, self.mode);
        self.stats.record(&outcome);

        match outcome {
            Outcome::Applied(tag) => trace!("applied {:?}", tag),
            Outcome::Empty => trace!("empty chunk"),
            Outcome::ShortPayload(tag) => debug!(
                "short payload for {:?}, {} tokens in frame",
                tag,
                state.last_frame_length
            ),
            Outcome::UnknownTag(tag) => debug!("unknown tag {}", tag),
            Outcome::Rejected(tag) => debug!("value out of range for {:?}", tag),
            Outcome::Malformed(e) => warn!("dropping malformed chunk: {:?}", e),
        }
        outcome
    }
}

impl<C: WireCodec> Default for TelemetryDecoder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::codec::{HexTextCodec, RawBytesCodec};
    use super::*;
    use crate::telemetry::{ChargeStatus, MAX_FRAME_TOKENS};
    use rand::{thread_rng, Rng};

    fn hex(chunk: &str, state: &mut TelemetryState) -> Outcome {
        decode::<HexTextCodec>(chunk.as_bytes(), state)
    }

    #[test]
    fn test_delimiters_only_is_noop() {
        let mut state = TelemetryState::new();
        hex("00FF2A", &mut state);
        let before = state.clone();

        for chunk in &["", "FF", "FFFF", "FFFFFFFFFF"] {
            assert_eq!(hex(chunk, &mut state), Outcome::Empty);
            assert_eq!(state, before);
        }
    }

    #[test]
    fn test_unknown_tag_updates_diagnostics_only() {
        let mut state = TelemetryState::new();
        let outcome = hex("0BFF16FF21", &mut state);

        assert_eq!(outcome, Outcome::UnknownTag(11));
        assert_eq!(state.last_tag, 11);
        assert_eq!(state.last_frame_length, 3);
        assert_eq!(&state.last_tokens[..], &[11, 22, 33]);
        assert!(state.same_readings(&TelemetryState::new()));
    }

    #[test]
    fn test_speed() {
        let mut state = TelemetryState::new();
        assert_eq!(hex("00FF2A", &mut state), Outcome::Applied(Tag::Speed));
        assert_eq!(state.speed, 42);
        assert_eq!(state.last_tag, 0);
        assert_eq!(state.last_frame_length, 2);
    }

    #[test]
    fn test_single_byte_fields() {
        let mut state = TelemetryState::new();
        hex("01FF19", &mut state);
        hex("02FF30", &mut state);
        hex("03FF64", &mut state);
        assert_eq!(state.temperature, 25);
        assert_eq!(state.sum_voltage, 48);
        assert_eq!(state.state_of_charge, 100);
    }

    #[test]
    fn test_distance_big_endian() {
        let mut state = TelemetryState::new();
        assert_eq!(
            hex("04FF01FF2C", &mut state),
            Outcome::Applied(Tag::DistanceCovered)
        );
        assert_eq!(state.distance_covered, 300);

        hex("05FF02FF00", &mut state);
        hex("06FF00FF96", &mut state);
        assert_eq!(state.distance_covered_previous, 512);
        assert_eq!(state.range, 150);
    }

    #[test]
    fn test_fault_codes_short_payload() {
        let mut state = TelemetryState::new();
        hex("07FF09FF08FF07FF06FF05", &mut state);
        assert_eq!(state.fault_codes, [9, 8, 7, 6, 5]);

        let outcome = hex("07FF01FF02FF03FF04", &mut state);
        assert_eq!(outcome, Outcome::ShortPayload(Tag::FaultCodes));
        assert_eq!(state.fault_codes, [9, 8, 7, 6, 5]);
        assert_eq!(state.last_frame_length, 5);
        assert_eq!(state.last_tag, 7);
    }

    #[test]
    fn test_short_payload_does_not_touch_other_fields() {
        let mut state = TelemetryState::new();
        hex("00FF2A", &mut state);
        hex("04FF01FF2C", &mut state);
        let before = state.clone();

        assert_eq!(hex("04FF07", &mut state), Outcome::ShortPayload(Tag::DistanceCovered));
        assert_eq!(hex("00", &mut state), Outcome::ShortPayload(Tag::Speed));
        assert!(state.same_readings(&before));
        assert_eq!(state.last_frame_length, 1);
    }

    #[test]
    fn test_charge_status_toggles() {
        let mut state = TelemetryState::new();
        hex("08FF00", &mut state);
        assert!(!state.charge_status.is_charging());
        hex("08FF01", &mut state);
        assert!(state.charge_status.is_charging());
    }

    #[test]
    fn test_same_chunk_twice_is_stable() {
        let mut state = TelemetryState::new();
        hex("06FF03FFE8", &mut state);
        let first = state.clone();
        hex("06FF03FFE8", &mut state);
        assert_eq!(state, first);
        assert_eq!(state.range, 1000);
    }

    #[test]
    fn test_malformed_chunk_keeps_state() {
        let mut state = TelemetryState::new();
        hex("00FF2A", &mut state);
        let before = state.clone();

        assert_eq!(
            hex("01FFXY", &mut state),
            Outcome::Malformed(CodecError::MalformedToken)
        );
        assert_eq!(
            hex("01FF123", &mut state),
            Outcome::Malformed(CodecError::TokenOverflow)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_extra_payload_tokens() {
        let mut state = TelemetryState::new();
        assert_eq!(hex("00FF2AFF2B", &mut state), Outcome::Applied(Tag::Speed));
        assert_eq!(state.speed, 42);
        assert_eq!(state.last_frame_length, 3);
    }

    #[test]
    fn test_long_frame_counts_all_tokens() {
        let mut chunk = std::string::String::from("0B");
        for _ in 0..MAX_FRAME_TOKENS + 8 {
            chunk.push_str("FF01");
        }
        let mut state = TelemetryState::new();
        assert_eq!(hex(&chunk, &mut state), Outcome::UnknownTag(11));
        assert_eq!(state.last_frame_length, MAX_FRAME_TOKENS + 9);
        assert_eq!(state.last_tokens.len(), MAX_FRAME_TOKENS);
    }

    #[test]
    fn test_split_frame_is_not_reassembled() {
        let mut state = TelemetryState::new();
        assert_eq!(hex("04FF01", &mut state), Outcome::ShortPayload(Tag::DistanceCovered));
        // second half starts a new frame, its first token is read as a tag
        assert_eq!(hex("FF2C", &mut state), Outcome::UnknownTag(0x2c));
        assert_eq!(state.distance_covered, 0);
    }

    #[test]
    fn test_raw_bytes() {
        let mut state = TelemetryState::new();
        let outcome = decode::<RawBytesCodec>(&[0x04, 0xff, 0x01, 0xff, 0x2c], &mut state);
        assert_eq!(outcome, Outcome::Applied(Tag::DistanceCovered));
        assert_eq!(state.distance_covered, 300);
    }

    #[test]
    fn test_round_trip_every_tag() {
        let mut snapshot = TelemetryState::new();
        snapshot.speed = 88;
        snapshot.temperature = 31;
        snapshot.sum_voltage = 72;
        snapshot.state_of_charge = 64;
        snapshot.distance_covered = 300;
        snapshot.distance_covered_previous = 0x1234;
        snapshot.range = 0x0a10;
        snapshot.fault_codes = [0x10, 0x02, 0x30, 0x04, 0x50];
        snapshot.charge_status = ChargeStatus(1);

        for tag in Tag::ALL.iter() {
            let mut hex_state = TelemetryState::new();
            let encoded = encode_field::<HexTextCodec>(*tag, &snapshot).unwrap();
            assert_eq!(
                decode::<HexTextCodec>(&encoded, &mut hex_state),
                Outcome::Applied(*tag)
            );
            assert_eq!(hex_state.payload(*tag), snapshot.payload(*tag));

            let mut raw_state = TelemetryState::new();
            let encoded = encode_field::<RawBytesCodec>(*tag, &snapshot).unwrap();
            assert_eq!(
                decode::<RawBytesCodec>(&encoded, &mut raw_state),
                Outcome::Applied(*tag)
            );
            assert_eq!(raw_state.payload(*tag), snapshot.payload(*tag));
        }
    }

    #[test]
    fn test_random_round_trip_raw() {
        let mut rng = thread_rng();
        for _ in 0..64 {
            let mut snapshot = TelemetryState::new();
            snapshot.speed = rng.gen_range(0, 0xff);
            snapshot.distance_covered =
                u16::from_be_bytes([rng.gen_range(0, 0xff), rng.gen_range(0, 0xff)]);
            let mut faults = [0u8; 5];
            for code in faults.iter_mut() {
                *code = rng.gen_range(0, 0xff);
            }
            snapshot.fault_codes = faults;

            let mut state = TelemetryState::new();
            for tag in &[Tag::Speed, Tag::DistanceCovered, Tag::FaultCodes] {
                let encoded = encode_field::<RawBytesCodec>(*tag, &snapshot).unwrap();
                decode::<RawBytesCodec>(&encoded, &mut state);
            }
            assert!(state.same_readings(&snapshot));
        }
    }

    #[test]
    fn test_encode_refuses_delimiter_collision() {
        let mut snapshot = TelemetryState::new();
        snapshot.range = 0xff10;
        assert_eq!(
            encode_field::<RawBytesCodec>(Tag::Range, &snapshot),
            Err(Error::AmbiguousEncoding)
        );
        assert_eq!(
            encode_field::<HexTextCodec>(Tag::Range, &snapshot),
            Err(Error::AmbiguousEncoding)
        );

        // 0x0f followed by a delimiter reads as "0FFF" in hex text
        snapshot.range = 0x0f10;
        assert!(encode_field::<RawBytesCodec>(Tag::Range, &snapshot).is_ok());
        assert_eq!(
            encode_field::<HexTextCodec>(Tag::Range, &snapshot),
            Err(Error::AmbiguousEncoding)
        );
    }

    #[test]
    fn test_validating_mode() {
        let mut decoder = TelemetryDecoder::<HexTextCodec>::with_mode(DecodeMode::Validating);
        let mut state = TelemetryState::new();

        assert_eq!(
            decoder.process_chunk(b"03FF50", &mut state),
            Outcome::Applied(Tag::StateOfCharge)
        );
        assert_eq!(
            decoder.process_chunk(b"03FF96", &mut state),
            Outcome::Rejected(Tag::StateOfCharge)
        );
        assert_eq!(state.state_of_charge, 80);
        assert_eq!(state.last_tokens.last(), Some(&150));
        assert_eq!(
            decoder.process_chunk(b"08FF02", &mut state),
            Outcome::Rejected(Tag::ChargeStatus)
        );
        assert_eq!(state.charge_status, ChargeStatus(0));
    }

    #[test]
    fn test_decoder_and_decode_agree() {
        let chunks: [&[u8]; 5] = [b"00FF2A", b"FF", b"0BFF16", b"04FF01", b"01FFXY"];
        let mut decoder = TelemetryDecoder::<HexTextCodec>::new();
        let mut from_decoder = TelemetryState::new();
        let mut from_decode = TelemetryState::new();
        for chunk in chunks.iter() {
            assert_eq!(
                decoder.process_chunk(chunk, &mut from_decoder),
                decode::<HexTextCodec>(chunk, &mut from_decode)
            );
        }
        assert_eq!(from_decoder, from_decode);
    }

    #[test]
    fn test_lenient_mode_keeps_out_of_range_values() {
        let mut decoder = TelemetryDecoder::<HexTextCodec>::new();
        let mut state = TelemetryState::new();
        decoder.process_chunk(b"03FF96", &mut state);
        decoder.process_chunk(b"08FF02", &mut state);
        assert_eq!(state.state_of_charge, 150);
        assert_eq!(state.charge_status, ChargeStatus(2));
    }

    #[test]
    fn test_decoder_stats() {
        let mut decoder = TelemetryDecoder::<HexTextCodec>::new();
        let mut state = TelemetryState::new();
        let chunks: [&[u8]; 6] = [
            b"00FF2A",
            b"FFFF",
            b"0BFF16FF21",
            b"07FF01",
            b"00FFQQ",
            b"01FF19",
        ];
        for chunk in chunks.iter() {
            decoder.process_chunk(chunk, &mut state);
        }
        assert_eq!(
            decoder.stats(),
            &DecodeStats {
                chunks: 6,
                applied: 2,
                empty: 1,
                malformed: 1,
                short_payloads: 1,
                unknown_tags: 1,
                rejected: 0,
            }
        );
    }
}
