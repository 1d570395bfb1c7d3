use heapless::Vec;

use super::Frame;

/// Byte value separating the tokens of a frame
pub const DELIMITER: u8 = 0xff;
/// [`DELIMITER`] as it appears in hex text chunks
pub const HEX_DELIMITER: &str = "FF";

/// Longest frame [`WireCodec::encode_frame`] has to produce: tag + fault codes
pub const MAX_ENCODED_TOKENS: usize = 1 + crate::telemetry::FAULT_CODES_LENGTH;
/// every token takes 2 hex chars, delimiter as well
pub const MAX_HEX_FRAME_LENGTH: usize = 2 * (2 * MAX_ENCODED_TOKENS - 1);
pub const MAX_RAW_FRAME_LENGTH: usize = 2 * MAX_ENCODED_TOKENS - 1;

type HexFrameVec = Vec<u8, MAX_HEX_FRAME_LENGTH>;
type RawFrameVec = Vec<u8, MAX_RAW_FRAME_LENGTH>;

/// Representation of the telemetry stream on a particular transport
///
/// Some serial libraries hand over received data as hex text (`"00FF2A"`), others as the raw
/// bytes (`[0x00, 0xff, 0x2a]`). Both carry the same frames.
pub trait WireCodec {
    type EncodedFrame: AsRef<[u8]>;

    /// Splits one received chunk into a [`Frame`]
    fn decode_frame(data: &[u8]) -> Result<Frame, CodecError>;
    /// Joins `tokens` with the delimiter
    fn encode_frame(tokens: &[u8]) -> Result<Self::EncodedFrame, CodecError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// token is not a hexadecimal number
    MalformedToken,
    /// token does not fit into a byte
    TokenOverflow,
    /// hex text chunk is not valid UTF-8
    NotText,
    FrameCreateError,
}

impl From<core::num::ParseIntError> for CodecError {
    fn from(e: core::num::ParseIntError) -> CodecError {
        match e.kind() {
            core::num::IntErrorKind::PosOverflow => CodecError::TokenOverflow,
            _ => CodecError::MalformedToken,
        }
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            CodecError::MalformedToken => write!(f, "token is not a hexadecimal number"),
            CodecError::TokenOverflow => write!(f, "token does not fit into a byte"),
            CodecError::NotText => write!(f, "chunk is not valid text"),
            CodecError::FrameCreateError => write!(f, "frame does not fit the output buffer"),
        }
    }
}

/// Chunks are upper-case hex text, tokens separated by `FF`
pub struct HexTextCodec {}

impl HexTextCodec {
    fn parse_token(part: &str) -> Result<u8, CodecError> {
        if !part.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(CodecError::MalformedToken);
        }
        Ok(u8::from_str_radix(part, 16)?)
    }
}

impl WireCodec for HexTextCodec {
    type EncodedFrame = HexFrameVec;

    fn decode_frame(data: &[u8]) -> Result<Frame, CodecError> {
        let text = core::str::from_utf8(data).map_err(|_| CodecError::NotText)?;
        let mut frame = Frame::new();
        for part in text
            .split(HEX_DELIMITER)
            .map(|part| part.trim_matches(|c: char| c.is_ascii_whitespace()))
            .filter(|part| !part.is_empty())
        {
            frame.push(Self::parse_token(part)?);
        }
        Ok(frame)
    }

    fn encode_frame(tokens: &[u8]) -> Result<Self::EncodedFrame, CodecError> {
        let mut result = HexFrameVec::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                result
                    .extend_from_slice(HEX_DELIMITER.as_bytes())
                    .map_err(|_| CodecError::FrameCreateError)?;
            }
            result
                .extend_from_slice(&base16::encode_byte(*token, base16::EncodeUpper))
                .map_err(|_| CodecError::FrameCreateError)?;
        }
        Ok(result)
    }
}

/// Chunks are the bytes as they came over the wire, tokens separated by `0xFF`
pub struct RawBytesCodec {}

impl WireCodec for RawBytesCodec {
    type EncodedFrame = RawFrameVec;

    fn decode_frame(data: &[u8]) -> Result<Frame, CodecError> {
        let mut frame = Frame::new();
        for part in data.split(|b| *b == DELIMITER).filter(|part| !part.is_empty()) {
            match part {
                [token] => frame.push(*token),
                _ => return Err(CodecError::TokenOverflow),
            }
        }
        Ok(frame)
    }

    fn encode_frame(tokens: &[u8]) -> Result<Self::EncodedFrame, CodecError> {
        let mut result = RawFrameVec::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                result
                    .push(DELIMITER)
                    .map_err(|_| CodecError::FrameCreateError)?;
            }
            result
                .push(*token)
                .map_err(|_| CodecError::FrameCreateError)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(chunk: &str) -> Result<Frame, CodecError> {
        HexTextCodec::decode_frame(chunk.as_bytes())
    }

    #[test]
    fn test_hex_split() {
        let frame = hex("0BFF16FF21").unwrap();
        assert_eq!(frame.tokens(), &[11, 22, 33]);
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn test_hex_empty_parts_dropped() {
        let frame = hex("FFFF00FFFFFF2AFF").unwrap();
        assert_eq!(frame.tokens(), &[0, 42]);
        assert!(hex("FFFFFF").unwrap().is_empty());
        assert!(hex("").unwrap().is_empty());
    }

    #[test]
    fn test_hex_split_is_left_to_right() {
        // a "0F" token followed by the delimiter reads as "0FFF", the first "FF" wins
        let frame = hex("0FFF").unwrap();
        assert_eq!(frame.tokens(), &[0, 0x0f]);
    }

    #[test]
    fn test_hex_single_digit_tokens() {
        let frame = hex("3FF7").unwrap();
        assert_eq!(frame.tokens(), &[3, 7]);
    }

    #[test]
    fn test_hex_lower_case_token() {
        let frame = hex("04FF0aFFbc").unwrap();
        assert_eq!(frame.tokens(), &[4, 0x0a, 0xbc]);
    }

    #[test]
    fn test_hex_surrounding_whitespace() {
        let frame = hex("00FF2A\r\n").unwrap();
        assert_eq!(frame.tokens(), &[0, 42]);
    }

    #[test]
    fn test_hex_malformed() {
        assert_eq!(hex("00FFZZ"), Err(CodecError::MalformedToken));
        assert_eq!(hex("00FF+A"), Err(CodecError::MalformedToken));
        assert_eq!(hex("00FF2 A"), Err(CodecError::MalformedToken));
        assert_eq!(hex("100FF01"), Err(CodecError::TokenOverflow));
        assert_eq!(
            HexTextCodec::decode_frame(&[0x30, 0xc3, 0x28]),
            Err(CodecError::NotText)
        );
    }

    #[test]
    fn test_hex_encode() {
        let encoded = HexTextCodec::encode_frame(&[4, 1, 0x2c]).unwrap();
        assert_eq!(&encoded[..], b"04FF01FF2C");
        let encoded = HexTextCodec::encode_frame(&[]).unwrap();
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_raw_split() {
        let frame = RawBytesCodec::decode_frame(&[0xff, 0x07, 0xff, 0xff, 0x01, 0xff]).unwrap();
        assert_eq!(frame.tokens(), &[7, 1]);
        assert!(RawBytesCodec::decode_frame(&[0xff, 0xff]).unwrap().is_empty());
    }

    #[test]
    fn test_raw_run_overflows() {
        assert_eq!(
            RawBytesCodec::decode_frame(&[0x04, 0xff, 0x01, 0x2c]),
            Err(CodecError::TokenOverflow)
        );
    }

    #[test]
    fn test_raw_chunk_of_a_full_read() {
        // a whole read buffer of raw bytes, no hex conversion involved
        let mut chunk = [DELIMITER; 256];
        for token in chunk.iter_mut().step_by(2) {
            *token = 0x0b;
        }
        let frame = RawBytesCodec::decode_frame(&chunk).unwrap();
        assert_eq!(frame.len(), 128);
        assert_eq!(frame.tag(), Some(0x0b));
    }

    #[test]
    fn test_raw_encode() {
        let encoded = RawBytesCodec::encode_frame(&[6, 0x12, 0x34]).unwrap();
        assert_eq!(&encoded[..], &[6, 0xff, 0x12, 0xff, 0x34]);
    }
}
