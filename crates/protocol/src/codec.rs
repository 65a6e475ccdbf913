//! Base64 code codec.
//!
//! Node code travels through the system as an opaque base64 blob; only the
//! secret resolver and the NPU worker ever look inside it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 code blob: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("code blob is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode plain source text into the base64 form carried on the wire.
pub fn encode_code(source: &str) -> String {
    STANDARD.encode(source.as_bytes())
}

/// Decode a wire code blob back into source text.
pub fn decode_code(blob: &str) -> Result<String, CodecError> {
    let bytes = STANDARD.decode(blob)?;
    Ok(String::from_utf8(bytes)?)
}
