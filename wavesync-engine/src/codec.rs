//! Socket payload decoding.

use std::io::Read;

use flate2::read::GzDecoder;
use wavesync_messages::ServerMessage;

use crate::error::DecodeError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One message as read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

/// Decode a socket message into a [`ServerMessage`].
///
/// Binary messages may be gzip-compressed. Spectrum data is returned in
/// ascending frequency order.
pub fn decode(payload: &Payload) -> Result<ServerMessage, DecodeError> {
    let mut message: ServerMessage = match payload {
        Payload::Text(text) => serde_json::from_str(text)?,
        Payload::Binary(bytes) if bytes.starts_with(&GZIP_MAGIC) => {
            let mut json = Vec::new();
            GzDecoder::new(&bytes[..])
                .read_to_end(&mut json)
                .map_err(DecodeError::Decompress)?;
            serde_json::from_slice(&json)?
        }
        Payload::Binary(bytes) => serde_json::from_slice(bytes)?,
    };

    if let ServerMessage::Spectrum(spectrum) = &mut message {
        unwrap_fft_order(&mut spectrum.data);
    }
    Ok(message)
}

/// FFT shift: the server sends [DC, positive, negative]; this rearranges the
/// bins to [negative, DC, positive].
pub fn unwrap_fft_order(bins: &mut [f32]) {
    let n = bins.len();
    bins.rotate_right(n / 2);
}
