// NETCONF 1.0 end-of-message framing (`]]>]]>`).

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

const EOM: &[u8] = b"]]>]]>";

/// Frames NETCONF messages delimited by `]]>]]>`.
///
/// Frames larger than `max_frame_len` are rejected rather than buffered
/// without bound.
#[derive(Debug, Clone)]
pub struct EomCodec {
    max_frame_len: usize,
    /// Bytes already scanned without finding a delimiter.
    scanned: usize,
}

impl EomCodec {
    pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

    pub fn new() -> Self {
        Self::with_max_frame_len(Self::DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            scanned: 0,
        }
    }
}

impl Default for EomCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EomCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        // Resume a few bytes back so a delimiter split across reads is found.
        let from = self.scanned.saturating_sub(EOM.len() - 1);
        let found = src[from..]
            .windows(EOM.len())
            .position(|w| w == EOM)
            .map(|i| from + i);

        let Some(end) = found else {
            self.scanned = src.len();
            if src.len() > self.max_frame_len {
                return Err(Error::Framing(format!(
                    "message exceeds {} bytes without end-of-message marker",
                    self.max_frame_len
                )));
            }
            return Ok(None);
        };

        self.scanned = 0;
        let frame = src.split_to(end);
        src.advance(EOM.len());
        let text = String::from_utf8(frame.to_vec())
            .map_err(|e| Error::Framing(format!("message is not UTF-8: {e}")))?;
        Ok(Some(text.trim().to_owned()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.iter().all(u8::is_ascii_whitespace) => Ok(None),
            None => Err(Error::SessionClosed),
        }
    }
}

impl Encoder<String> for EomCodec {
    type Error = Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Error> {
        dst.reserve(item.len() + EOM.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_slice(EOM);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_split_across_reads() {
        let mut codec = EomCodec::new();
        let mut buf = BytesMut::from("<hello/>]]>]");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"]>\n<rpc-reply/>]]>]]>");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("<hello/>"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("<rpc-reply/>"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = EomCodec::with_max_frame_len(8);
        let mut buf = BytesMut::from("<0123456789/>");
        assert!(matches!(codec.decode(&mut buf), Err(Error::Framing(_))));
    }

    #[test]
    fn truncated_frame_at_eof_is_session_closed() {
        let mut codec = EomCodec::new();
        let mut buf = BytesMut::from("<rpc-reply>");
        assert!(matches!(codec.decode_eof(&mut buf), Err(Error::SessionClosed)));
    }

    #[test]
    fn encode_appends_marker() {
        let mut codec = EomCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("<rpc/>".to_owned(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"<rpc/>]]>]]>\n");
    }
}
