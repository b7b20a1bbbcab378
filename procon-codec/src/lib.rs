use bytes::{Buf, BufMut, Bytes, BytesMut};
use procon_protocol::{Dump, Report, COMMAND_FRAME_LEN, COMMAND_SENTINEL};
use std::io::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Cuts a byte stream from the HID bridge into fixed-size command frames and
/// writes outbound reports back verbatim.
pub struct ProconCodec {
    frame_len: usize,
}

impl ProconCodec {
    pub fn new(frame_len: usize) -> Self {
        Self { frame_len }
    }
}

impl Default for ProconCodec {
    fn default() -> Self {
        Self::new(COMMAND_FRAME_LEN)
    }
}

impl Decoder for ProconCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == COMMAND_SENTINEL) {
            Some(0) => {}
            Some(skip) => {
                warn!("Skipping {} byte(s) in front of a command frame", skip);
                src.advance(skip);
            }
            None => {
                if !src.is_empty() {
                    warn!("Discarding {} byte(s) without a command sentinel", src.len());
                    src.clear();
                }
                return Ok(None);
            }
        }

        if src.len() < self.frame_len {
            src.reserve(self.frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(self.frame_len).freeze();
        trace!("Decoded frame {}", Dump::rx(&frame));
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    warn!("Dropping {} byte(s) of a partial frame at end of stream", buf.len());
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Report> for ProconCodec {
    type Error = Error;

    fn encode(&mut self, item: Report, dst: &mut BytesMut) -> Result<(), Self::Error> {
        trace!("Encoding report {}", Dump::tx(item.as_bytes()));

        dst.put_slice(item.as_bytes());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(subcommand: u8) -> Vec<u8> {
        let mut frame = vec![0u8; COMMAND_FRAME_LEN];
        frame[0] = COMMAND_SENTINEL;
        frame[11] = subcommand;
        frame
    }

    #[test]
    fn test_decode_whole_frames() -> Result<(), Error> {
        let mut codec = ProconCodec::default();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&command(0x02));
        buf.extend_from_slice(&command(0x08));

        assert_eq!(codec.decode(&mut buf)?.as_deref(), Some(&command(0x02)[..]));
        assert_eq!(codec.decode(&mut buf)?.as_deref(), Some(&command(0x08)[..]));
        assert_eq!(codec.decode(&mut buf)?, None);

        Ok(())
    }

    #[test]
    fn test_decode_waits_for_full_frame() -> Result<(), Error> {
        let mut codec = ProconCodec::default();
        let frame = command(0x10);
        let mut buf = BytesMut::from(&frame[..20]);

        assert_eq!(codec.decode(&mut buf)?, None);
        assert_eq!(buf.len(), 20);

        buf.extend_from_slice(&frame[20..]);
        assert_eq!(codec.decode(&mut buf)?.as_deref(), Some(&frame[..]));
        assert!(buf.is_empty());

        Ok(())
    }

    #[test]
    fn test_decode_resyncs_on_sentinel() -> Result<(), Error> {
        let mut codec = ProconCodec::default();
        let mut buf = BytesMut::from(&[0x00, 0x13, 0x37][..]);
        buf.extend_from_slice(&command(0x48));

        assert_eq!(codec.decode(&mut buf)?.as_deref(), Some(&command(0x48)[..]));

        let mut garbage = BytesMut::from(&[0x01, 0x02, 0x03][..]);
        assert_eq!(codec.decode(&mut garbage)?, None);
        assert!(garbage.is_empty());

        Ok(())
    }

    #[test]
    fn test_decode_eof_drops_partial_frame() -> Result<(), Error> {
        let mut codec = ProconCodec::default();
        let mut buf = BytesMut::from(&command(0x02)[..10]);

        assert_eq!(codec.decode_eof(&mut buf)?, None);
        assert!(buf.is_empty());

        Ok(())
    }

    #[test]
    fn test_encode_report() -> Result<(), Error> {
        let mut codec = ProconCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Report::empty(50), &mut buf)?;

        assert_eq!(buf.len(), 50);
        assert_eq!(buf[0], 0xA1);
        assert!(buf[1..].iter().all(|b| *b == 0));

        Ok(())
    }
}
