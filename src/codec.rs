use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Streaming charset-to-UTF-8 decoder. Malformed input is replaced with
/// U+FFFD; partial multi-byte sequences are held by the inner decoder across
/// frames.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    finished: bool,
}

impl Utf8Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> Option<BytesMut> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or_else(|| src.len() * 3 + 4);
        let mut out = BytesMut::zeroed(capacity);

        let (_result, bytes_read, bytes_written, _had_errors) =
            self.decoder.decode_to_utf8(src, &mut out, last);

        src.advance(bytes_read);
        out.truncate(bytes_written);
        (!out.is_empty()).then_some(out)
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(self.transcode(src, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;
        Ok(self.transcode(buf, true))
    }
}
