//! pktline framing: each text segment of the wire protocol is a sequence
//! of length-prefixed lines (four hex digits covering prefix + payload),
//! with the zero-length flush-pkt `0000` as a section delimiter.

/// Largest payload one pktline can carry.
pub const MAX_PKT_PAYLOAD: usize = 65516;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("framing error: {0}")]
    Framing(String),
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// One scanned pktline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pkt<'a> {
    Flush,
    Data(&'a [u8]),
}

/// Builds a pktline stream.
#[derive(Debug, Default)]
pub struct PktEncoder {
    buf: Vec<u8>,
}

impl PktEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, payload: impl AsRef<[u8]>) {
        let payload = payload.as_ref();
        debug_assert!(payload.len() <= MAX_PKT_PAYLOAD);
        self.buf
            .extend_from_slice(format!("{:04x}", payload.len() + 4).as_bytes());
        self.buf.extend_from_slice(payload);
    }

    pub fn flush_pkt(&mut self) {
        self.buf.extend_from_slice(b"0000");
    }

    /// Append raw bytes with no framing (pack data rides unframed).
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Pulls pktlines off a byte slice one at a time.
pub struct PktScanner<'a> {
    rest: &'a [u8],
}

impl<'a> PktScanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        PktScanner { rest: bytes }
    }

    /// Bytes not yet consumed by framing.
    pub fn remainder(&self) -> &'a [u8] {
        self.rest
    }

    /// The next pktline, or `None` at end of input.
    pub fn next(&mut self) -> Result<Option<Pkt<'a>>, WireError> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        if self.rest.len() < 4 {
            return Err(WireError::Framing("truncated length prefix".to_string()));
        }
        let len = std::str::from_utf8(&self.rest[..4])
            .ok()
            .and_then(|s| usize::from_str_radix(s, 16).ok())
            .ok_or_else(|| WireError::Framing("invalid length prefix".to_string()))?;

        if len == 0 {
            self.rest = &self.rest[4..];
            return Ok(Some(Pkt::Flush));
        }
        if len < 4 || len > self.rest.len() {
            return Err(WireError::Framing(format!("bad pkt length {}", len)));
        }

        let payload = &self.rest[4..len];
        self.rest = &self.rest[len..];
        Ok(Some(Pkt::Data(payload)))
    }

    /// The next data line as text, trailing newline trimmed. Flush and end
    /// of input both read as `None`.
    pub fn next_line(&mut self) -> Result<Option<&'a str>, WireError> {
        match self.next()? {
            None | Some(Pkt::Flush) => Ok(None),
            Some(Pkt::Data(payload)) => {
                let line = std::str::from_utf8(payload)
                    .map_err(|_| WireError::Malformed("line is not utf-8".to_string()))?;
                Ok(Some(line.trim_end_matches('\n')))
            }
        }
    }
}
