//! Line demultiplexing of fetcher output
//!
//! The fetcher writes to two independent pipes. Reads return arbitrary chunks,
//! so a line may arrive split across several reads. [`LineDemuxer`] keeps one
//! pending buffer per channel and hands back only complete lines.

/// Output channel of a fetcher process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Standard output (progress)
    Primary,
    /// Standard error (diagnostics, and progress on some fetcher versions)
    Secondary,
}

/// Splits chunked byte input into lines, independently per [`Channel`]
///
/// Lines are split on `\n` and carriage returns are removed. Bytes are buffered
/// undecoded, so a multi-byte UTF-8 character split across chunks is decoded
/// intact once its line completes.
#[derive(Debug, Default)]
pub struct LineDemuxer {
    primary: Vec<u8>,
    secondary: Vec<u8>,
}

impl LineDemuxer {
    /// Create a demuxer with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to `channel` and iterate over the lines it completes
    ///
    /// The iterator is lazy: lines it has not yielded when dropped stay
    /// buffered and are yielded by the next `feed` on the same channel, so no
    /// line is delivered twice or lost.
    pub fn feed(&mut self, channel: Channel, chunk: &[u8]) -> Lines<'_> {
        let buf = self.buffer_mut(channel);
        buf.extend_from_slice(chunk);
        Lines { buf, consumed: 0 }
    }

    /// End `channel`, returning its unterminated trailing fragment as a final line
    ///
    /// Returns `None` when nothing but line terminators was pending.
    pub fn finish(&mut self, channel: Channel) -> Option<String> {
        let rest = std::mem::take(self.buffer_mut(channel));
        let line = decode_line(&rest);
        (!line.is_empty()).then_some(line)
    }

    #[cfg(test)]
    pub(crate) fn pending(&self, channel: Channel) -> usize {
        match channel {
            Channel::Primary => self.primary.len(),
            Channel::Secondary => self.secondary.len(),
        }
    }

    fn buffer_mut(&mut self, channel: Channel) -> &mut Vec<u8> {
        match channel {
            Channel::Primary => &mut self.primary,
            Channel::Secondary => &mut self.secondary,
        }
    }
}

/// Iterator over complete lines produced by [`LineDemuxer::feed`]
pub struct Lines<'a> {
    buf: &'a mut Vec<u8>,
    consumed: usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let rest = &self.buf[self.consumed..];
        let newline = rest.iter().position(|&b| b == b'\n')?;
        let line = decode_line(&rest[..newline]);
        self.consumed += newline + 1;
        Some(line)
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.buf.drain(..self.consumed);
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    if line.contains('\r') {
        line.replace('\r', "")
    } else {
        line.into_owned()
    }
}
