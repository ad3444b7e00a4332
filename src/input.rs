use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::Result;

/// Sub-channel input from a file or a pipe, delivered in fixed-size frames
pub struct InputReader {
    reader: Box<dyn Read>,
    is_pipe: bool,
    len: Option<u64>,
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path_str = input_path.as_ref().to_string_lossy();
        let is_pipe = path_str == "-";

        let (reader, len): (Box<dyn Read>, _) = if is_pipe {
            (Box::new(io::stdin().lock()), None)
        } else {
            let file = File::open(input_path)?;
            let len = file.metadata()?.len();
            (Box::new(BufReader::new(file)), Some(len))
        };

        Ok(Self {
            reader,
            is_pipe,
            len,
        })
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }

    /// Input size in bytes, unknown for pipes
    pub fn size(&self) -> Option<u64> {
        self.len
    }

    /// Feed the input to `callback` in frames of `frame_len` bytes
    ///
    /// The callback returns Ok(false) to stop early. A trailing partial frame
    /// is dropped and its size returned.
    pub fn process_frames<F>(&mut self, frame_len: usize, mut callback: F) -> Result<usize>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut frame = vec![0u8; frame_len];
        let mut filled = 0;

        loop {
            let bytes_read = match self.reader.read(&mut frame[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if bytes_read == 0 {
                break; // EOF
            }

            filled += bytes_read;
            if filled < frame_len {
                continue;
            }

            filled = 0;
            if !callback(&frame)? {
                break;
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader returning at most three bytes per call.
    struct Trickle(io::Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(3);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn frames_are_assembled_from_short_reads() -> Result<()> {
        let mut input = InputReader {
            reader: Box::new(Trickle(io::Cursor::new((0u8..26).collect()))),
            is_pipe: true,
            len: None,
        };

        let mut frames = Vec::new();
        let rest = input.process_frames(8, |frame| {
            frames.push(frame.to_vec());
            Ok(true)
        })?;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], (16u8..24).collect::<Vec<_>>());
        assert_eq!(rest, 2);

        Ok(())
    }
}
