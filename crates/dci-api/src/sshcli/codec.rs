// Line framing with prompt detection.
//
// Device output is newline-terminated except for the prompt, which sits at
// the end of the buffer waiting for input. Complete lines are yielded as
// they arrive; an unterminated tail is yielded as a prompt once it ends in
// one of the dialect's prompt characters.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliFrame {
    Line(String),
    Prompt(String),
}

#[derive(Debug, Clone)]
pub struct PromptCodec {
    prompt_suffixes: Vec<char>,
    max_line_len: usize,
}

impl PromptCodec {
    pub fn new(prompt_suffixes: Vec<char>) -> Self {
        Self {
            prompt_suffixes,
            max_line_len: 64 * 1024,
        }
    }

    fn is_prompt(&self, tail: &str) -> bool {
        tail.trim_end()
            .chars()
            .last()
            .is_some_and(|c| self.prompt_suffixes.contains(&c))
    }
}

/// Drop telnet option negotiation and terminal control bytes.
fn clean(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect::<String>()
}

impl Decoder for PromptCodec {
    type Item = CliFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<CliFrame>, Error> {
        if let Some(nl) = src.iter().position(|b| *b == b'\n') {
            let line = src.split_to(nl);
            src.advance(1);
            return Ok(Some(CliFrame::Line(clean(&line).trim_end().to_owned())));
        }

        if src.len() > self.max_line_len {
            return Err(Error::Framing(format!(
                "line exceeds {} bytes",
                self.max_line_len
            )));
        }

        let tail = clean(src);
        if self.is_prompt(&tail) {
            src.clear();
            return Ok(Some(CliFrame::Prompt(tail.trim().to_owned())));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<CliFrame>, Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(CliFrame::Line(clean(&rest).trim_end().to_owned())))
    }
}

impl Encoder<String> for PromptCodec {
    type Error = Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Error> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
