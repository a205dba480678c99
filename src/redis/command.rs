//! Outbound store commands.
//!
//! A `Command` is a verb plus raw byte arguments. Counter code builds them
//! through the helpers in `counter::target`; connections only ever see the
//! verb/argument list and encode it as a RESP array.

use super::resp::{RespParser, RespValue};
use bytes::{Bytes, BytesMut};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: &'static str,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(verb: &'static str) -> Self {
        Command {
            verb,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn str_arg(self, arg: &str) -> Self {
        self.arg(Bytes::copy_from_slice(arg.as_bytes()))
    }

    pub fn str_args<'a, I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.args
            .extend(args.into_iter().map(|a| Bytes::copy_from_slice(a.as_bytes())));
        self
    }

    pub fn verb(&self) -> &'static str {
        self.verb
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Append this command's RESP encoding to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let mut parts: Vec<&[u8]> = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.verb.as_bytes());
        parts.extend(self.args.iter().map(|a| &a[..]));
        RespParser::encode_command(parts.into_iter(), buf);
    }

    /// The command as the request value a server parses.
    pub fn to_resp(&self) -> RespValue {
        let mut elements = Vec::with_capacity(self.args.len() + 1);
        elements.push(RespValue::bulk(self.verb.as_bytes().to_vec()));
        elements.extend(self.args.iter().map(|a| RespValue::bulk(a.to_vec())));
        RespValue::Array(Some(elements))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
