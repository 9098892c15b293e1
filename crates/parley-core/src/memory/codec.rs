//! On-disk conversation format.
//!
//! A conversation is a JSON array of turn objects, pretty-printed with
//! 2-space indentation, with every non-ASCII character written as a `\uXXXX`
//! escape. This matches existing conversation files byte for byte, so a
//! rewrite only ever appends.

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

use crate::types::Turn;

/// Serialize turns to the persisted form.
pub fn encode(turns: &[Turn]) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128 * turns.len().max(1));
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiPrettyFormatter::new());
    turns.serialize(&mut ser)?;
    Ok(buf)
}

/// Parse the persisted form.
pub fn decode(bytes: &[u8]) -> serde_json::Result<Vec<Turn>> {
    serde_json::from_slice(bytes)
}

/// Pretty formatter that escapes everything outside printable ASCII.
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            if start < i {
                writer.write_all(fragment[start..i].as_bytes())?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
