//! JSON text in the separator style of the host's reference handlers.
use serde::{ser::Error as _, Serialize};
use serde_json::ser::{Formatter, Serializer};
use std::io;

/// Single-line JSON with `", "` between items and `": "` after keys.
///
/// Non-ASCII text is written as raw UTF-8, never as `\u` escapes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    #[inline]
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize `value` with [`SpacedFormatter`].
pub fn to_string<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::with_capacity(64);
    let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}
