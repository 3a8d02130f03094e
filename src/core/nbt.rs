//! # Structured Tag Payloads
//!
//! A typed, possibly nested value tree written in the peer's native binary tag
//! format. Item data, text components on newer revisions and similar payloads
//! travel in this format.
//!
//! Two layouts exist on the wire:
//! ```text
//! named root     [type(1)] [name len(2)] [name] [payload]   (up to 1.20.1)
//! nameless root  [type(1)] [payload]                        (1.20.2+)
//! ```

use bytes::BufMut;

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::version::ProtocolVersion;

/// A single tag value
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// Type id used on the wire
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }
}

/// An ordered set of named tags. Insertion order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a named tag
    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = tag,
            None => self.entries.push((name, tag)),
        }
    }

    /// Builder form of [`Compound::insert`]
    pub fn with(mut self, name: impl Into<String>, tag: Tag) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write a compound with an empty root name (the pre-1.20.2 network form).
pub fn write_compound_tag(buf: &mut impl BufMut, root: &Compound) -> Result<()> {
    buf.put_u8(10);
    write_tag_string(buf, "")?;
    write_compound_payload(buf, root)
}

/// Write any tag without a root name (the 1.20.2+ network form).
pub fn write_nameless_tag(buf: &mut impl BufMut, tag: &Tag) -> Result<()> {
    buf.put_u8(tag.type_id());
    write_payload(buf, tag)
}

/// Write a root tag in whichever layout `version` expects.
///
/// Revisions before 1.20.2 only accept a named compound at the root, so non-compound
/// tags are rejected there.
pub fn write_structured_payload(
    buf: &mut impl BufMut,
    tag: &Tag,
    version: ProtocolVersion,
) -> Result<()> {
    if version >= ProtocolVersion::V1_20_2 {
        return write_nameless_tag(buf, tag);
    }
    match tag {
        Tag::Compound(root) => write_compound_tag(buf, root),
        Tag::End => {
            buf.put_u8(0);
            Ok(())
        }
        _ => Err(ProtocolError::EncodingFailed(
            "root tag must be a compound before 1.20.2",
        )),
    }
}

/// Tag strings use the 2-byte length prefix of Java's modified UTF-8.
/// Plain UTF-8 is written, which matches for every character outside NUL
/// and supplementary planes.
fn write_tag_string(buf: &mut impl BufMut, text: &str) -> Result<()> {
    let len = u16::try_from(text.len())
        .map_err(|_| ProtocolError::EncodingFailed(constants::ERR_TAG_STRING_TOO_LONG))?;
    buf.put_u16(len);
    buf.put_slice(text.as_bytes());
    Ok(())
}

fn write_len(buf: &mut impl BufMut, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| ProtocolError::EncodingFailed(constants::ERR_TAG_LENGTH))?;
    buf.put_i32(len);
    Ok(())
}

fn write_compound_payload(buf: &mut impl BufMut, compound: &Compound) -> Result<()> {
    for (name, tag) in &compound.entries {
        buf.put_u8(tag.type_id());
        write_tag_string(buf, name)?;
        write_payload(buf, tag)?;
    }
    buf.put_u8(0);
    Ok(())
}

fn write_payload(buf: &mut impl BufMut, tag: &Tag) -> Result<()> {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => buf.put_i8(*v),
        Tag::Short(v) => buf.put_i16(*v),
        Tag::Int(v) => buf.put_i32(*v),
        Tag::Long(v) => buf.put_i64(*v),
        Tag::Float(v) => buf.put_f32(*v),
        Tag::Double(v) => buf.put_f64(*v),
        Tag::ByteArray(values) => {
            write_len(buf, values.len())?;
            for v in values {
                buf.put_i8(*v);
            }
        }
        Tag::String(text) => write_tag_string(buf, text)?,
        Tag::List(items) => {
            let element_type = items.first().map_or(0, Tag::type_id);
            if items.iter().any(|t| t.type_id() != element_type) {
                return Err(ProtocolError::EncodingFailed(constants::ERR_TAG_LIST_MIXED));
            }
            buf.put_u8(element_type);
            write_len(buf, items.len())?;
            for item in items {
                write_payload(buf, item)?;
            }
        }
        Tag::Compound(compound) => write_compound_payload(buf, compound)?,
        Tag::IntArray(values) => {
            write_len(buf, values.len())?;
            for v in values {
                buf.put_i32(*v);
            }
        }
        Tag::LongArray(values) => {
            write_len(buf, values.len())?;
            for v in values {
                buf.put_i64(*v);
            }
        }
    }
    Ok(())
}
