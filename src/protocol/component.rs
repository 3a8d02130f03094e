//! Chat text components.
//!
//! Revisions before 1.20.3 carry text as a JSON string. From 1.20.3 the same
//! structure travels as a binary tag compound.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::core::codec::write_string;
use crate::core::nbt::{write_structured_payload, Compound, Tag};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::version::ProtocolVersion;

/// Formatting code prefix understood by every client
const SECTION: char = '\u{00A7}';

/// A single styled text component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
}

impl Component {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Build a component from configured text, translating `&` colour codes
    /// (`&a`, `&l`, ...) into the section-sign form clients render.
    pub fn legacy(text: &str) -> Self {
        Self::text(translate_color_codes(text))
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// JSON form used before 1.20.3 and in disconnect messages
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Tag form used from 1.20.3
    pub fn to_tag(&self) -> Tag {
        let mut root = Compound::new().with("text", Tag::String(self.text.clone()));
        if let Some(color) = &self.color {
            root.insert("color", Tag::String(color.clone()));
        }
        if self.bold {
            root.insert("bold", Tag::Byte(1));
        }
        Tag::Compound(root)
    }

    /// Write the component the way `version` expects it
    pub fn write(&self, buf: &mut impl BufMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_20_3 {
            write_structured_payload(buf, &self.to_tag(), version)
        } else {
            let json = self
                .to_json()
                .map_err(|_| ProtocolError::EncodingFailed(constants::ERR_COMPONENT_JSON))?;
            write_string(buf, &json);
            Ok(())
        }
    }
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Replace `&x` with the section-sign code wherever `x` is a valid format code
pub fn translate_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '&' && is_format_code(next) => {
                out.push(SECTION);
                out.push(next.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}
