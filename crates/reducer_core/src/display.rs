//! Turning reducer numbers into displayable characters.
//!
//! Not every integer names a Unicode scalar. Rather than failing, the stage
//! substitutes a placeholder and keeps going.

use std::fmt;

use tracing::debug;

use crate::Reducer;

pub const DEFAULT_PLACEHOLDER: char = '\u{FFFD}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub code: i64,
    pub rendered: char,
    /// `true` when `code` had no scalar and `rendered` is the placeholder.
    pub substituted: bool,
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rendered)
    }
}

pub fn display_scalar(code: i64, placeholder: char) -> Glyph {
    match u32::try_from(code).ok().and_then(char::from_u32) {
        Some(rendered) => Glyph {
            code,
            rendered,
            substituted: false,
        },
        None => {
            debug!(code, "no unicode scalar for value, substituting placeholder");
            Glyph {
                code,
                rendered: placeholder,
                substituted: true,
            }
        }
    }
}

/// Pipeline stage mapping every incoming number to a [`Glyph`].
#[derive(Debug, Clone, Copy)]
pub struct ScalarDisplay {
    placeholder: char,
}

impl ScalarDisplay {
    pub fn new() -> Self {
        Self::with_placeholder(DEFAULT_PLACEHOLDER)
    }

    pub fn with_placeholder(placeholder: char) -> Self {
        Self { placeholder }
    }

    pub fn placeholder(&self) -> char {
        self.placeholder
    }
}

impl Default for ScalarDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for ScalarDisplay {
    type Message = i64;
    type Output = Glyph;

    fn handle(&mut self, code: i64) -> Option<Glyph> {
        Some(display_scalar(code, self.placeholder))
    }
}
