use colored::{Color, ColoredString, Colorize};
use phf::phf_map;

use crate::types::StatusCode;

/// Single glyph shown in the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub glyph: &'static str,
    pub color: Color,
}

impl Marker {
    #[must_use]
    pub fn paint(&self) -> ColoredString {
        self.glyph.color(self.color)
    }
}

// https://git-scm.com/docs/git-status#_short_format
static STATUS_MARKERS: phf::Map<&'static str, Marker> = phf_map! {
    "  " => Marker { glyph: "|", color: Color::Green },

    // not updated
    " M" => Marker { glyph: "+", color: Color::Red },
    " D" => Marker { glyph: "-", color: Color::Red },

    // updated in index
    "M " => Marker { glyph: "+", color: Color::Green },
    "MM" => Marker { glyph: "+", color: Color::Green },
    "MD" => Marker { glyph: "+", color: Color::Green },

    // added to index
    "A " => Marker { glyph: "+", color: Color::Green },
    "AM" => Marker { glyph: "+", color: Color::Green },
    "AD" => Marker { glyph: "+", color: Color::Green },

    // deleted from index
    "D " => Marker { glyph: "-", color: Color::Green },
    "DM" => Marker { glyph: "-", color: Color::Green },

    // renamed in index
    "R " => Marker { glyph: ">", color: Color::Green },
    "RM" => Marker { glyph: ">", color: Color::Green },
    "RD" => Marker { glyph: ">", color: Color::Green },

    // copied in index
    "C " => Marker { glyph: ">", color: Color::Green },
    "CM" => Marker { glyph: ">", color: Color::Green },
    "CD" => Marker { glyph: ">", color: Color::Green },

    "??" => Marker { glyph: "+", color: Color::Yellow },
    "!!" => Marker { glyph: "|", color: Color::White },
};

/// Marker for `code`, or `None` for codes outside the table (e.g. merge conflicts).
#[must_use]
pub fn marker(code: &StatusCode) -> Option<&'static Marker> {
    STATUS_MARKERS.get(code.as_str())
}
