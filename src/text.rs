//! Full-width to half-width normalization for typed input.
//!
//! Japanese input methods produce full-width Latin letters, digits and
//! spaces. Those are folded to ASCII; kana, kanji and everything else
//! pass through untouched.

const FULLWIDTH_DIGIT_ZERO: u32 = 0xFF10;
const FULLWIDTH_DIGIT_NINE: u32 = 0xFF19;
const FULLWIDTH_UPPER_A: u32 = 0xFF21;
const FULLWIDTH_UPPER_Z: u32 = 0xFF3A;
const FULLWIDTH_LOWER_A: u32 = 0xFF41;
const FULLWIDTH_LOWER_Z: u32 = 0xFF5A;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Offset between a full-width form and its ASCII counterpart.
const FULLWIDTH_OFFSET: u32 = 0xFEE0;

/// Map one character to its half-width form, if it has one we convert.
pub fn halfwidth_char(ch: char) -> char {
    if ch == IDEOGRAPHIC_SPACE {
        return ' ';
    }

    let code = ch as u32;
    let mapped = matches!(
        code,
        FULLWIDTH_DIGIT_ZERO..=FULLWIDTH_DIGIT_NINE
            | FULLWIDTH_UPPER_A..=FULLWIDTH_UPPER_Z
            | FULLWIDTH_LOWER_A..=FULLWIDTH_LOWER_Z
    );

    if mapped {
        char::from_u32(code - FULLWIDTH_OFFSET).unwrap_or(ch)
    } else {
        ch
    }
}

/// Convert full-width digits, Latin letters and spaces to half-width.
pub fn to_halfwidth(text: &str) -> String {
    text.chars().map(halfwidth_char).collect()
}
