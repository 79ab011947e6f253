//! Large block lettering for the winner's name on the panel.

use tombola_core::transliterate;

const GLYPH_HEIGHT: usize = 7;
const GLYPH_WIDTH: usize = 5;
const SPACING: usize = 2;
const FILL: &str = "██";
const BLANK: &str = "  ";

type Glyph = [u8; GLYPH_HEIGHT];

const LETTERS: [Glyph; 26] = [
    [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
    [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
    [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
    [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
    [0b00001, 0b00001, 0b00001, 0b00001, 0b10001, 0b10001, 0b01110],
    [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
    [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
    [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
    [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
    [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
    [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
    [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
];

const DIGITS: [Glyph; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

const DASH: Glyph = [0, 0, 0, 0b11111, 0, 0, 0];
const DOT: Glyph = [0, 0, 0, 0, 0, 0b01100, 0b01100];
const SPACE: Glyph = [0; GLYPH_HEIGHT];

fn glyph(ch: char) -> Glyph {
    match ch {
        'A'..='Z' => LETTERS[(ch as u8 - b'A') as usize],
        '0'..='9' => DIGITS[(ch as u8 - b'0') as usize],
        '-' => DASH,
        '.' => DOT,
        _ => SPACE,
    }
}

/// Width in terminal columns of `text` rendered in block letters.
pub fn rendered_width(text: &str) -> usize {
    let count = text.chars().count();
    if count == 0 {
        return 0;
    }
    count * GLYPH_WIDTH * FILL.chars().count() + (count - 1) * SPACING
}

/// Render `text` in block letters, or `None` if it would exceed `max_width`.
///
/// Accents are stripped and letters upper-cased first; unsupported
/// characters render as blanks.
pub fn render(text: &str, max_width: usize) -> Option<Vec<String>> {
    let normalized = transliterate(text.trim()).to_uppercase();
    if normalized.is_empty() || rendered_width(&normalized) > max_width {
        return None;
    }

    let glyphs: Vec<Glyph> = normalized.chars().map(glyph).collect();
    let rows = (0..GLYPH_HEIGHT)
        .map(|row| {
            let mut line = String::new();
            for (index, glyph) in glyphs.iter().enumerate() {
                if index > 0 {
                    line.push_str(&" ".repeat(SPACING));
                }
                for col in 0..GLYPH_WIDTH {
                    let lit = glyph[row] & (1 << (GLYPH_WIDTH - 1 - col)) != 0;
                    line.push_str(if lit { FILL } else { BLANK });
                }
            }
            line.trim_end().to_string()
        })
        .collect();
    Some(rows)
}

/// Render the whole name if it fits, otherwise its first word.
pub fn render_name(name: &str, max_width: usize) -> Option<Vec<String>> {
    render(name, max_width).or_else(|| {
        name.split_whitespace()
            .next()
            .and_then(|first| render(first, max_width))
    })
}
