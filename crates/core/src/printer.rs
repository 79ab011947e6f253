//! Receipt rendering for the thermal printer.
//!
//! The printer only understands plain ASCII, so every string is transliterated
//! before it is encoded as ESC/POS.

use std::{
    collections::HashMap,
    io::{self, Write},
};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;

use crate::{config::PrinterConfig, draw::DrawOutcome, mode::GameMode};

const ESC: u8 = 0x1B;
const LF: u8 = 0x0A;
const STYLE_NORMAL: u8 = 0x00;
const STYLE_DOUBLE: u8 = 0x30;

static TRANSLITERATIONS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    HashMap::from([
        ('á', 'a'),
        ('à', 'a'),
        ('â', 'a'),
        ('ä', 'a'),
        ('é', 'e'),
        ('è', 'e'),
        ('ê', 'e'),
        ('ë', 'e'),
        ('í', 'i'),
        ('ì', 'i'),
        ('î', 'i'),
        ('ï', 'i'),
        ('ó', 'o'),
        ('ò', 'o'),
        ('ô', 'o'),
        ('ö', 'o'),
        ('ú', 'u'),
        ('ù', 'u'),
        ('û', 'u'),
        ('ü', 'u'),
        ('ñ', 'n'),
        ('ç', 'c'),
        ('Á', 'A'),
        ('À', 'A'),
        ('Â', 'A'),
        ('Ä', 'A'),
        ('É', 'E'),
        ('È', 'E'),
        ('Ê', 'E'),
        ('Ë', 'E'),
        ('Í', 'I'),
        ('Ì', 'I'),
        ('Î', 'I'),
        ('Ï', 'I'),
        ('Ó', 'O'),
        ('Ò', 'O'),
        ('Ô', 'O'),
        ('Ö', 'O'),
        ('Ú', 'U'),
        ('Ù', 'U'),
        ('Û', 'U'),
        ('Ü', 'U'),
        ('Ñ', 'N'),
        ('Ç', 'C'),
        ('¡', '!'),
        ('¿', '?'),
    ])
});

/// Replace accented letters with their unaccented ASCII equivalents.
///
/// Characters outside the table are kept as they are.
pub fn transliterate(text: &str) -> String {
    text.chars()
        .map(|ch| TRANSLITERATIONS.get(&ch).copied().unwrap_or(ch))
        .collect()
}

/// Print style of one receipt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Regular size.
    Normal,
    /// Double height and width.
    Emphasized,
}

/// One centered line of a receipt, already transliterated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    /// Printable text.
    pub text: String,
    /// Style applied to the line.
    pub style: LineStyle,
}

impl ReceiptLine {
    fn normal(text: &str) -> Self {
        Self {
            text: transliterate(text),
            style: LineStyle::Normal,
        }
    }

    fn emphasized(text: &str) -> Self {
        Self {
            text: transliterate(text),
            style: LineStyle::Emphasized,
        }
    }
}

/// A rendered receipt ready for preview or printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    lines: Vec<ReceiptLine>,
    feed_lines: u8,
}

impl Receipt {
    /// Lines in print order.
    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }

    /// Lines joined with newlines, without styling.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Encode as ESC/POS: init, centered lines, trailing feed for tear-off.
    pub fn to_escpos(&self) -> Vec<u8> {
        let mut bytes = vec![ESC, b'@', ESC, b'a', 0x01];
        let mut current = LineStyle::Normal;
        for line in &self.lines {
            if line.style != current {
                bytes.extend_from_slice(&[ESC, b'!', style_byte(line.style)]);
                current = line.style;
            }
            bytes.extend(
                line.text
                    .chars()
                    .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' }),
            );
            bytes.push(LF);
        }
        if current != LineStyle::Normal {
            bytes.extend_from_slice(&[ESC, b'!', STYLE_NORMAL]);
        }
        bytes.extend(std::iter::repeat(LF).take(usize::from(self.feed_lines)));
        bytes
    }
}

fn style_byte(style: LineStyle) -> u8 {
    match style {
        LineStyle::Normal => STYLE_NORMAL,
        LineStyle::Emphasized => STYLE_DOUBLE,
    }
}

/// Fixed parts of every receipt.
#[derive(Debug, Clone)]
pub struct ReceiptLayout {
    header: String,
    footer: String,
    width: usize,
    feed_lines: u8,
}

impl ReceiptLayout {
    /// Layout from the printer section of the configuration.
    pub fn from_config(config: &PrinterConfig) -> Self {
        Self {
            header: config.header.clone(),
            footer: config.footer.clone(),
            width: config.width,
            feed_lines: config.feed_lines,
        }
    }

    fn separator(&self) -> ReceiptLine {
        ReceiptLine::normal(&"-".repeat(self.width))
    }

    fn finish(&self, mut lines: Vec<ReceiptLine>, printed_at: Option<DateTime<Local>>) -> Receipt {
        if let Some(at) = printed_at {
            lines.push(ReceiptLine::normal(&at.format("%Y-%m-%d %H:%M").to_string()));
        }
        Receipt {
            lines,
            feed_lines: self.feed_lines,
        }
    }

    /// Receipt announcing a draw.
    pub fn draw_receipt(
        &self,
        mode: GameMode,
        outcome: &DrawOutcome,
        printed_at: Option<DateTime<Local>>,
    ) -> Receipt {
        let mut lines = vec![ReceiptLine::normal(&self.header), self.separator()];
        if mode == GameMode::Group {
            lines.push(ReceiptLine::normal(mode.label()));
        }
        lines.extend(outcome.names().into_iter().map(ReceiptLine::emphasized));
        if let Some(question) = outcome.question() {
            lines.push(self.separator());
            lines.extend(
                wrap(question, self.width)
                    .iter()
                    .map(|part| ReceiptLine::normal(part)),
            );
        }
        lines.push(self.separator());
        if !self.footer.trim().is_empty() {
            lines.push(ReceiptLine::normal(&self.footer));
        }
        self.finish(lines, printed_at)
    }

    /// Receipt carrying a status message, e.g. an empty roster notice.
    pub fn message_receipt(&self, message: &str, printed_at: Option<DateTime<Local>>) -> Receipt {
        let mut lines = vec![ReceiptLine::normal(&self.header), self.separator()];
        lines.extend(
            wrap(message, self.width)
                .iter()
                .map(|part| ReceiptLine::normal(part)),
        );
        lines.push(self.separator());
        self.finish(lines, printed_at)
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Writes receipts to a byte sink such as a serial port.
pub struct Printer<W: Write> {
    sink: W,
}

impl<W: Write> Printer<W> {
    /// Printer writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Send one receipt and flush.
    pub fn print(&mut self, receipt: &Receipt) -> io::Result<()> {
        self.sink.write_all(&receipt.to_escpos())?;
        self.sink.flush()
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ReceiptLayout {
        ReceiptLayout::from_config(&PrinterConfig::default())
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle)
    }

    #[test]
    fn transliterates_spanish_names() {
        assert_eq!(transliterate("José Ñandú"), "Jose Nandu");
        assert_eq!(transliterate("¿Qué pasó, Begoña?"), "?Que paso, Begona?");
    }

    #[test]
    fn transliteration_is_identity_on_ascii() {
        let ascii = "Plain ASCII 123 -_.";
        assert_eq!(transliterate(ascii), ascii);
        let once = transliterate("Ágata Müller");
        assert_eq!(transliterate(&once), once);
    }

    #[test]
    fn individual_receipt_layout() {
        let outcome = DrawOutcome::Single {
            name: "Iñaki".to_string(),
        };
        let receipt = layout().draw_receipt(GameMode::Individual, &outcome, None);
        let texts: Vec<&str> = receipt.lines().iter().map(|line| line.text.as_str()).collect();

        assert_eq!(texts[0], "TOMBOLA INTELIGENTE");
        assert_eq!(texts[1], "-".repeat(27));
        assert_eq!(texts[2], "Inaki");
        assert_eq!(receipt.lines()[2].style, LineStyle::Emphasized);
        assert_eq!(texts[4], "!Felicidades!");
    }

    #[test]
    fn escpos_encoding_emphasizes_names_and_feeds() {
        let outcome = DrawOutcome::Paired {
            name: "Zoe".to_string(),
            question: "¿Cuánto es 2+2?".to_string(),
        };
        let bytes = layout()
            .draw_receipt(GameMode::PairedQuestion, &outcome, None)
            .to_escpos();

        assert_eq!(&bytes[..5], &[ESC, b'@', ESC, b'a', 0x01]);
        assert!(contains(&bytes, &[ESC, b'!', STYLE_DOUBLE, b'Z', b'o', b'e', LF]));
        assert!(contains(&bytes, &[ESC, b'!', STYLE_NORMAL]));
        assert!(contains(&bytes, b"?Cuanto es 2+2?\n"));
        assert!(bytes.is_ascii());
        assert!(bytes.ends_with(&[LF, LF, LF, LF]));
    }

    #[test]
    fn group_receipt_lists_names_in_draw_order() {
        let outcome = DrawOutcome::Group {
            names: vec!["Luis".to_string(), "Ana".to_string(), "Zoe".to_string()],
        };
        let receipt = layout().draw_receipt(GameMode::Group, &outcome, None);
        let emphasized: Vec<&str> = receipt
            .lines()
            .iter()
            .filter(|line| line.style == LineStyle::Emphasized)
            .map(|line| line.text.as_str())
            .collect();
        assert_eq!(emphasized, vec!["Luis", "Ana", "Zoe"]);
    }

    #[test]
    fn message_receipt_wraps_long_text() {
        let receipt = layout().message_receipt(
            "La lista esta vacia, pulse reiniciar para volver a empezar",
            None,
        );
        assert!(receipt
            .lines()
            .iter()
            .all(|line| line.text.chars().count() <= 27));
        assert!(receipt.plain_text().contains("reiniciar"));
    }

    #[test]
    fn printer_writes_encoded_bytes() {
        let receipt = layout().message_receipt("Hola", None);
        let mut printer = Printer::new(Vec::new());
        printer.print(&receipt).unwrap();
        assert_eq!(printer.into_inner(), receipt.to_escpos());
    }
}
