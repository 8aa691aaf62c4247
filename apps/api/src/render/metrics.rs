//! Glyph-width tables for the four PDF base fonts templates may use.
//!
//! Widths are the standard base-14 AFM advance widths in thousandths of an em,
//! covering ASCII 0x20..=0x7E. Index = (char as usize) - 32. Other characters
//! fall back to the table's average width, which is close enough for wrapping
//! the Latin-1 text the PDF writer can encode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
}

impl FontFamily {
    pub const ALL: [FontFamily; 4] = [
        FontFamily::Helvetica,
        FontFamily::HelveticaBold,
        FontFamily::TimesRoman,
        FontFamily::TimesBold,
    ];

    /// PostScript name of the base font.
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::HelveticaBold => "Helvetica-Bold",
            FontFamily::TimesRoman => "Times-Roman",
            FontFamily::TimesBold => "Times-Bold",
        }
    }

    /// Resource name used inside page content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "F1",
            FontFamily::HelveticaBold => "F2",
            FontFamily::TimesRoman => "F3",
            FontFamily::TimesBold => "F4",
        }
    }
}

pub struct FontMetricTable {
    widths: [u16; 95],
    average: u16,
}

impl FontMetricTable {
    fn char_width(&self, c: char) -> u16 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else {
            self.average
        }
    }

    /// Rendered width of `s` in points at `size_pt`.
    pub fn measure_pt(&self, s: &str, size_pt: f32) -> f32 {
        let thousandths: u32 = s.chars().map(|c| self.char_width(c) as u32).sum();
        thousandths as f32 * size_pt / 1000.0
    }

    /// Greedy word wrap at `max_width_pt`. Explicit newlines start a new line;
    /// words wider than a full line are split by character.
    pub fn wrap(&self, text: &str, max_width_pt: f32, size_pt: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let space = self.measure_pt(" ", size_pt);

        for paragraph in text.lines() {
            let mut current = String::new();
            let mut current_width = 0.0_f32;

            for word in paragraph.split_whitespace() {
                let word_width = self.measure_pt(word, size_pt);

                if word_width > max_width_pt {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    for piece in self.split_long_word(word, max_width_pt, size_pt) {
                        lines.push(piece);
                    }
                    if let Some(last) = lines.pop() {
                        current_width = self.measure_pt(&last, size_pt);
                        current = last;
                    }
                    continue;
                }

                if current.is_empty() {
                    current.push_str(word);
                    current_width = word_width;
                } else if current_width + space + word_width <= max_width_pt {
                    current.push(' ');
                    current.push_str(word);
                    current_width += space + word_width;
                } else {
                    lines.push(std::mem::replace(&mut current, word.to_string()));
                    current_width = word_width;
                }
            }

            if !current.is_empty() {
                lines.push(current);
            }
        }
        lines
    }

    fn split_long_word(&self, word: &str, max_width_pt: f32, size_pt: f32) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut width = 0.0_f32;
        for c in word.chars() {
            let w = self.char_width(c) as f32 * size_pt / 1000.0;
            if !current.is_empty() && width + w > max_width_pt {
                pieces.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(c);
            width += w;
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

/// Returns the static metric table for `font`.
pub fn get_metrics(font: FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::Helvetica => &HELVETICA,
        FontFamily::HelveticaBold => &HELVETICA_BOLD,
        FontFamily::TimesRoman => &TIMES_ROMAN,
        FontFamily::TimesBold => &TIMES_BOLD,
    }
}

/// Line advance for a font size.
pub fn line_height(size_pt: f32) -> f32 {
    size_pt * 1.35
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp  !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :   ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A-M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N-Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [   \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a-m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n-z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {   |    }    ~
        334, 260, 334, 584,
    ],
    average: 540,
};

static HELVETICA_BOLD: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        333, 333, 584, 584, 584, 611, 975,
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        333, 278, 333, 584, 556, 333,
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        389, 280, 389, 584,
    ],
    average: 580,
};

static TIMES_ROMAN: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
        278, 278, 564, 564, 564, 444, 921,
        722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
        722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
        333, 278, 333, 469, 500, 333,
        444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
        500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
        480, 200, 480, 541,
    ],
    average: 480,
};

static TIMES_BOLD: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
        333, 333, 570, 570, 570, 500, 930,
        722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
        722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
        333, 278, 333, 581, 500, 333,
        500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
        556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
        394, 220, 394, 520,
    ],
    average: 520,
};
