//! Builtin-font metrics and text wrapping.
//!
//! Documents are set in the PDF base fonts (Helvetica, Times, Courier), which
//! every viewer has, so nothing is embedded. Widths come from the Helvetica
//! AFM tables; Times is approximated by scaling them and Courier is fixed
//! pitch.

/// Generic family a `font-family` list resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

impl FontFamily {
    /// Resolve a CSS `font-family` list: the first entry we can map wins.
    pub fn from_css(value: &str) -> Option<Self> {
        value.split(',').find_map(|entry| {
            let name = entry.trim().trim_matches(['"', '\'']).to_ascii_lowercase();
            match name.as_str() {
                "monospace" | "courier" | "courier new" | "consolas" | "menlo" | "monaco"
                | "sfmono-regular" | "dejavu sans mono" | "liberation mono" | "ui-monospace" => {
                    Some(FontFamily::Mono)
                }
                "serif" | "times" | "times new roman" | "georgia" | "garamond" | "cambria"
                | "palatino" | "ui-serif" => Some(FontFamily::Serif),
                "sans-serif" | "helvetica" | "helvetica neue" | "arial" | "verdana" | "tahoma"
                | "segoe ui" | "roboto" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Some(FontFamily::Sans)
                }
                n if n.contains("mono") || n.contains("code") => Some(FontFamily::Mono),
                _ => None,
            }
        })
    }
}

/// One of the twelve non-symbol base fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontSpec {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

/// Fraction of the font size above the baseline.
pub const ASCENT: f32 = 0.75;

const COURIER_ADVANCE: u16 = 600;
const TIMES_SCALE: f32 = 0.9;
const FALLBACK_ADVANCE: u16 = 556;

/// Helvetica advance widths for U+0020..=U+007E, per 1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold advance widths for U+0020..=U+007E, per 1000 em.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

/// Text measurement over the builtin fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontManager;

impl FontManager {
    pub fn new() -> Self {
        Self
    }

    fn advance(&self, ch: char, font: FontSpec) -> f32 {
        if font.family == FontFamily::Mono {
            return COURIER_ADVANCE as f32;
        }
        let table = if font.bold { &HELVETICA_BOLD } else { &HELVETICA };
        let code = ch as u32;
        let base = if (0x20..=0x7E).contains(&code) {
            table[(code - 0x20) as usize]
        } else if ch == '\u{00A0}' {
            table[0]
        } else {
            FALLBACK_ADVANCE
        } as f32;
        match font.family {
            FontFamily::Serif => base * TIMES_SCALE,
            _ => base,
        }
    }

    /// Width of `text` in points at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, font: FontSpec) -> f32 {
        let units: f32 = text.chars().map(|c| self.advance(c, font)).sum();
        units * font_size / 1000.0
    }

    /// Line box height in points.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }
}

// ---------------------------------------------------------------------------
// Wrapping
// ---------------------------------------------------------------------------

/// Input to [`wrap_fragments`]: styled text or a forced line break.
#[derive(Debug, Clone, Copy)]
pub enum Fragment<'a> {
    Text {
        text: &'a str,
        font: FontSpec,
        size: f32,
    },
    Break,
}

/// A contiguous piece of one line drawn with one fragment's style.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Index of the source fragment.
    pub fragment: usize,
    pub text: String,
    /// Offset from the start of the line.
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrappedLine {
    pub pieces: Vec<Piece>,
    pub width: f32,
    /// Largest font size on the line (0 for an empty line).
    pub max_font_size: f32,
}

impl WrappedLine {
    pub fn text(&self) -> String {
        self.pieces.iter().map(|p| p.text.as_str()).collect()
    }
}

struct LineBuilder<'f> {
    fonts: &'f FontManager,
    max_width: f32,
    lines: Vec<WrappedLine>,
    current: WrappedLine,
}

impl LineBuilder<'_> {
    fn append(&mut self, fragment: usize, text: &str, width: f32, size: f32) {
        let line = &mut self.current;
        line.max_font_size = line.max_font_size.max(size);
        match line.pieces.last_mut() {
            Some(last) if last.fragment == fragment => {
                last.text.push_str(text);
                last.width += width;
            }
            _ => line.pieces.push(Piece {
                fragment,
                text: text.to_string(),
                x: line.width,
                width,
            }),
        }
        line.width += width;
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }

    fn push_word(&mut self, fragment: usize, word: &str, font: FontSpec, size: f32, space_before: bool) {
        let width = self.fonts.measure_text_width(word, size, font);
        let mut space = if space_before && !self.current.pieces.is_empty() {
            self.fonts.measure_text_width(" ", size, font)
        } else {
            0.0
        };
        if !self.current.pieces.is_empty() && self.current.width + space + width > self.max_width {
            self.break_line();
            space = 0.0;
        }
        if space > 0.0 {
            self.append(fragment, " ", space, size);
        }
        self.append(fragment, word, width, size);
    }

    /// Append preformatted text, splitting at character boundaries where
    /// it would overflow.
    fn push_preformatted(&mut self, fragment: usize, segment: &str, font: FontSpec, size: f32) {
        let mut rest = segment;
        while !rest.is_empty() {
            let available = self.max_width - self.current.width;
            let mut used = 0.0;
            let mut end = 0;
            for (i, c) in rest.char_indices() {
                let w = self.fonts.measure_text_width(&rest[i..i + c.len_utf8()], size, font);
                if used + w > available {
                    break;
                }
                used += w;
                end = i + c.len_utf8();
            }
            if end == 0 {
                if self.current.pieces.is_empty() {
                    // Narrower than one glyph: place it anyway.
                    let c_len = rest.chars().next().map_or(rest.len(), char::len_utf8);
                    end = c_len;
                    used = self.fonts.measure_text_width(&rest[..end], size, font);
                } else {
                    self.break_line();
                    continue;
                }
            }
            self.append(fragment, &rest[..end], used, size);
            rest = &rest[end..];
            if !rest.is_empty() {
                self.break_line();
            }
        }
    }

    fn finish(mut self) -> Vec<WrappedLine> {
        if !self.current.pieces.is_empty() {
            self.lines.push(self.current);
        }
        self.lines
    }
}

/// Lay `fragments` out into lines no wider than `max_width`.
///
/// In normal mode whitespace collapses across fragment boundaries and lines
/// break between words; a word wider than the line overflows on its own
/// line. In preformatted mode whitespace is kept, `\n` breaks the line, and
/// over-long lines are split at character boundaries.
pub fn wrap_fragments(
    fragments: &[Fragment<'_>],
    max_width: f32,
    preformatted: bool,
    fonts: &FontManager,
) -> Vec<WrappedLine> {
    let mut builder = LineBuilder {
        fonts,
        max_width: max_width.max(1.0),
        lines: Vec::new(),
        current: WrappedLine::default(),
    };
    let mut pending_space = false;

    for (idx, fragment) in fragments.iter().enumerate() {
        let (text, font, size) = match *fragment {
            Fragment::Break => {
                builder.break_line();
                pending_space = false;
                continue;
            }
            Fragment::Text { text, font, size } => (text, font, size),
        };

        if preformatted {
            let expanded = text.replace('\t', "    ");
            for (n, segment) in expanded.split('\n').enumerate() {
                if n > 0 {
                    builder.break_line();
                }
                builder.push_preformatted(idx, segment.trim_end_matches('\r'), font, size);
            }
            continue;
        }

        let mut start: Option<usize> = None;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() && c != '\u{00A0}' {
                if let Some(s) = start.take() {
                    builder.push_word(idx, &text[s..i], font, size, pending_space);
                }
                pending_space = true;
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            builder.push_word(idx, &text[s..], font, size, pending_space);
            pending_space = false;
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SANS: FontSpec = FontSpec {
        family: FontFamily::Sans,
        bold: false,
        italic: false,
    };
    const MONO: FontSpec = FontSpec {
        family: FontFamily::Mono,
        bold: false,
        italic: false,
    };

    fn text(s: &str, font: FontSpec) -> Fragment<'_> {
        Fragment::Text {
            text: s,
            font,
            size: 10.0,
        }
    }

    #[test]
    fn helvetica_widths() {
        let mgr = FontManager::default();
        // H(722) e(556) l(222) l(222) o(556) = 2278
        let w = mgr.measure_text_width("Hello", 10.0, SANS);
        assert!((w - 22.78).abs() < 0.01, "got {w}");
        let bold = FontSpec { bold: true, ..SANS };
        assert!(mgr.measure_text_width("Hello", 10.0, bold) > w);
    }

    #[test]
    fn courier_is_fixed_pitch() {
        let mgr = FontManager::default();
        assert_eq!(
            mgr.measure_text_width("iiii", 10.0, MONO),
            mgr.measure_text_width("WWWW", 10.0, MONO)
        );
        assert!((mgr.measure_text_width("abc", 10.0, MONO) - 18.0).abs() < 0.01);
    }

    #[test]
    fn family_lists_resolve() {
        assert_eq!(FontFamily::from_css("\"Fira Code\", monospace"), Some(FontFamily::Mono));
        assert_eq!(FontFamily::from_css("Georgia, serif"), Some(FontFamily::Serif));
        assert_eq!(FontFamily::from_css("Unknown, Arial"), Some(FontFamily::Sans));
        assert_eq!(FontFamily::from_css("Unknown"), None);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_fragments(&[text("Hello world foo bar", SANS)], 50.0, false, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {lines:?}");
        assert!(lines.iter().all(|l| l.width <= 50.0));
    }

    #[test]
    fn whitespace_collapses_across_fragments() {
        let mgr = FontManager::default();
        let bold = FontSpec { bold: true, ..SANS };
        let frags = [text("a  \n ", SANS), text(" b", bold), text(",c", SANS)];
        let lines = wrap_fragments(&frags, 500.0, false, &mgr);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "a b,c");
        assert_eq!(lines[0].pieces.len(), 3);
        assert_eq!(lines[0].pieces[1].fragment, 1);
    }

    #[test]
    fn forced_breaks_start_new_lines() {
        let mgr = FontManager::default();
        let frags = [text("one", SANS), Fragment::Break, text("two", SANS)];
        let lines = wrap_fragments(&frags, 500.0, false, &mgr);
        let texts: Vec<String> = lines.iter().map(WrappedLine::text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn preformatted_keeps_spaces_and_blank_lines() {
        let mgr = FontManager::default();
        let lines = wrap_fragments(&[text("fn x() {\n\n    y\n}\n", MONO)], 500.0, true, &mgr);
        let texts: Vec<String> = lines.iter().map(WrappedLine::text).collect();
        assert_eq!(texts, vec!["fn x() {", "", "    y", "}"]);
    }

    #[test]
    fn preformatted_splits_long_lines() {
        let mgr = FontManager::default();
        // 6pt per glyph at 10pt: 10 glyphs fit in 60pt.
        let lines = wrap_fragments(&[text(&"x".repeat(25), MONO)], 60.0, true, &mgr);
        let lens: Vec<usize> = lines.iter().map(|l| l.text().len()).collect();
        assert_eq!(lens, vec![10, 10, 5]);
    }
}
