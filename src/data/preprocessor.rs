// ============================================================
// Layer 4 — Tweet Preprocessor
// ============================================================
// Cleans one raw tweet before it is joined into a corpus.
//
// A tweet must end up on exactly one line: the newline is the
// tweet delimiter the model learns, so any line break inside
// a tweet would split it in two.
//
// Cleaning steps (applied in order):
//   1. Decode the HTML entities the Twitter API escapes
//   2. Map typographic quotes/dashes to ASCII equivalents
//   3. Replace line breaks, tabs, control characters and
//      Unicode space variants with a plain space
//   4. Collapse runs of spaces and trim the ends
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single tweet into a single trimmed line.
    pub fn clean(&self, tweet: &str) -> String {

        // ── Step 1: HTML entities ─────────────────────────────────────────────
        // `&amp;` goes last so "&amp;lt;" decodes to "&lt;", not "<".
        let step1 = tweet
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");

        // ── Step 2/3: Normalise individual characters ─────────────────────────
        let step2: String = step1
            .chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                '\u{2013}' | '\u{2014}' => '-',
                '\n' | '\r' | '\t' => ' ',
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        // ── Step 4: Collapse multiple spaces ──────────────────────────────────
        let mut out        = String::with_capacity(step2.len());
        let mut last_space = false;

        for c in step2.chars() {
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("first line\nsecond\r\nthird"), "first line second third");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_decodes_entities() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("fish &amp; chips &lt;3"), "fish & chips <3");
        assert_eq!(p.clean("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_ascii_quotes() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("\u{201C}it\u{2019}s\u{201D}"), "\"it's\"");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}
