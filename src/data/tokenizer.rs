// ============================================================
// Layer 4 — Basic English Tokenizer
// ============================================================
// Rule-based word splitter for the neural path. No subword or
// language-aware segmentation, just a handful of character
// rules applied to the lowercased text:
//
//   "<br />", whitespace, ';' and ':'   → token boundary (dropped)
//   '"'                                  → dropped, no boundary
//   ' . , ( ) ! ?                        → a token on their own
//   anything else                        → part of the current word
//
// Example:
//   "I didn't like it.<br />Boring!"
//   → ["i", "didn", "'", "t", "like", "it", ".", "boring", "!"]
//
// `tokenize` returns a lazy iterator that walks the input on
// demand and stops after `max_len` tokens. Calling it again on
// the same text starts over from the beginning.

/// HTML line break that litters scraped reviews
const LINE_BREAK: &str = "<br />";

/// Characters emitted as standalone tokens
fn is_standalone(c: char) -> bool {
    matches!(c, '\'' | '.' | ',' | '(' | ')' | '!' | '?')
}

/// Characters that only separate tokens
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ';' || c == ':'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicEnglishTokenizer {
    max_len: usize,
}

impl BasicEnglishTokenizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Lazily split `text` into at most `max_len` lowercase tokens.
    pub fn tokenize<'a>(&self, text: &'a str) -> Tokens<'a> {
        Tokens { src: text, pos: 0, remaining: self.max_len }
    }

    #[cfg(test)]
    pub(crate) fn tokenize_to_vec(&self, text: &str) -> Vec<String> {
        self.tokenize(text).collect()
    }
}

/// Iterator over the tokens of one text.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    src: &'a str,
    pos: usize,
    remaining: usize,
}

impl<'a> Tokens<'a> {
    fn at_line_break(&self) -> bool {
        self.src
            .get(self.pos..self.pos + LINE_BREAK.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(LINE_BREAK))
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }

        let mut word = String::new();
        while self.pos < self.src.len() {
            if self.at_line_break() {
                self.pos += LINE_BREAK.len();
                if word.is_empty() { continue } else { break }
            }

            let Some(c) = self.src[self.pos..].chars().next() else { break };

            if is_standalone(c) {
                // Finish the pending word first; the punctuation is
                // picked up as its own token on the next call.
                if word.is_empty() {
                    self.pos += c.len_utf8();
                    word.push(c);
                }
                break;
            }

            self.pos += c.len_utf8();
            if c == '"' {
                continue;
            }
            if is_separator(c) {
                if word.is_empty() { continue } else { break }
            }
            word.extend(c.to_lowercase());
        }

        if word.is_empty() {
            self.remaining = 0;
            return None;
        }
        self.remaining -= 1;
        Some(word)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<String> {
        BasicEnglishTokenizer::new(usize::MAX).tokenize_to_vec(text)
    }

    #[test]
    fn test_lowercases_and_splits_punctuation() {
        assert_eq!(
            toks("I didn't like it.<br />Boring!"),
            vec!["i", "didn", "'", "t", "like", "it", ".", "boring", "!"]
        );
    }

    #[test]
    fn test_drops_quotes_and_colons() {
        assert_eq!(toks("a \"great\" film; verdict: yes"), vec!["a", "great", "film", "verdict", "yes"]);
        // quotes inside a word do not split it
        assert_eq!(toks("re\"make"), vec!["remake"]);
    }

    #[test]
    fn test_uppercase_line_break_is_removed() {
        assert_eq!(toks("one<BR />two"), vec!["one", "two"]);
    }

    #[test]
    fn test_truncates_to_max_len() {
        let t = BasicEnglishTokenizer::new(3);
        assert_eq!(t.tokenize_to_vec("a b c d e"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(toks("").is_empty());
        assert!(toks("  \n\t ; : \"\" <br />").is_empty());
    }

    #[test]
    fn test_is_restartable() {
        let t = BasicEnglishTokenizer::new(10);
        let text = "Fine, (mostly) fine?";
        let first: Vec<String> = t.tokenize(text).collect();
        let second: Vec<String> = t.tokenize(text).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["fine", ",", "(", "mostly", ")", "fine", "?"]);
    }

    #[test]
    fn test_is_lazy() {
        let t = BasicEnglishTokenizer::new(1000);
        let mut it = t.tokenize("alpha beta gamma");
        assert_eq!(it.next().as_deref(), Some("alpha"));
        assert_eq!(it.next().as_deref(), Some("beta"));
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(toks("Café ÉCLAIR"), vec!["café", "éclair"]);
    }
}
