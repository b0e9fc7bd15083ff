//! Line tokenizer for the solver's dictionary text format.
//!
//! The tokenizer is line based: every physical line becomes at most one
//! [`TokenLine`]. Cleaning rules:
//! - an optional fixed number of banner lines is skipped,
//! - `/* ... */` block comments (the banner) and `//` comments are removed,
//! - tokens are split on whitespace and trailing `;` is stripped,
//! - `(`, `)`, `[`, `]`, `{`, `}` always become tokens of their own, whether
//!   they stand alone or are glued to a neighbouring token,
//! - lines that are empty after cleaning are dropped.

/// Tokenizer configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Number of leading lines to skip unconditionally (the fixed banner).
    /// `None` relies on comment stripping alone.
    pub skip_lines: Option<usize>,
}

impl TokenizerOptions {
    /// Skip a fixed banner of `lines` lines.
    pub fn with_skip_lines(lines: usize) -> Self {
        Self {
            skip_lines: Some(lines),
        }
    }
}

/// One cleaned, non-empty line of tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenLine {
    /// 1-based physical line number in the source text.
    pub number: usize,
    /// Tokens in source order.
    pub tokens: Vec<String>,
}

impl TokenLine {
    pub fn new(number: usize, tokens: Vec<String>) -> Self {
        Self { number, tokens }
    }

    /// True when the line is exactly the single token `tok`.
    pub fn is(&self, tok: &str) -> bool {
        self.tokens.len() == 1 && self.tokens[0] == tok
    }

    pub fn first(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }
}

/// Incremental tokenizer; feed it physical lines one at a time.
#[derive(Debug)]
pub struct Tokenizer {
    skip: usize,
    line_no: usize,
    in_block_comment: bool,
}

impl Tokenizer {
    pub fn new(options: &TokenizerOptions) -> Self {
        Self {
            skip: options.skip_lines.unwrap_or(0),
            line_no: 0,
            in_block_comment: false,
        }
    }

    /// Consume one physical line; returns its tokens unless it cleans to nothing.
    pub fn feed(&mut self, raw: &str) -> Option<TokenLine> {
        self.line_no += 1;
        if self.line_no <= self.skip {
            return None;
        }
        let text = self.strip_comments(raw);
        let tokens = split_tokens(&text);
        if tokens.is_empty() {
            None
        } else {
            Some(TokenLine::new(self.line_no, tokens))
        }
    }

    fn strip_comments(&mut self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        loop {
            if self.in_block_comment {
                match rest.find("*/") {
                    Some(end) => {
                        self.in_block_comment = false;
                        rest = &rest[end + 2..];
                    }
                    None => break,
                }
            } else {
                let block = rest.find("/*");
                let line = line_comment_start(rest);
                match (block, line) {
                    (Some(b), Some(l)) if l < b => {
                        out.push_str(&rest[..l]);
                        break;
                    }
                    (Some(b), _) => {
                        out.push_str(&rest[..b]);
                        out.push(' ');
                        self.in_block_comment = true;
                        rest = &rest[b + 2..];
                    }
                    (None, Some(l)) => {
                        out.push_str(&rest[..l]);
                        break;
                    }
                    (None, None) => {
                        out.push_str(rest);
                        break;
                    }
                }
            }
        }
        out
    }
}

/// `//` starts a comment only at the beginning of a line or after whitespace.
fn line_comment_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find("//") {
        let at = from + pos;
        if at == 0 || bytes[at - 1].is_ascii_whitespace() {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

fn is_bracket(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

/// Split one comment-free line into cleaned tokens.
pub fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        for c in word.chars() {
            if is_bracket(c) {
                flush(&mut current, &mut tokens);
                tokens.push(c.to_string());
            } else {
                current.push(c);
            }
        }
        flush(&mut current, &mut tokens);
    }
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    let cleaned = current.trim_end_matches(';');
    if !cleaned.is_empty() {
        tokens.push(cleaned.to_string());
    }
    current.clear();
}

/// Tokenize a whole text.
pub fn tokenize(text: &str, options: &TokenizerOptions) -> Vec<TokenLine> {
    let mut tokenizer = Tokenizer::new(options);
    text.lines().filter_map(|line| tokenizer.feed(line)).collect()
}
