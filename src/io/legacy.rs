//! Corrections for legacy serialization quirks, applied between the tokenizer
//! and the parser.
//!
//! Newer solver releases write short lists inline, glued to their count:
//!
//! ```text
//! edgeLabels      List<label> 3(4 5 6);
//! value           nonuniform List<scalar> 2(0.1 0.2);
//! value           nonuniform List<vector> 1((1 0 0));
//! value           nonuniform 0();
//! ```
//!
//! The parser only understands the multi-line layout where the count is a
//! line of its own followed by a `(` line, one element per line and a `)`
//! line. [`normalize`] rewrites the inline forms into that layout with a
//! single forward scan, producing a new line list.

use crate::io::tokenizer::TokenLine;

/// Entry keys whose value may carry an inline list.
const INLINE_LIST_KEYS: &[&str] = &["edgeLabels", "value", "internalField", "faceLabels"];

/// Rewrite inline lists and glued `List<T>` markers into the multi-line layout.
pub fn normalize(lines: Vec<TokenLine>) -> Vec<TokenLine> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let line = split_glued_marker(line);
        if INLINE_LIST_KEYS.contains(&line.first()) {
            expand_inline_list(line, &mut out);
        } else {
            out.push(line);
        }
    }
    out
}

/// `List<scalar>3` -> `List<scalar>`, `3`.
fn split_glued_marker(line: TokenLine) -> TokenLine {
    if !line.tokens.iter().any(|t| glued_marker_split(t).is_some()) {
        return line;
    }
    let mut tokens = Vec::with_capacity(line.tokens.len() + 1);
    for tok in line.tokens {
        match glued_marker_split(&tok) {
            Some(at) => {
                tokens.push(tok[..at].to_string());
                tokens.push(tok[at..].to_string());
            }
            None => tokens.push(tok),
        }
    }
    TokenLine::new(line.number, tokens)
}

fn glued_marker_split(tok: &str) -> Option<usize> {
    if !tok.starts_with("List<") {
        return None;
    }
    let close = tok.find('>')? + 1;
    (close < tok.len()).then_some(close)
}

fn expand_inline_list(line: TokenLine, out: &mut Vec<TokenLine>) {
    let Some(open) = line.tokens.iter().position(|t| t == "(") else {
        out.push(line);
        return;
    };
    // `(` must be preceded by the key and a decimal count
    if open < 2 || line.tokens[open - 1].parse::<usize>().is_err() {
        out.push(line);
        return;
    }
    let Some(elements) = split_elements(&line.tokens[open + 1..]) else {
        out.push(line);
        return;
    };

    let number = line.number;
    let head = &line.tokens[..open - 1];
    if head.len() > 1 {
        out.push(TokenLine::new(number, head.to_vec()));
        out.push(TokenLine::new(number, vec![line.tokens[open - 1].clone()]));
    } else {
        // bare `key N(...)`: the list becomes the value of the key itself
        out.push(TokenLine::new(number, head.to_vec()));
    }
    out.push(TokenLine::new(number, vec!["(".to_string()]));
    out.extend(
        elements
            .into_iter()
            .map(|tokens| TokenLine::new(number, tokens)),
    );
    out.push(TokenLine::new(number, vec![")".to_string()]));
}

/// Split the tokens after an opening `(` into one token group per element.
/// Returns `None` unless the group closes exactly at the end of the line.
fn split_elements(body: &[String]) -> Option<Vec<Vec<String>>> {
    let mut elements = Vec::new();
    let mut group: Vec<String> = Vec::new();
    let mut depth = 0usize;
    for (i, tok) in body.iter().enumerate() {
        match tok.as_str() {
            "(" => {
                depth += 1;
                group.push(tok.clone());
            }
            ")" if depth == 0 => {
                return (i + 1 == body.len()).then_some(elements);
            }
            ")" => {
                depth -= 1;
                group.push(tok.clone());
                if depth == 0 {
                    elements.push(std::mem::take(&mut group));
                }
            }
            _ if depth == 0 => elements.push(vec![tok.clone()]),
            _ => group.push(tok.clone()),
        }
    }
    None
}
