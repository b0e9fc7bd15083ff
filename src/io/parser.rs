//! Recursive-descent parser for the dictionary format.
//!
//! Grammar over cleaned token lines:
//!
//! ```text
//! dict  := entry*                        (top level, until end of input)
//!        | '{' entry* '}'                (nested)
//! entry := key value...                  (flat entry, one line)
//!        | key NEWLINE '{' dict '}'
//!        | key NEWLINE '(' list ')'
//! list  := (scalar | vector | name NEWLINE '{' dict '}' | '(' list ')')*
//! ```
//!
//! A flat entry with exactly nine value tokens (`name` + seven exponents +
//! value) is a [`Value::DimensionedScalar`]; three numbers form a
//! [`Value::Vector3`]; any other multi-token value is a literal tuple
//! ([`Value::List`]). Brackets inside a flat entry only group and are dropped.
//!
//! A counted list `N ( ... )` is stored as an ordinary entry keyed by the
//! decimal count `N`; see [`Dict::counted_list`].

use crate::data::field::Vector3;
use crate::io::legacy;
use crate::io::tokenizer::{TokenLine, TokenizerOptions, tokenize};
use crate::io::value::{Dict, Value, parse_number};
use crate::mesh_error::ParseError;

/// Tokenize, apply legacy corrections and parse a whole dictionary text.
pub fn parse_dictionary(text: &str, options: &TokenizerOptions) -> Result<Dict, ParseError> {
    let lines = legacy::normalize(tokenize(text, options));
    parse_lines(&lines)
}

/// Parse already tokenized (and normalized) lines as a top-level dictionary.
pub fn parse_lines(lines: &[TokenLine]) -> Result<Dict, ParseError> {
    let mut parser = Parser { lines, pos: 0 };
    parser.parse_dict_body(false)
}

struct Parser<'a> {
    lines: &'a [TokenLine],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<&'a TokenLine> {
        let line = self.lines.get(self.pos)?;
        self.pos += 1;
        Some(line)
    }

    fn peek(&self) -> Option<&'a TokenLine> {
        self.lines.get(self.pos)
    }

    fn parse_dict_body(&mut self, nested: bool) -> Result<Dict, ParseError> {
        let mut dict = Dict::new();
        loop {
            let Some(line) = self.next() else {
                if nested {
                    return Err(eof("dictionary"));
                }
                return Ok(dict);
            };
            if line.is("}") {
                if nested {
                    return Ok(dict);
                }
                return Err(unexpected(line, 0));
            }
            let key = line.first();
            if is_structural(key) {
                return Err(unexpected(line, 0));
            }
            if line.tokens.len() == 1 {
                let value = self.parse_block(line)?;
                dict.insert(key, value);
            } else {
                dict.insert(key, flat_value(line, 1)?);
            }
        }
    }

    /// The value following a key that stands alone on its line.
    fn parse_block(&mut self, key_line: &TokenLine) -> Result<Value, ParseError> {
        let Some(open) = self.next() else {
            return Err(eof(&format!("value of `{}`", key_line.first())));
        };
        if open.is("{") {
            Ok(Value::Dict(self.parse_dict_body(true)?))
        } else if open.is("(") {
            Ok(Value::List(self.parse_list_body()?))
        } else {
            Err(unexpected(open, 0))
        }
    }

    fn parse_list_body(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            let Some(line) = self.next() else {
                return Err(eof("list"));
            };
            if line.is(")") {
                return Ok(items);
            }
            if line.is("(") {
                items.push(Value::List(self.parse_list_body()?));
                continue;
            }
            if line.tokens.len() == 1 {
                let tok = line.first();
                if is_structural(tok) {
                    return Err(unexpected(line, 0));
                }
                match self.peek() {
                    Some(next) if next.is("{") => {
                        self.pos += 1;
                        items.push(Value::Atom(tok.to_string()));
                        items.push(Value::Dict(self.parse_dict_body(true)?));
                    }
                    Some(next) if next.is("(") && tok.parse::<usize>().is_ok() => {
                        self.pos += 1;
                        items.push(Value::List(self.parse_list_body()?));
                    }
                    _ => items.push(Value::from_token(tok)),
                }
            } else {
                items.push(flat_value(line, 0)?);
            }
        }
    }
}

fn is_structural(tok: &str) -> bool {
    matches!(tok, "{" | "}" | "(" | ")")
}

/// Decode the tokens of `line` starting at `from` as one flat value.
fn flat_value(line: &TokenLine, from: usize) -> Result<Value, ParseError> {
    check_balanced(line, from)?;
    let tokens: Vec<&str> = line.tokens[from..]
        .iter()
        .map(String::as_str)
        .filter(|t| !matches!(*t, "(" | ")" | "[" | "]"))
        .collect();

    if let Some(pos) = tokens.iter().position(|t| matches!(*t, "{" | "}")) {
        let at = line.tokens.iter().position(|t| t == tokens[pos]).unwrap_or(from);
        return Err(unexpected(line, at));
    }

    match tokens.as_slice() {
        [] => Ok(Value::List(Vec::new())),
        [single] => Ok(Value::from_token(single)),
        [name, d0, d1, d2, d3, d4, d5, d6, value] => {
            match (dims([d0, d1, d2, d3, d4, d5, d6]), parse_number(value)) {
                (Some(dims), Some(value)) if parse_number(name).is_none() => {
                    Ok(Value::DimensionedScalar {
                        name: name.to_string(),
                        dims,
                        value,
                    })
                }
                _ => Ok(tuple(&tokens)),
            }
        }
        [x, y, z] => match (parse_number(x), parse_number(y), parse_number(z)) {
            (Some(x), Some(y), Some(z)) => Ok(Value::Vector3(Vector3::new(x, y, z))),
            _ => Ok(tuple(&tokens)),
        },
        _ => Ok(tuple(&tokens)),
    }
}

fn tuple(tokens: &[&str]) -> Value {
    Value::List(tokens.iter().map(|t| Value::from_token(t)).collect())
}

fn dims(raw: [&&str; 7]) -> Option<[i8; 7]> {
    let mut out = [0i8; 7];
    for (slot, tok) in out.iter_mut().zip(raw) {
        *slot = tok.parse::<i8>().ok()?;
    }
    Some(out)
}

/// Brackets in a flat entry must pair up on the line itself.
fn check_balanced(line: &TokenLine, from: usize) -> Result<(), ParseError> {
    let mut stack: Vec<&str> = Vec::new();
    for (i, tok) in line.tokens.iter().enumerate().skip(from) {
        match tok.as_str() {
            "(" | "[" => stack.push(tok),
            ")" => {
                if stack.pop() != Some("(") {
                    return Err(unexpected(line, i));
                }
            }
            "]" => {
                if stack.pop() != Some("[") {
                    return Err(unexpected(line, i));
                }
            }
            _ => {}
        }
    }
    match stack.is_empty() {
        true => Ok(()),
        false => Err(eof(&format!("bracket group on line {}", line.number))),
    }
}

fn unexpected(line: &TokenLine, at: usize) -> ParseError {
    ParseError::UnexpectedToken {
        token: line.tokens.get(at).cloned().unwrap_or_default(),
        line: line.number,
    }
}

fn eof(context: &str) -> ParseError {
    ParseError::UnexpectedEof {
        context: context.to_string(),
    }
}
