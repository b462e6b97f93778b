//! Tokenizer and recursive-descent parser for path patterns.
//!
//! Atoms: `.` (any item), `:` (any dependency), `[a b]` / `[^a b]` sets of
//! named matchers, bare names resolving against the caller's definitions
//! table, and `(...)` groups with `?` / `*` / `+` postfixes.

use std::sync::Arc;

use crate::errors::PathRegexSyntaxError;
use crate::matching::{DependencyMatch, ItemMatch};

use super::ast::{Element, SetMatcher};
use super::{Definitions, PathMatcher};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Dot,
    Colon,
    LBracket { exclusive: bool },
    RBracket,
    LParen,
    RParen,
    Question,
    Star,
    Plus,
    Name(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
    text: String,
}

fn syntax_error(position: usize, fragment: &str, message: &str) -> PathRegexSyntaxError {
    PathRegexSyntaxError {
        position,
        fragment: fragment.to_string(),
        message: message.to_string(),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, PathRegexSyntaxError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (pos, ch) = chars[i];
        let simple = |kind: TokenKind| Token {
            kind,
            position: pos,
            text: ch.to_string(),
        };
        match ch {
            c if c.is_whitespace() => {}
            '.' => tokens.push(simple(TokenKind::Dot)),
            ':' => tokens.push(simple(TokenKind::Colon)),
            ']' => tokens.push(simple(TokenKind::RBracket)),
            '(' => tokens.push(simple(TokenKind::LParen)),
            ')' => tokens.push(simple(TokenKind::RParen)),
            '?' => tokens.push(simple(TokenKind::Question)),
            '*' => tokens.push(simple(TokenKind::Star)),
            '+' => tokens.push(simple(TokenKind::Plus)),
            '[' => {
                let exclusive = matches!(chars.get(i + 1), Some((_, '^')));
                let text = if exclusive { "[^" } else { "[" };
                tokens.push(Token {
                    kind: TokenKind::LBracket { exclusive },
                    position: pos,
                    text: text.to_string(),
                });
                if exclusive {
                    i += 1;
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i + 1 < chars.len()
                    && (chars[i + 1].1.is_alphanumeric() || chars[i + 1].1 == '_')
                {
                    i += 1;
                }
                let name: String = chars[start..=i].iter().map(|(_, c)| *c).collect();
                tokens.push(Token {
                    kind: TokenKind::Name(name.clone()),
                    position: pos,
                    text: name,
                });
            }
            c => {
                return Err(syntax_error(
                    pos,
                    &c.to_string(),
                    "unexpected character in path pattern",
                ));
            }
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    defs: &'a Definitions,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn end_error(&self, message: &str) -> PathRegexSyntaxError {
        syntax_error(self.source_len, "", message)
    }

    fn parse_sequence(&mut self, inside_group: bool) -> Result<Element, PathRegexSyntaxError> {
        let mut elements = Vec::new();
        loop {
            match self.peek() {
                None => {
                    if inside_group {
                        return Err(self.end_error("unclosed `(` group"));
                    }
                    break;
                }
                Some(token) if token.kind == TokenKind::RParen => {
                    if !inside_group {
                        return Err(syntax_error(token.position, &token.text, "unmatched `)`"));
                    }
                    break;
                }
                Some(_) => elements.push(self.parse_element()?),
            }
        }
        if elements.is_empty() {
            let message = if inside_group {
                "empty group"
            } else {
                "empty path pattern"
            };
            return Err(self.end_error(message));
        }
        Ok(Element::Sequence(elements))
    }

    fn parse_element(&mut self) -> Result<Element, PathRegexSyntaxError> {
        let token = match self.next() {
            Some(t) => t,
            None => return Err(self.end_error("expected a pattern element")),
        };
        let mut element = match token.kind {
            TokenKind::Dot => Element::ItemSet(SetMatcher {
                matchers: Vec::new(),
                exclusive: false,
                label: ".".to_string(),
            }),
            TokenKind::Colon => Element::DepSet(SetMatcher {
                matchers: Vec::new(),
                exclusive: false,
                label: ":".to_string(),
            }),
            TokenKind::LParen => {
                let seq = self.parse_sequence(true)?;
                match self.next() {
                    Some(t) if t.kind == TokenKind::RParen => {}
                    _ => return Err(self.end_error("unclosed `(` group")),
                }
                seq
            }
            TokenKind::LBracket { exclusive } => self.parse_set(&token, exclusive)?,
            TokenKind::Name(ref name) => self.resolve_atom(&token, name)?,
            _ => {
                return Err(syntax_error(
                    token.position,
                    &token.text,
                    "expected an item, a dependency, a set or a group here",
                ));
            }
        };
        loop {
            let wrap = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Question) => Some(Quantifier::Optional),
                Some(TokenKind::Star) => Some(Quantifier::ZeroOrMore),
                Some(TokenKind::Plus) => Some(Quantifier::OneOrMore),
                _ => None,
            };
            let Some(wrap) = wrap else { break };
            self.pos += 1;
            let inner = Box::new(into_sequence(element));
            element = match wrap {
                Quantifier::Optional => Element::Optional(inner),
                Quantifier::ZeroOrMore => Element::ZeroOrMore(inner),
                Quantifier::OneOrMore => Element::OneOrMore(inner),
            };
        }
        Ok(element)
    }

    fn parse_set(
        &mut self,
        open: &Token,
        exclusive: bool,
    ) -> Result<Element, PathRegexSyntaxError> {
        let mut item_matchers: Vec<Arc<ItemMatch>> = Vec::new();
        let mut dep_matchers: Vec<Arc<DependencyMatch>> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        loop {
            let token = match self.next() {
                Some(t) => t,
                None => return Err(self.end_error("unclosed `[` set")),
            };
            match token.kind {
                TokenKind::RBracket => break,
                TokenKind::Name(ref name) => {
                    match self.lookup(&token, name)? {
                        PathMatcher::Item(m) => item_matchers.push(Arc::clone(m)),
                        PathMatcher::Dependency(m) => dep_matchers.push(Arc::clone(m)),
                    }
                    names.push(name.clone());
                }
                _ => {
                    return Err(syntax_error(
                        token.position,
                        &token.text,
                        "only named matchers may appear inside a set",
                    ));
                }
            }
        }
        if !item_matchers.is_empty() && !dep_matchers.is_empty() {
            return Err(syntax_error(
                open.position,
                &names.join(" "),
                "a set may not mix item and dependency matches",
            ));
        }
        if item_matchers.is_empty() && dep_matchers.is_empty() {
            return Err(syntax_error(open.position, &open.text, "empty set"));
        }
        let label = format!(
            "[{}{}]",
            if exclusive { "^" } else { "" },
            names.join(" ")
        );
        if dep_matchers.is_empty() {
            Ok(Element::ItemSet(SetMatcher {
                matchers: item_matchers,
                exclusive,
                label,
            }))
        } else {
            Ok(Element::DepSet(SetMatcher {
                matchers: dep_matchers,
                exclusive,
                label,
            }))
        }
    }

    fn lookup(&self, token: &Token, name: &str) -> Result<&'a PathMatcher, PathRegexSyntaxError> {
        self.defs.get(name).ok_or_else(|| {
            syntax_error(
                token.position,
                name,
                "name does not refer to a defined item or dependency match",
            )
        })
    }

    fn resolve_atom(&self, token: &Token, name: &str) -> Result<Element, PathRegexSyntaxError> {
        let element = match self.lookup(token, name)? {
            PathMatcher::Item(m) => Element::ItemSet(SetMatcher {
                matchers: vec![Arc::clone(m)],
                exclusive: false,
                label: name.to_string(),
            }),
            PathMatcher::Dependency(m) => Element::DepSet(SetMatcher {
                matchers: vec![Arc::clone(m)],
                exclusive: false,
                label: name.to_string(),
            }),
        };
        Ok(element)
    }
}

enum Quantifier {
    Optional,
    ZeroOrMore,
    OneOrMore,
}

/// Quantifiers wrap a sequence even when applied to a single atom.
fn into_sequence(element: Element) -> Element {
    match element {
        seq @ Element::Sequence(_) => seq,
        other => Element::Sequence(vec![other]),
    }
}

/// Parse a path pattern source against a definitions table.
pub(crate) fn parse(source: &str, defs: &Definitions) -> Result<Element, PathRegexSyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        defs,
        source_len: source.len(),
    };
    let root = parser.parse_sequence(false)?;
    debug_assert!(parser.peek().is_none());
    Ok(root)
}
