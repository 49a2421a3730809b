//! Just enough of a Lean 4 lexer to find `require` and `package` clauses.
//!
//! Whitespace and comments are dropped. Everything that is not an identifier,
//! a string, or a single punctuation character collapses into `Other`. The
//! lexer never fails: unterminated strings and comments run to end of input.
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Plain or `«guillemet»`-quoted identifier, stored without quotes.
    Ident(String),
    /// String literal contents with escapes resolved.
    Str(String),
    Punct(char),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// Byte range in the source text.
    pub(crate) span: Range<usize>,
}

impl Token {
    pub(crate) fn is_ident(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(ident) if ident == word)
    }

    pub(crate) fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct(ch)
    }
}

pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().peekable(),
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn run(&mut self) {
        while let Some((start, ch)) = self.chars.next() {
            match ch {
                c if c.is_whitespace() => {}
                '-' if self.peek_char() == Some('-') => self.skip_line(),
                '/' if self.peek_char() == Some('-') => {
                    self.chars.next();
                    self.skip_block_comment();
                }
                '"' => {
                    let value = self.string_body();
                    self.push(TokenKind::Str(value), start);
                }
                '«' => {
                    let value = self.take_until('»');
                    self.push(TokenKind::Ident(value), start);
                }
                '\'' => self.char_or_punct(start),
                c if is_ident_start(c) => {
                    let end = self.eat_while(is_ident_continue);
                    let ident = self.source[start..end].to_string();
                    self.tokens.push(Token {
                        kind: TokenKind::Ident(ident),
                        span: start..end,
                    });
                }
                c if c.is_ascii_digit() => {
                    self.eat_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
                    self.push(TokenKind::Other, start);
                }
                c => self.push(TokenKind::Punct(c), start),
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.source.len())
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let end = self.offset();
        self.tokens.push(Token {
            kind,
            span: start..end,
        });
    }

    fn eat_while(&mut self, keep: impl Fn(char) -> bool) -> usize {
        while let Some(ch) = self.peek_char() {
            if !keep(ch) {
                break;
            }
            self.chars.next();
        }
        self.offset()
    }

    fn skip_line(&mut self) {
        for (_, ch) in self.chars.by_ref() {
            if ch == '\n' {
                break;
            }
        }
    }

    /// Block comments nest in Lean.
    fn skip_block_comment(&mut self) {
        let mut depth = 1usize;
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '/' if self.peek_char() == Some('-') => {
                    self.chars.next();
                    depth += 1;
                }
                '-' if self.peek_char() == Some('/') => {
                    self.chars.next();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn string_body(&mut self) -> String {
        let mut value = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '"' => break,
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c => value.push(c),
            }
        }
        value
    }

    fn take_until(&mut self, close: char) -> String {
        let mut value = String::new();
        for (_, ch) in self.chars.by_ref() {
            if ch == close {
                break;
            }
            value.push(ch);
        }
        value
    }

    /// `'a'` and `'\n'` are character literals; any other quote is punctuation.
    fn char_or_punct(&mut self, start: usize) {
        let mut lookahead = self.chars.clone();
        let literal_len = match lookahead.next() {
            Some((_, '\\')) => {
                lookahead.next();
                lookahead.next().filter(|(_, c)| *c == '\'').map(|_| 3)
            }
            Some((_, c)) if c != '\'' => lookahead.next().filter(|(_, c)| *c == '\'').map(|_| 2),
            _ => None,
        };
        match literal_len {
            Some(len) => {
                for _ in 0..len {
                    self.chars.next();
                }
                self.push(TokenKind::Other, start);
            }
            None => self.push(TokenKind::Punct('\''), start),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '\'' | '!' | '?')
}
