//! Lexical analysis for the console script language.
//!
//! The lexer turns a line (or a whole script) into a flat, indexable list of
//! [`Token`]s. The parser looks ahead arbitrarily far, so tokens are fully
//! materialized up front rather than produced lazily.

use crate::error::ScriptError;
use std::fmt;

/// Coarse classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare words: command names, arguments, paths, flags and `$name` references.
    Identifier,
    /// Numeric literals such as `42` or `2.5`.
    Number,
    /// Quoted text with the quotes removed.
    String,
    /// Operators and separators (`|`, `&&`, `>>`, `$(`, `++`, ...).
    Symbol,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

/// A single token together with the byte range of source it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character.
    pub offset: usize,
    /// Byte offset just past the last character, quotes included.
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize, end: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            offset,
            end,
        }
    }

    /// True if `next` starts exactly where this token ends.
    pub fn touches(&self, next: &Token) -> bool {
        self.end == next.offset
    }

    /// True if this is the symbol `symbol`.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }
}

/// Characters that end a bare word.
fn is_word_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '\'' | '"' | ';' | '|' | '&' | '>' | '<' | '=' | '(' | ')' | '+' | '*' | '%'
        )
}

struct Lexer {
    input: Vec<char>,
    /// Byte offset of each entry of `input`.
    byte_offsets: Vec<usize>,
    source_len: usize,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        let (byte_offsets, input) = source.char_indices().unzip();
        Lexer {
            input,
            byte_offsets,
            source_len: source.len(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Byte offset of the character at `pos`, or the source length past the end.
    fn byte_at(&self, pos: usize) -> usize {
        self.byte_offsets
            .get(pos)
            .copied()
            .unwrap_or(self.source_len)
    }

    fn make_tokens(mut self) -> Result<Vec<Token>, ScriptError> {
        while let Some(ch) = self.peek_char() {
            let start = self.pos;
            match ch {
                ' ' | '\t' | '\r' => {
                    self.read_char();
                }
                '\n' => {
                    self.read_char();
                    self.push_separator(start);
                }
                '#' => self.skip_comment(),
                '\'' | '"' => self.read_string(ch)?,
                ';' | '|' | '<' | '=' | '(' | ')' | '*' | '%' => {
                    self.read_char();
                    self.push(TokenKind::Symbol, ch.to_string(), start);
                }
                '&' => {
                    self.read_char();
                    if self.peek_char() != Some('&') {
                        return Err(ScriptError::syntax(
                            "background jobs are not supported, expected '&&'",
                            Some(self.byte_at(start)),
                        ));
                    }
                    self.read_char();
                    self.push(TokenKind::Symbol, "&&", start);
                }
                '>' => self.read_doubled('>', start),
                '+' => self.read_doubled('+', start),
                '-' => self.read_dash(start)?,
                '$' if self.peek_at(1) == Some('(') => {
                    self.pos += 2;
                    self.push(TokenKind::Symbol, "$(", start);
                }
                '/' if self
                    .peek_at(1)
                    .is_none_or(|next| !is_word_char(next) || next.is_ascii_digit()) =>
                {
                    self.read_char();
                    self.push(TokenKind::Symbol, "/", start);
                }
                c if c.is_ascii_digit() => self.read_number(start)?,
                _ => {
                    let word = self.read_word(String::new(), false)?;
                    self.push(TokenKind::Identifier, word, start);
                }
            }
        }
        Ok(self.tokens)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.pos + ahead).copied()
    }

    /// Pushes a token that started at char position `start` and ends here.
    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: usize) {
        let token = Token::new(kind, text, self.byte_at(start), self.byte_at(self.pos));
        self.tokens.push(token);
    }

    /// Newlines separate statements, but blank lines must not produce empty ones.
    fn push_separator(&mut self, start: usize) {
        match self.tokens.last() {
            None => {}
            Some(last) if last.is_symbol(";") => {}
            Some(_) => self.push(TokenKind::Symbol, ";", start),
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.read_char();
        }
    }

    /// `>` / `>>` and `+` / `++`.
    fn read_doubled(&mut self, ch: char, start: usize) {
        self.read_char();
        if self.peek_char() == Some(ch) {
            self.read_char();
            self.push(TokenKind::Symbol, format!("{ch}{ch}"), start);
        } else {
            self.push(TokenKind::Symbol, ch.to_string(), start);
        }
    }

    /// `-`, `--`, or a flag word such as `-la` / `--lines=5`.
    fn read_dash(&mut self, start: usize) -> Result<(), ScriptError> {
        let dashes = if self.peek_at(1) == Some('-') { 2 } else { 1 };
        let starts_flag = self
            .peek_at(dashes)
            .is_some_and(|c| c.is_alphabetic());
        if starts_flag {
            self.pos += dashes;
            let word = self.read_word("-".repeat(dashes), true)?;
            self.push(TokenKind::Identifier, word, start);
        } else {
            self.pos += dashes;
            self.push(TokenKind::Symbol, "-".repeat(dashes), start);
        }
        Ok(())
    }

    fn read_number(&mut self, start: usize) -> Result<(), ScriptError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char().filter(char::is_ascii_digit) {
            text.push(c);
            self.read_char();
        }
        if self.peek_char() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.read_char();
            while let Some(c) = self.peek_char().filter(char::is_ascii_digit) {
                text.push(c);
                self.read_char();
            }
        }

        // `3rd`, `1.2.3` and `2d.txt` are words that happen to start with a digit.
        let continues_word = self
            .peek_char()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '.');
        if continues_word {
            let word = self.read_word(text, false)?;
            self.push(TokenKind::Identifier, word, start);
        } else {
            self.push(TokenKind::Number, text, start);
        }
        Ok(())
    }

    fn read_word(&mut self, mut text: String, allow_equals: bool) -> Result<String, ScriptError> {
        while let Some(c) = self.peek_char() {
            match c {
                '-' => {
                    if !self.peek_at(1).is_some_and(|n| n.is_alphanumeric()) {
                        break;
                    }
                    text.push(c);
                    self.read_char();
                }
                '=' if allow_equals => {
                    text.push(c);
                    self.read_char();
                }
                '$' if self.peek_at(1) == Some('{') => {
                    let open = self.pos;
                    while let Some(inner) = self.read_char() {
                        text.push(inner);
                        if inner == '}' {
                            break;
                        }
                    }
                    if !text.ends_with('}') {
                        return Err(ScriptError::syntax(
                            "unterminated '${'",
                            Some(self.byte_at(open)),
                        ));
                    }
                }
                c if is_word_char(c) => {
                    text.push(c);
                    self.read_char();
                }
                _ => break,
            }
        }
        Ok(text)
    }

    fn read_string(&mut self, quote: char) -> Result<(), ScriptError> {
        let start = self.pos;
        self.read_char();
        let mut text = String::new();
        loop {
            match self.read_char() {
                None => {
                    return Err(ScriptError::syntax(
                        format!("unterminated string literal, expected {quote}"),
                        Some(self.byte_at(start)),
                    ));
                }
                Some(c) if c == quote => break,
                Some('\\') if quote == '"' => match self.read_char() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(escaped @ ('"' | '\\' | '$')) => text.push(escaped),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => text.push('\\'),
                },
                Some(c) => text.push(c),
            }
        }
        self.push(TokenKind::String, text, start);
        Ok(())
    }
}

/// Tokenizes `source` into the list of tokens the parser consumes.
///
/// Fails with [`ScriptError::Syntax`] on unterminated quotes, an unterminated
/// `${`, or a lone `&`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    Lexer::new(source).make_tokens()
}

/// Renders tokens as an index / kind / value table.
pub fn dump_tokens(tokens: &[Token], out: &mut dyn std::io::Write) -> std::io::Result<()> {
    writeln!(out, "Idx | Kind       | Value")?;
    writeln!(out, "----+------------+--------------------------")?;
    for (i, token) in tokens.iter().enumerate() {
        writeln!(out, "{:>3} | {:<10} | {}", i, token.kind.to_string(), token.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn ident(s: &str) -> (TokenKind, String) {
        (TokenKind::Identifier, s.to_string())
    }

    fn sym(s: &str) -> (TokenKind, String) {
        (TokenKind::Symbol, s.to_string())
    }

    fn num(s: &str) -> (TokenKind, String) {
        (TokenKind::Number, s.to_string())
    }

    #[test]
    fn test_simple_command_with_flags_and_paths() {
        assert_eq!(
            kinds_and_text("ls -la /tmp/dir ../up"),
            vec![ident("ls"), ident("-la"), ident("/tmp/dir"), ident("../up")]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds_and_text("a | b && c > f >> g < h ; d"),
            vec![
                ident("a"),
                sym("|"),
                ident("b"),
                sym("&&"),
                ident("c"),
                sym(">"),
                ident("f"),
                sym(">>"),
                ident("g"),
                sym("<"),
                ident("h"),
                sym(";"),
                ident("d"),
            ]
        );
    }

    #[test]
    fn test_arithmetic_without_spaces() {
        assert_eq!(
            kinds_and_text("x=5+3*2/1%4"),
            vec![
                ident("x"),
                sym("="),
                num("5"),
                sym("+"),
                num("3"),
                sym("*"),
                num("2"),
                sym("/"),
                num("1"),
                sym("%"),
                num("4"),
            ]
        );
    }

    #[test]
    fn test_increment_and_decrement() {
        assert_eq!(
            kinds_and_text("y = x++ + ++z"),
            vec![
                ident("y"),
                sym("="),
                ident("x"),
                sym("++"),
                sym("+"),
                sym("++"),
                ident("z"),
            ]
        );
        assert_eq!(
            kinds_and_text("y = x-- - 1"),
            vec![ident("y"), sym("="), ident("x"), sym("--"), sym("-"), num("1")]
        );
    }

    #[test]
    fn test_words_that_start_with_digits() {
        assert_eq!(
            kinds_and_text("cat 3rd.txt 2.5 1.2.3"),
            vec![ident("cat"), ident("3rd.txt"), num("2.5"), ident("1.2.3")]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds_and_text(r#"echo "a \"b\"\n" 'c $d'"#),
            vec![
                ident("echo"),
                (TokenKind::String, "a \"b\"\n".to_string()),
                (TokenKind::String, "c $d".to_string()),
            ]
        );
    }

    #[test]
    fn test_variable_references_stay_in_words() {
        assert_eq!(
            kinds_and_text("echo $name ${other}/x.txt"),
            vec![ident("echo"), ident("$name"), ident("${other}/x.txt")]
        );
    }

    #[test]
    fn test_command_substitution_symbol() {
        assert_eq!(
            kinds_and_text("x = $(pwd)"),
            vec![ident("x"), sym("="), sym("$("), ident("pwd"), sym(")")]
        );
    }

    #[test]
    fn test_newlines_and_comments_become_separators() {
        assert_eq!(
            kinds_and_text("#!/usr/bin/env cmdscript\necho a # trailing\n\n\necho b\n"),
            vec![ident("echo"), ident("a"), sym(";"), ident("echo"), ident("b"), sym(";")]
        );
    }

    #[test]
    fn test_long_flag_keeps_equals() {
        assert_eq!(
            kinds_and_text("head --lines=3 file"),
            vec![ident("head"), ident("--lines=3"), ident("file")]
        );
    }

    #[test]
    fn test_offsets_point_at_token_start() {
        let tokens = tokenize("echo  hi").unwrap();
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 6);
    }

    #[test]
    fn test_offsets_are_bytes() {
        let tokens = tokenize("echo \"héllo\" wörld").unwrap();
        assert_eq!((tokens[1].offset, tokens[1].end), (5, 13));
        assert_eq!((tokens[2].offset, tokens[2].end), (14, 20));
        assert!(tokens[0].touches(&Token::new(TokenKind::Symbol, "x", 4, 5)));
        assert!(!tokens[0].touches(&tokens[1]));

        let err = tokenize("echo é \"oops").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { position: Some(8), .. }));
    }

    #[test]
    fn test_symbols_touching_words_keep_their_extent() {
        let tokens = tokenize("echo a=b 50%").unwrap();
        let spans: Vec<(&str, usize, usize)> = tokens
            .iter()
            .map(|t| (t.text.as_str(), t.offset, t.end))
            .collect();
        assert_eq!(
            spans,
            vec![("echo", 0, 4), ("a", 5, 6), ("=", 6, 7), ("b", 7, 8), ("50", 9, 11), ("%", 11, 12)]
        );
    }

    #[test]
    fn test_unterminated_string_is_syntax_error() {
        let err = tokenize("echo \"oops").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { position: Some(5), .. }));
    }

    #[test]
    fn test_lone_ampersand_is_rejected() {
        assert!(matches!(
            tokenize("sleep 1 &"),
            Err(ScriptError::Syntax { .. })
        ));
    }
}
