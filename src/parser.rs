//! Recursive-descent parser turning a token list into an [`AstNode`].
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! sequence    := pipeline ( ';' pipeline )*
//! pipeline    := command ( '|' command )* ( '&&' pipeline )?
//! command     := 'let'? NAME '=' expression
//!              | NAME word* ( ('<' | '>' | '>>') path )*
//! expression  := term ( ('+' | '-') term )*
//! term        := factor ( ('*' | '/' | '%') factor )*
//! factor      := ('++' | '--') primary | '-' factor | primary ('++' | '--')?
//! primary     := NUMBER | STRING | NAME | '(' expression ')' | '$(' sequence ')'
//! ```

use crate::ast::{
    Assignment, AstNode, BinaryOp, Command, Expr, Pipeline, Position, RedirectKind, Redirection,
    UnaryOp,
};
use crate::error::ScriptError;
use crate::lexer::{Token, TokenKind};

type ParseResult<T> = Result<T, ScriptError>;

/// Symbols that end a command's argument list. Any other symbol (`=`, `+`,
/// `/`, ...) is taken as literal argument text.
const STRUCTURAL_SYMBOLS: &[&str] = &[";", "|", "&&", ">", ">>", "<", "(", ")", "$("];

/// True for tokens that may be part of a command argument.
fn is_word_piece(token: &Token) -> bool {
    token.kind != TokenKind::Symbol || !STRUCTURAL_SYMBOLS.contains(&token.text.as_str())
}

fn word_piece_text(token: &Token) -> String {
    match token.kind {
        TokenKind::Identifier => rewrite_bare_references(&token.text),
        _ => token.text.clone(),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.peek_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Syntax error located at the current token (or at end of input).
    fn error(&self, message: impl Into<String>) -> ScriptError {
        let message = message.into();
        match self.peek() {
            Some(token) => ScriptError::syntax(
                format!("{message}, found '{}'", token.text),
                Some(token.offset),
            ),
            None => ScriptError::syntax(message, None),
        }
    }

    fn parse_sequence(&mut self) -> ParseResult<AstNode> {
        let mut items = Vec::new();
        loop {
            while self.eat_symbol(";") {}
            if self.at_end() {
                break;
            }
            items.push(self.parse_pipeline()?);
            if !self.at_end() && !self.peek_symbol(";") {
                return Err(self.error("unexpected token"));
            }
        }

        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(AstNode::Sequence(items))
        }
    }

    fn parse_pipeline(&mut self) -> ParseResult<AstNode> {
        let first = self.parse_command()?;

        let mut node = if self.peek_symbol("|") {
            let mut stages = vec![Self::into_stage(first)?];
            while self.eat_symbol("|") {
                let offset = self.peek().map(|t| t.offset);
                let stage = self.parse_command()?;
                stages.push(Self::into_stage(stage).map_err(|err| match err {
                    ScriptError::Syntax { message, .. } => ScriptError::syntax(message, offset),
                    other => other,
                })?);
            }
            let pipeline = Pipeline::new(stages)
                .ok_or_else(|| ScriptError::syntax("pipeline needs two or more commands", None))?;
            AstNode::Pipeline(pipeline)
        } else {
            first
        };

        if self.eat_symbol("&&") {
            let before = self.pos;
            let right = self.parse_pipeline()?;
            if self.pos == before {
                return Err(self.error("expected command after '&&'"));
            }
            node = AstNode::LogicalAnd(Box::new(node), Box::new(right));
        }

        Ok(node)
    }

    fn into_stage(node: AstNode) -> ParseResult<Command> {
        match node {
            AstNode::Command(cmd) => Ok(cmd),
            AstNode::Redirection(_) => Err(ScriptError::syntax(
                "cannot pipe a redirected command",
                None,
            )),
            AstNode::Assignment(_) => Err(ScriptError::syntax(
                "cannot pipe a variable assignment",
                None,
            )),
            _ => Err(ScriptError::syntax("pipeline stage must be a command", None)),
        }
    }

    fn parse_command(&mut self) -> ParseResult<AstNode> {
        let name = match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => token,
            _ => return Err(self.error("expected command name")),
        };
        self.pos += 1;

        if self.eat_symbol("=") {
            return self.parse_assignment(name);
        }

        let is_let = name.text == "let"
            && self
                .peek()
                .is_some_and(|t| t.kind == TokenKind::Identifier);
        if is_let {
            let target = self.advance().ok_or_else(|| self.error("expected variable name"))?;
            if !self.eat_symbol("=") {
                return Err(self.error("expected '=' after variable name in let statement"));
            }
            return self.parse_assignment(target);
        }

        let mut args = Vec::new();
        while let Some(word) = self.parse_word() {
            args.push(word);
        }

        let mut node = AstNode::Command(Command::new(name.text.clone(), args));
        loop {
            let kind = match self.peek() {
                Some(t) if t.is_symbol("<") => RedirectKind::Input,
                Some(t) if t.is_symbol(">") => RedirectKind::Output,
                Some(t) if t.is_symbol(">>") => RedirectKind::Append,
                _ => break,
            };
            self.pos += 1;

            let Some(path) = self.parse_word() else {
                return Err(self.error(format!("expected filename after '{}'", kind.symbol())));
            };

            node = AstNode::Redirection(Redirection {
                inner: Box::new(node),
                kind,
                path,
            });
        }

        Ok(node)
    }

    /// One command argument. Tokens with no whitespace between them form a
    /// single word, so `a=b`, `50%` and `a.*c` reach the command intact.
    fn parse_word(&mut self) -> Option<String> {
        let first = self.peek().filter(|t| is_word_piece(t))?;
        self.pos += 1;
        let mut word = word_piece_text(first);
        let mut last = first;
        while let Some(next) = self
            .peek()
            .filter(|t| last.touches(t) && is_word_piece(t))
        {
            self.pos += 1;
            word.push_str(&word_piece_text(next));
            last = next;
        }
        Some(word)
    }

    fn parse_assignment(&mut self, name: &Token) -> ParseResult<AstNode> {
        if !is_variable_name(&name.text) {
            return Err(ScriptError::syntax(
                format!("invalid variable name '{}'", name.text),
                Some(name.offset),
            ));
        }
        if self.at_end() || self.peek_symbol(";") {
            return Err(self.error("expected value after '='"));
        }
        let value = self.parse_expression()?;
        Ok(AstNode::Assignment(Assignment {
            name: name.text.clone(),
            value,
        }))
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            let (op, right) = if self.eat_symbol("+") {
                (BinaryOp::Add, self.parse_term()?)
            } else if self.eat_symbol("-") {
                (BinaryOp::Sub, self.parse_term()?)
            } else if let Some(name) = self.peek().and_then(dashed_name) {
                // `10 -x` lexes the operator into a flag word.
                self.pos += 1;
                let operand = self.finish_postfix(Expr::Variable(name.to_string()));
                (BinaryOp::Sub, self.parse_term_rest(operand)?)
            } else {
                break;
            };
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let first = self.parse_factor()?;
        self.parse_term_rest(first)
    }

    /// Continues a term whose first factor is already parsed.
    fn parse_term_rest(&mut self, first: Expr) -> ParseResult<Expr> {
        let mut expr = first;
        loop {
            let op = if self.eat_symbol("*") {
                BinaryOp::Mul
            } else if self.eat_symbol("/") {
                BinaryOp::Div
            } else if self.eat_symbol("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let prefix = if self.eat_symbol("++") {
            Some(UnaryOp::Increment)
        } else if self.eat_symbol("--") {
            Some(UnaryOp::Decrement)
        } else {
            None
        };
        if let Some(op) = prefix {
            let operand = self.parse_primary()?;
            return self.finish_prefix(operand, op);
        }

        if self.eat_symbol("-") {
            let operand = self.parse_factor()?;
            return Ok(Expr::Unary {
                operand: Box::new(operand),
                op: UnaryOp::Negate,
                position: Position::Prefix,
            });
        }

        // `--y` and `-y` lex as flag words.
        if let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Identifier) {
            if let Some(name) = token.text.strip_prefix("--").filter(|n| !n.is_empty()) {
                self.pos += 1;
                return self.finish_prefix(Expr::Variable(name.to_string()), UnaryOp::Decrement);
            }
            if let Some(name) = dashed_name(token) {
                self.pos += 1;
                let operand = self.finish_postfix(Expr::Variable(name.to_string()));
                return Ok(Expr::Unary {
                    operand: Box::new(operand),
                    op: UnaryOp::Negate,
                    position: Position::Prefix,
                });
            }
        }

        let primary = self.parse_primary()?;
        Ok(self.finish_postfix(primary))
    }

    /// Wraps `operand` in a trailing `++` / `--` if one follows.
    fn finish_postfix(&mut self, operand: Expr) -> Expr {
        let op = if self.eat_symbol("++") {
            UnaryOp::Increment
        } else if self.eat_symbol("--") {
            UnaryOp::Decrement
        } else {
            return operand;
        };
        Expr::Unary {
            operand: Box::new(operand),
            op,
            position: Position::Postfix,
        }
    }

    fn finish_prefix(&self, operand: Expr, op: UnaryOp) -> ParseResult<Expr> {
        if self.peek_symbol("++") || self.peek_symbol("--") {
            return Err(self.error("cannot apply both prefix and postfix operators"));
        }
        Ok(Expr::Unary {
            operand: Box::new(operand),
            op,
            position: Position::Prefix,
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek() else {
            return Err(self.error("expected expression"));
        };

        match token.kind {
            TokenKind::Number => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    ScriptError::syntax(format!("invalid number '{}'", token.text), Some(token.offset))
                })?;
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            TokenKind::String => {
                self.pos += 1;
                Ok(Expr::Str(token.text.clone()))
            }
            TokenKind::Identifier => {
                self.pos += 1;
                Ok(Expr::Variable(reference_name(&token.text).to_string()))
            }
            TokenKind::Symbol if token.text == "(" => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                if !self.eat_symbol(")") {
                    return Err(self.error("expected ')' after expression"));
                }
                Ok(expr)
            }
            TokenKind::Symbol if token.text == "$(" => {
                self.pos += 1;
                self.parse_command_substitution(token.offset)
            }
            TokenKind::Symbol => Err(self.error("expected expression")),
        }
    }

    fn parse_command_substitution(&mut self, open: usize) -> ParseResult<Expr> {
        if !self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            return Err(self.error("expected command name after '$('"));
        }

        let mut items = Vec::new();
        loop {
            let before = self.pos;
            items.push(self.parse_pipeline()?);
            if self.pos == before {
                return Err(self.error("no progress inside command substitution"));
            }
            while self.eat_symbol(";") {}
            if self.eat_symbol(")") {
                break;
            }
            if self.at_end() {
                return Err(ScriptError::syntax(
                    "expected ')' to close command substitution",
                    Some(open),
                ));
            }
            if !self.peek().is_some_and(|t| t.kind == TokenKind::Identifier) {
                return Err(self.error("expected ')' to close command substitution"));
            }
        }

        let inner = if items.len() == 1 {
            items.remove(0)
        } else {
            AstNode::Sequence(items)
        };
        Ok(Expr::Substitution(Box::new(inner)))
    }
}

/// `x` for an identifier token `-x`; `--x` and bare `-` do not count.
fn dashed_name(token: &Token) -> Option<&str> {
    if token.kind != TokenKind::Identifier {
        return None;
    }
    token
        .text
        .strip_prefix('-')
        .filter(|name| !name.is_empty() && !name.starts_with('-'))
}

fn is_variable_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// `$x` and `${x}` in expression position name the variable `x`.
fn reference_name(text: &str) -> &str {
    if let Some(inner) = text
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return inner;
    }
    text.strip_prefix('$').unwrap_or(text)
}

/// Rewrites every bare `$name` in a word to `${name}` so the executor only has
/// one reference form to expand.
fn rewrite_bare_references(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            out.push('$');
        } else {
            out.push_str("${");
            out.push_str(&name);
            out.push('}');
        }
    }
    out
}

/// Parses a complete token list into one root node.
///
/// A script with a single top-level statement yields that statement directly;
/// otherwise the statements are wrapped in [`AstNode::Sequence`]. An empty
/// script is an empty sequence.
pub fn parse(tokens: &[Token]) -> Result<AstNode, ScriptError> {
    Parser::new(tokens).parse_sequence()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Result<AstNode, ScriptError> {
        parse(&tokenize(source)?)
    }

    fn cmd(name: &str, args: &[&str]) -> Command {
        Command::new(name, args.iter().map(|s| s.to_string()).collect())
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.to_string()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn is_syntax_error(result: Result<AstNode, ScriptError>) -> bool {
        matches!(result, Err(ScriptError::Syntax { .. }))
    }

    #[test]
    fn test_simple_command() {
        assert_eq!(
            parse_str("echo a b c").unwrap(),
            AstNode::Command(cmd("echo", &["a", "b", "c"]))
        );
    }

    #[test]
    fn test_pipeline_keeps_stage_order() {
        let node = parse_str("cat f | grep x | wc").unwrap();
        let AstNode::Pipeline(pipeline) = node else {
            panic!("expected pipeline, got {node:?}");
        };
        assert_eq!(
            pipeline.stages(),
            &[cmd("cat", &["f"]), cmd("grep", &["x"]), cmd("wc", &[])]
        );
    }

    #[test]
    fn test_sequence_collapses_single_item() {
        assert_eq!(
            parse_str("pwd;").unwrap(),
            AstNode::Command(cmd("pwd", &[]))
        );
        assert_eq!(
            parse_str("a ;; b\nc").unwrap(),
            AstNode::Sequence(vec![
                AstNode::Command(cmd("a", &[])),
                AstNode::Command(cmd("b", &[])),
                AstNode::Command(cmd("c", &[])),
            ])
        );
        assert_eq!(parse_str("  \n# nothing\n").unwrap(), AstNode::Sequence(vec![]));
    }

    #[test]
    fn test_logical_and_is_right_recursive_over_pipelines() {
        let node = parse_str("a && b | c && d").unwrap();
        let expected = AstNode::LogicalAnd(
            Box::new(AstNode::Command(cmd("a", &[]))),
            Box::new(AstNode::LogicalAnd(
                Box::new(AstNode::Pipeline(
                    Pipeline::new(vec![cmd("b", &[]), cmd("c", &[])]).unwrap(),
                )),
                Box::new(AstNode::Command(cmd("d", &[]))),
            )),
        );
        assert_eq!(node, expected);
    }

    #[test]
    fn test_chained_redirections_wrap_outward() {
        let node = parse_str("sort < in.txt > out.txt").unwrap();
        let expected = AstNode::Redirection(Redirection {
            inner: Box::new(AstNode::Redirection(Redirection {
                inner: Box::new(AstNode::Command(cmd("sort", &[]))),
                kind: RedirectKind::Input,
                path: "in.txt".to_string(),
            })),
            kind: RedirectKind::Output,
            path: "out.txt".to_string(),
        });
        assert_eq!(node, expected);

        let AstNode::Redirection(append) = parse_str("echo hi >> \"log file\"").unwrap() else {
            panic!("expected redirection");
        };
        assert_eq!(append.kind, RedirectKind::Append);
        assert_eq!(append.path, "log file");
    }

    #[test]
    fn test_arithmetic_precedence() {
        let node = parse_str("x = 5 + 3 * 2").unwrap();
        let expected = AstNode::Assignment(Assignment {
            name: "x".to_string(),
            value: Expr::Binary {
                left: num(5.0),
                op: BinaryOp::Add,
                right: Box::new(Expr::Binary {
                    left: num(3.0),
                    op: BinaryOp::Mul,
                    right: num(2.0),
                }),
            },
        });
        assert_eq!(node, expected);
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let AstNode::Assignment(assignment) = parse_str("x = 10 - 4 - 3").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            assignment.value,
            Expr::Binary {
                left: Box::new(Expr::Binary {
                    left: num(10.0),
                    op: BinaryOp::Sub,
                    right: num(4.0),
                }),
                op: BinaryOp::Sub,
                right: num(3.0),
            }
        );
    }

    #[test]
    fn test_let_sugar_matches_plain_assignment() {
        assert_eq!(parse_str("let n = (1 + 2)").unwrap(), parse_str("n = 1 + 2").unwrap());
        assert!(is_syntax_error(parse_str("let n 5")));
    }

    #[test]
    fn test_string_assignment() {
        assert_eq!(
            parse_str("greeting = \"hello world\"").unwrap(),
            AstNode::Assignment(Assignment {
                name: "greeting".to_string(),
                value: Expr::Str("hello world".to_string()),
            })
        );
    }

    #[test]
    fn test_unary_operators() {
        let AstNode::Assignment(a) = parse_str("y = x++").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Unary {
                operand: var("x"),
                op: UnaryOp::Increment,
                position: Position::Postfix,
            }
        );

        let AstNode::Assignment(a) = parse_str("y = --x").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Unary {
                operand: var("x"),
                op: UnaryOp::Decrement,
                position: Position::Prefix,
            }
        );

        let AstNode::Assignment(a) = parse_str("y = -$x * 2").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Binary {
                left: Box::new(Expr::Unary {
                    operand: var("x"),
                    op: UnaryOp::Negate,
                    position: Position::Prefix,
                }),
                op: BinaryOp::Mul,
                right: num(2.0),
            }
        );
    }

    #[test]
    fn test_prefix_and_postfix_together_is_rejected() {
        assert!(is_syntax_error(parse_str("y = ++x++")));
        assert!(is_syntax_error(parse_str("y = --x--")));
    }

    #[test]
    fn test_bare_references_are_rewritten() {
        assert_eq!(
            parse_str("echo $name $dir/file.txt ${done} $ cost$").unwrap(),
            AstNode::Command(cmd(
                "echo",
                &["${name}", "${dir}/file.txt", "${done}", "$", "cost$"]
            ))
        );
    }

    #[test]
    fn test_non_structural_symbols_are_arguments() {
        assert_eq!(
            parse_str("cd /").unwrap(),
            AstNode::Command(cmd("cd", &["/"]))
        );
        assert_eq!(
            parse_str("echo 2 + 3 = 5 - -").unwrap(),
            AstNode::Command(cmd("echo", &["2", "+", "3", "=", "5", "-", "-"]))
        );
    }

    #[test]
    fn test_touching_symbols_stay_in_one_argument() {
        assert_eq!(
            parse_str("echo a=b 50% x+y -n=3").unwrap(),
            AstNode::Command(cmd("echo", &["a=b", "50%", "x+y", "-n=3"]))
        );
        assert_eq!(
            parse_str("grep a.*c notes.txt").unwrap(),
            AstNode::Command(cmd("grep", &["a.*c", "notes.txt"]))
        );
        assert_eq!(
            parse_str("echo $a=\"b c\"$d 1-2").unwrap(),
            AstNode::Command(cmd("echo", &["${a}=b c${d}", "1-2"]))
        );
        assert_eq!(
            parse_str("echo a=b>out=1.txt").unwrap(),
            AstNode::Redirection(Redirection {
                inner: Box::new(AstNode::Command(cmd("echo", &["a=b"]))),
                kind: RedirectKind::Output,
                path: "out=1.txt".to_string(),
            })
        );
    }

    #[test]
    fn test_negated_postfix_and_dashed_subtraction() {
        let AstNode::Assignment(a) = parse_str("y = -x++").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Unary {
                operand: Box::new(Expr::Unary {
                    operand: var("x"),
                    op: UnaryOp::Increment,
                    position: Position::Postfix,
                }),
                op: UnaryOp::Negate,
                position: Position::Prefix,
            }
        );

        let AstNode::Assignment(a) = parse_str("y = 10 -x * 2").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Binary {
                left: num(10.0),
                op: BinaryOp::Sub,
                right: Box::new(Expr::Binary {
                    left: var("x"),
                    op: BinaryOp::Mul,
                    right: num(2.0),
                }),
            }
        );

        assert!(is_syntax_error(parse_str("y = 10 --x")));
    }

    #[test]
    fn test_command_substitution() {
        let AstNode::Assignment(a) = parse_str("here = $(pwd)").unwrap() else {
            panic!("expected assignment");
        };
        assert_eq!(
            a.value,
            Expr::Substitution(Box::new(AstNode::Command(cmd("pwd", &[]))))
        );

        let AstNode::Assignment(a) = parse_str("n = $(cat f | wc; echo done)").unwrap() else {
            panic!("expected assignment");
        };
        let Expr::Substitution(inner) = a.value else {
            panic!("expected substitution");
        };
        assert!(matches!(*inner, AstNode::Sequence(ref items) if items.len() == 2));
    }

    #[test]
    fn test_substitution_errors() {
        assert!(is_syntax_error(parse_str("x = $(pwd")));
        assert!(is_syntax_error(parse_str("x = $()")));
        assert!(is_syntax_error(parse_str("x = $(echo a > )")));
    }

    #[test]
    fn test_dangling_pipe_is_syntax_error() {
        assert!(is_syntax_error(parse_str("ls |")));
        assert!(is_syntax_error(parse_str("ls | | wc")));
    }

    #[test]
    fn test_pipe_stage_must_be_plain_command() {
        assert!(is_syntax_error(parse_str("cat < in.txt | wc")));
        assert!(is_syntax_error(parse_str("echo hi | x = 1")));
    }

    #[test]
    fn test_missing_redirect_target() {
        let err = parse_str("echo hi >").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: expected filename after '>' (at end of input)"
        );
        assert!(is_syntax_error(parse_str("echo hi > | wc")));
    }

    #[test]
    fn test_other_malformed_input() {
        assert!(is_syntax_error(parse_str("&& echo")));
        assert!(is_syntax_error(parse_str("echo a && ")));
        assert!(is_syntax_error(parse_str("x = (1 + 2")));
        assert!(is_syntax_error(parse_str("x = ")));
        assert!(is_syntax_error(parse_str("echo a )")));
        assert!(is_syntax_error(parse_str("x = 1 2")));
        assert!(is_syntax_error(parse_str("3x = 1")));
    }

    #[test]
    fn test_parsing_is_repeatable() {
        let tokens = tokenize("a = 1; echo ${a} | wc > out && cat < out").unwrap();
        assert_eq!(parse(&tokens).unwrap(), parse(&tokens).unwrap());
    }
}
