//! Abstract syntax tree produced by the parser and walked by the executor.
//!
//! The tree is strictly owned: every node owns its children, nothing is shared,
//! and nothing is mutated after parsing.

use std::fmt;

/// A simple command: a name followed by its (unexpanded) arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Command {
            name: name.into(),
            args,
        }
    }
}

/// Two or more commands whose output feeds the next command's input.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    /// Builds a pipeline. A single command is not a pipeline, so fewer than two
    /// stages yields `None`.
    pub fn new(stages: Vec<Command>) -> Option<Self> {
        (stages.len() >= 2).then_some(Pipeline { stages })
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }
}

/// Kind of redirection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`: read standard input from a file.
    Input,
    /// `>`: write standard output to a file, truncating it.
    Output,
    /// `>>`: write standard output to the end of a file.
    Append,
}

impl RedirectKind {
    pub fn symbol(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::Append => ">>",
        }
    }
}

/// A node whose input or output is rebound to a file.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirection {
    pub inner: Box<AstNode>,
    pub kind: RedirectKind,
    pub path: String,
}

/// `name = value`, or `let name = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Increment,
    Decrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Prefix,
    Postfix,
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Variable(String),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        operand: Box<Expr>,
        op: UnaryOp,
        position: Position,
    },
    /// `$( ... )`: runs the inner node and evaluates to what it printed.
    Substitution(Box<AstNode>),
}

/// AST node for the console script language.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Command(Command),
    Pipeline(Pipeline),
    Redirection(Redirection),
    /// Statements separated by `;` or newlines, run one after another.
    Sequence(Vec<AstNode>),
    /// `left && right`: `right` runs only when `left` succeeded.
    LogicalAnd(Box<AstNode>, Box<AstNode>),
    Assignment(Assignment),
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = depth * 2)
}

impl AstNode {
    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        indent(f, depth)?;
        match self {
            AstNode::Command(cmd) => {
                write!(f, "Command {}", cmd.name)?;
                for arg in &cmd.args {
                    write!(f, " {arg:?}")?;
                }
                writeln!(f)
            }
            AstNode::Pipeline(pipeline) => {
                writeln!(f, "Pipeline")?;
                for stage in pipeline.stages() {
                    indent(f, depth + 1)?;
                    write!(f, "Command {}", stage.name)?;
                    for arg in &stage.args {
                        write!(f, " {arg:?}")?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            AstNode::Redirection(redirect) => {
                writeln!(f, "Redirection {} {:?}", redirect.kind.symbol(), redirect.path)?;
                redirect.inner.write_tree(f, depth + 1)
            }
            AstNode::Sequence(items) => {
                writeln!(f, "Sequence")?;
                for item in items {
                    item.write_tree(f, depth + 1)?;
                }
                Ok(())
            }
            AstNode::LogicalAnd(left, right) => {
                writeln!(f, "LogicalAnd")?;
                left.write_tree(f, depth + 1)?;
                right.write_tree(f, depth + 1)
            }
            AstNode::Assignment(assignment) => {
                writeln!(f, "Assignment {}", assignment.name)?;
                assignment.value.write_tree(f, depth + 1)
            }
        }
    }
}

impl Expr {
    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        indent(f, depth)?;
        match self {
            Expr::Number(n) => writeln!(f, "Number {n}"),
            Expr::Str(s) => writeln!(f, "String {s:?}"),
            Expr::Variable(name) => writeln!(f, "Variable {name}"),
            Expr::Binary { left, op, right } => {
                writeln!(f, "Binary {}", op.symbol())?;
                left.write_tree(f, depth + 1)?;
                right.write_tree(f, depth + 1)
            }
            Expr::Unary {
                operand,
                op,
                position,
            } => {
                let position = match position {
                    Position::Prefix => "prefix",
                    Position::Postfix => "postfix",
                };
                writeln!(f, "Unary {} ({position})", op.symbol())?;
                operand.write_tree(f, depth + 1)
            }
            Expr::Substitution(inner) => {
                writeln!(f, "Substitution")?;
                inner.write_tree(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_needs_two_stages() {
        assert!(Pipeline::new(vec![]).is_none());
        assert!(Pipeline::new(vec![Command::new("ls", vec![])]).is_none());
        let pipeline = Pipeline::new(vec![
            Command::new("ls", vec![]),
            Command::new("wc", vec![]),
        ])
        .unwrap();
        assert_eq!(pipeline.stages().len(), 2);
    }

    #[test]
    fn test_tree_rendering() {
        let tree = AstNode::Sequence(vec![
            AstNode::Redirection(Redirection {
                inner: Box::new(AstNode::Command(Command::new(
                    "echo",
                    vec!["hi".to_string()],
                ))),
                kind: RedirectKind::Append,
                path: "log.txt".to_string(),
            }),
            AstNode::Assignment(Assignment {
                name: "x".to_string(),
                value: Expr::Binary {
                    left: Box::new(Expr::Number(1.0)),
                    op: BinaryOp::Add,
                    right: Box::new(Expr::Variable("y".to_string())),
                },
            }),
        ]);

        let expected = "\
Sequence
  Redirection >> \"log.txt\"
    Command echo \"hi\"
  Assignment x
    Binary +
      Number 1
      Variable y
";
        assert_eq!(tree.to_string(), expected);
    }
}
