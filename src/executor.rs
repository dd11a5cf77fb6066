use crate::ast::{AstNode, BinaryOp, Command, Expr, Pipeline, Position, RedirectKind, Redirection, UnaryOp};
use crate::builtin;
use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ScriptError;
use crate::io_adapters::{ChunkWriter, UpdateCallback};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::registry::CommandRegistry;
use log::{debug, error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code reported for a script stopped through the interrupt flag.
pub const INTERRUPTED_EXIT_CODE: ExitCode = 130;

/// How a top-level run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The script ran to completion (errors included) with this status.
    Finished(ExitCode),
    /// The interrupt flag stopped the script.
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Finished(code) => code,
            Outcome::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    pub fn is_interrupted(self) -> bool {
        self == Outcome::Interrupted
    }
}

/// Tree-walking interpreter for parsed scripts.
///
/// An executor owns its variables and its command registry. Variables persist
/// across runs until [`Executor::clear_variables`] is called.
///
/// Example
/// ```
/// use cmdscript::Executor;
/// let mut executor = Executor::with_builtins();
/// let mut out = Vec::new();
/// executor.run("x = 5 + 3 * 2; echo ${x}", &mut std::io::empty(), &mut out);
/// assert_eq!(out, b"11\n");
/// assert_eq!(executor.get_variable("x"), Some("11"));
/// ```
pub struct Executor {
    registry: CommandRegistry,
    env: Environment,
    interrupt: Option<Arc<AtomicBool>>,
    on_update: Option<UpdateCallback>,
    last_status: ExitCode,
}

impl Default for Executor {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Executor {
    /// Creates an executor with an empty command registry.
    pub fn new() -> Self {
        Self::with_registry(CommandRegistry::new())
    }

    pub fn with_registry(registry: CommandRegistry) -> Self {
        Self {
            registry,
            env: Environment::new(),
            interrupt: None,
            on_update: None,
            last_status: 0,
        }
    }

    /// Creates an executor with the default command set registered.
    pub fn with_builtins() -> Self {
        let mut registry = CommandRegistry::new();
        builtin::register_all(&mut registry);
        Self::with_registry(registry)
    }

    pub fn add_command<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[String], &mut dyn Read, &mut dyn Write) -> anyhow::Result<ExitCode>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(name, handler);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.set_var(name, value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.env.get_var(name)
    }

    pub fn clear_variables(&mut self) {
        self.env.clear();
    }

    /// All variables, sorted by name.
    pub fn variables(&self) -> Vec<(&str, &str)> {
        self.env.sorted()
    }

    /// Installs the flag checked between nodes and on every output write.
    pub fn set_interrupt(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    pub fn clear_interrupt(&mut self) {
        self.interrupt = None;
    }

    /// Installs a consumer that receives output line by line while a script
    /// is still running.
    pub fn set_update_callback(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    pub fn clear_update_callback(&mut self) {
        self.on_update = None;
    }

    /// Status of the most recent top-level run.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Tokenizes, parses and executes `source`.
    ///
    /// A syntax error is reported on `output` and nothing is executed.
    pub fn run(&mut self, source: &str, input: &mut dyn Read, output: &mut dyn Write) -> Outcome {
        match tokenize(source).and_then(|tokens| parse(&tokens)) {
            Ok(ast) => self.execute(&ast, input, output),
            Err(err) => {
                error!("{err}");
                let mut writer = ChunkWriter::new(output, None).with_callback(self.on_update.take());
                report_error(&mut writer, &err);
                self.on_update = writer.finish();
                self.last_status = 1;
                Outcome::Finished(1)
            }
        }
    }

    /// Executes an already parsed tree.
    ///
    /// Errors that escape the tree are written to `output` as `Error: ...`
    /// and turn into a status of 1. Interruption is reported separately.
    pub fn execute(&mut self, node: &AstNode, input: &mut dyn Read, output: &mut dyn Write) -> Outcome {
        let mut writer = ChunkWriter::new(&mut *output, None).with_callback(self.on_update.take());
        let outcome = match self.execute_node(node, input, &mut writer) {
            Ok(code) => Outcome::Finished(code),
            Err(err) if err.is_interrupted() => {
                info!("script interrupted");
                Outcome::Interrupted
            }
            Err(err) => {
                error!("{err}");
                report_error(&mut writer, &err);
                Outcome::Finished(1)
            }
        };
        self.on_update = writer.finish();
        if let Err(err) = output.flush() {
            warn!("failed to flush output: {err}");
        }

        self.last_status = outcome.exit_code();
        outcome
    }

    fn check_interrupt(&self) -> Result<(), ScriptError> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(ScriptError::Interrupted),
            _ => Ok(()),
        }
    }

    fn execute_node(
        &mut self,
        node: &AstNode,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        self.check_interrupt()?;
        match node {
            AstNode::Command(cmd) => self.execute_command(cmd, input, output),
            AstNode::Pipeline(pipeline) => self.execute_pipeline(pipeline, input, output),
            AstNode::Redirection(redirect) => self.execute_redirection(redirect, input, output),
            AstNode::Sequence(items) => self.execute_sequence(items, input, output),
            AstNode::LogicalAnd(left, right) => {
                let code = self.execute_node(left, input, output)?;
                if code != 0 {
                    debug!("'&&' skipped its right side after status {code}");
                    return Ok(code);
                }
                self.execute_node(right, input, output)
            }
            AstNode::Assignment(assignment) => {
                let value = self.evaluate(&assignment.value)?;
                debug!("{} = {value:?}", assignment.name);
                self.env.set_var(assignment.name.as_str(), value);
                Ok(0)
            }
        }
    }

    fn execute_command(
        &self,
        cmd: &Command,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        let name = self.env.expand(&cmd.name);
        let args: Vec<String> = cmd.args.iter().map(|arg| self.env.expand(arg)).collect();
        debug!("running {name} {args:?}");

        let mut guarded = ChunkWriter::new(output, self.interrupt.clone());
        let result = self.registry.execute(&name, &args, input, &mut guarded);
        self.check_interrupt()?;

        let code = result?;
        if code != 0 {
            debug!("{name} exited with status {code}");
        }
        Ok(code)
    }

    fn execute_pipeline(
        &self,
        pipeline: &Pipeline,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        let stages = pipeline.stages();
        let mut carried = Vec::new();
        let mut status = 0;

        for (i, stage) in stages.iter().enumerate() {
            self.check_interrupt()?;
            let mut from_previous = Cursor::new(std::mem::take(&mut carried));
            let stage_input: &mut dyn Read = if i == 0 {
                &mut *input
            } else {
                &mut from_previous
            };

            if i + 1 == stages.len() {
                status = self.execute_command(stage, stage_input, output)?;
            } else {
                let mut buffer = Vec::new();
                status = self.execute_command(stage, stage_input, &mut buffer)?;
                carried = buffer;
            }
        }

        Ok(status)
    }

    fn execute_redirection(
        &mut self,
        redirect: &Redirection,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        let path = self.env.expand(&redirect.path);
        let io_error = |source: io::Error| ScriptError::Io {
            path: path.clone(),
            source,
        };

        match redirect.kind {
            RedirectKind::Input => {
                let file = File::open(&path).map_err(io_error)?;
                let mut reader = BufReader::new(file);
                self.execute_node(&redirect.inner, &mut reader, output)
            }
            RedirectKind::Output | RedirectKind::Append => {
                let file = if redirect.kind == RedirectKind::Append {
                    OpenOptions::new().create(true).append(true).open(&path)
                } else {
                    File::create(&path)
                }
                .map_err(io_error)?;
                let mut writer = BufWriter::new(file);
                let code = self.execute_node(&redirect.inner, input, &mut writer)?;
                writer.flush().map_err(io_error)?;
                Ok(code)
            }
        }
    }

    fn execute_sequence(
        &mut self,
        items: &[AstNode],
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        let mut status = 0;
        for item in items {
            status = match self.execute_node(item, input, output) {
                Ok(code) => code,
                Err(err) if err.is_interrupted() => return Err(err),
                Err(err) => {
                    warn!("{err}");
                    report_error(output, &err);
                    1
                }
            };
        }
        Ok(status)
    }

    /// Value of an assignment's right-hand side.
    fn evaluate(&mut self, expr: &Expr) -> Result<String, ScriptError> {
        match expr {
            Expr::Str(text) => Ok(text.clone()),
            Expr::Number(n) => Ok(format_number(*n)),
            Expr::Variable(name) => Ok(self.env.get_var(name).unwrap_or_default().to_string()),
            Expr::Substitution(inner) => self.substitute(inner),
            Expr::Binary { .. } | Expr::Unary { .. } => self.evaluate_number(expr).map(format_number),
        }
    }

    fn evaluate_number(&mut self, expr: &Expr) -> Result<f64, ScriptError> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Str(text) => Ok(parse_number(text)),
            Expr::Variable(name) => Ok(parse_number(self.env.get_var(name).unwrap_or_default())),
            Expr::Substitution(inner) => Ok(parse_number(&self.substitute(inner)?)),
            Expr::Binary { left, op, right } => {
                let lhs = self.evaluate_number(left)?;
                let rhs = self.evaluate_number(right)?;
                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => {
                        Err(ScriptError::runtime("arithmetic", "division by zero"))
                    }
                    BinaryOp::Div => Ok(lhs / rhs),
                    BinaryOp::Mod if rhs == 0.0 => {
                        Err(ScriptError::runtime("arithmetic", "modulo by zero"))
                    }
                    BinaryOp::Mod => Ok(lhs % rhs),
                }
            }
            Expr::Unary {
                operand,
                op: UnaryOp::Negate,
                ..
            } => Ok(-self.evaluate_number(operand)?),
            Expr::Unary {
                operand,
                op,
                position,
            } => {
                let Expr::Variable(name) = operand.as_ref() else {
                    return Err(ScriptError::runtime(
                        "arithmetic",
                        format!("'{}' needs a variable operand", op.symbol()),
                    ));
                };
                let old = parse_number(self.env.get_var(name).unwrap_or_default());
                let new = if *op == UnaryOp::Increment {
                    old + 1.0
                } else {
                    old - 1.0
                };
                self.env.set_var(name.as_str(), format_number(new));
                Ok(match position {
                    Position::Prefix => new,
                    Position::Postfix => old,
                })
            }
        }
    }

    /// Runs `inner` with empty input and returns what it printed, minus
    /// trailing line breaks.
    fn substitute(&mut self, inner: &AstNode) -> Result<String, ScriptError> {
        let mut captured = Vec::new();
        let code = self.execute_node(inner, &mut io::empty(), &mut captured)?;
        if code != 0 {
            debug!("command substitution exited with status {code}");
        }
        let text = String::from_utf8_lossy(&captured);
        Ok(text.trim_end_matches(['\n', '\r']).to_string())
    }
}

fn report_error(output: &mut dyn Write, err: &ScriptError) {
    if let Err(write_err) = writeln!(output, "Error: {err}") {
        warn!("could not report error '{err}': {write_err}");
    }
}

/// Numeric value of a variable or string; anything that is not a finite
/// number counts as zero.
pub fn parse_number(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Formats an arithmetic result: `11`, `-3`, `2.5`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}
