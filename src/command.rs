use anyhow::Result;
use std::io::{Read, Write};

/// Conventional exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Object-safe trait for anything the registry can dispatch to.
///
/// Implemented for plain closures with the matching signature, so most callers
/// never name this trait directly:
///
/// ```
/// use cmdscript::CommandRegistry;
/// let mut registry = CommandRegistry::new();
/// registry.register("hello", |_args: &[String], _input: &mut dyn std::io::Read, output: &mut dyn std::io::Write| {
///     writeln!(output, "hello")?;
///     Ok(0)
/// });
/// assert!(registry.has("hello"));
/// ```
pub trait CommandHandler: Send + Sync {
    /// Runs the command. Returning `Err` is reported by the executor as a
    /// runtime error of this command.
    fn call(&self, args: &[String], input: &mut dyn Read, output: &mut dyn Write)
    -> Result<ExitCode>;
}

impl<F> CommandHandler for F
where
    F: Fn(&[String], &mut dyn Read, &mut dyn Write) -> Result<ExitCode> + Send + Sync,
{
    fn call(
        &self,
        args: &[String],
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode> {
        self(args, input, output)
    }
}
