//! A small embeddable command-scripting language.
//!
//! Scripts are tokenized by [`lexer`], parsed into an [`ast::AstNode`] tree by
//! [`parser`] and walked by an [`Executor`]. The executor dispatches commands
//! through a [`CommandRegistry`] of Rust handlers and keeps script variables
//! between runs. The language covers commands with arguments, pipelines,
//! `<`/`>`/`>>` redirection, `;` sequences, `&&`, variable assignment with
//! arithmetic, `${name}` expansion and `$( ... )` command substitution.
//!
//! For hosts with their own event loop, [`host::spawn`] runs a script on a
//! worker thread and streams its output back line by line; the script can be
//! stopped cooperatively through an interrupt flag.
//!
//! ```
//! use cmdscript::{Executor, Outcome};
//!
//! let mut executor = Executor::with_builtins();
//! executor.add_command("shout", |args: &[String], _input: &mut dyn std::io::Read, output: &mut dyn std::io::Write| {
//!     writeln!(output, "{}!", args.join(" ").to_uppercase())?;
//!     Ok(0)
//! });
//!
//! let mut out = Vec::new();
//! let outcome = executor.run("name = world; shout hello ${name}", &mut std::io::empty(), &mut out);
//! assert_eq!(outcome, Outcome::Finished(0));
//! assert_eq!(String::from_utf8(out).unwrap(), "HELLO WORLD!\n");
//! ```

pub mod ast;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod host;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod registry;
#[cfg(test)]
mod test_support;

pub use builtin::register_all as register_builtins;
pub use command::{CommandHandler, ExitCode};
pub use error::ScriptError;
pub use executor::{Executor, Outcome};
pub use host::{ChunkWait, ScriptHandle, spawn};
pub use registry::CommandRegistry;
