use crate::command::{CommandHandler, ExitCode};
use crate::error::ScriptError;
use log::{debug, error};
use std::any::Any;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

/// Name to handler lookup table consulted at the leaves of execution.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`. A later registration under the same
    /// name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[String], &mut dyn Read, &mut dyn Write) -> anyhow::Result<ExitCode>
            + Send
            + Sync
            + 'static,
    {
        self.register_handler(name, Box::new(handler));
    }

    pub fn register_handler(&mut self, name: impl Into<String>, handler: Box<dyn CommandHandler>) {
        let name = name.into();
        if self.commands.insert(name.clone(), handler).is_some() {
            debug!("replaced handler for command '{name}'");
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invokes the handler registered under `name`.
    ///
    /// Fails with [`ScriptError::CommandNotFound`] if there is none, and maps a
    /// handler's own error, or a panic inside it, into [`ScriptError::Runtime`].
    pub fn execute(
        &self,
        name: &str,
        args: &[String],
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<ExitCode, ScriptError> {
        let handler = self
            .commands
            .get(name)
            .ok_or_else(|| ScriptError::CommandNotFound(name.to_string()))?;
        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(args, input, output))) {
            Ok(result) => result.map_err(|err| ScriptError::runtime(name, format!("{err:#}"))),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("command '{name}' panicked: {message}");
                Err(ScriptError::runtime(name, format!("panicked: {message}")))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "unknown panic"
    }
}
