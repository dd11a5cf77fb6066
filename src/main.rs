use anyhow::{Context, Result};
use argh::FromArgs;
use cmdscript::config::Config;
use cmdscript::lexer::{dump_tokens, tokenize};
use cmdscript::parser::parse;
use cmdscript::{Executor, host};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set by the SIGINT handler, consumed by the console while a script runs.
static INTERRUPT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// How often the console looks at [`INTERRUPT_REQUESTED`] while output is idle.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

#[derive(FromArgs)]
/// Run a cmdscript script, or start the interactive console when none is given.
struct Cli {
    #[argh(option, short = 'c')]
    /// script text to run
    command: Option<String>,

    #[argh(switch)]
    /// read the script from standard input
    stdin: bool,

    #[argh(option)]
    /// configuration file to use instead of ~/.config/cmdscript/config.toml
    config: Option<PathBuf>,

    #[argh(switch)]
    /// print the token table before running
    dump_tokens: bool,

    #[argh(switch)]
    /// print the syntax tree before running
    dump_ast: bool,

    #[argh(switch, short = 'v')]
    /// log at debug level
    verbose: bool,

    #[argh(positional)]
    /// script file to run
    file: Option<PathBuf>,
}

fn main() -> process::ExitCode {
    let cli: Cli = argh::from_env();
    match run(cli) {
        Ok(code) => process::ExitCode::from(code.clamp(0, 255) as u8),
        Err(err) => {
            eprintln!("cmdscript: {err:#}");
            process::ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        config.level_filter()
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut executor = Executor::with_builtins();
    config.apply(&mut executor);

    let source = if let Some(text) = &cli.command {
        Some(text.clone())
    } else if cli.stdin {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("cannot read script from standard input")?;
        Some(text)
    } else if let Some(path) = &cli.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read script {}", path.display()))?;
        Some(text)
    } else {
        None
    };

    match source {
        Some(source) => run_script(&mut executor, &source, &cli),
        None => repl(executor, &config),
    }
}

fn run_script(executor: &mut Executor, source: &str, cli: &Cli) -> Result<i32> {
    let mut stdout = io::stdout().lock();

    if cli.dump_tokens || cli.dump_ast {
        match tokenize(source) {
            Ok(tokens) => {
                if cli.dump_tokens {
                    dump_tokens(&tokens, &mut stdout)?;
                }
                if cli.dump_ast {
                    match parse(&tokens) {
                        Ok(ast) => write!(stdout, "{ast}")?,
                        Err(err) => writeln!(stdout, "Error: {err}")?,
                    }
                }
            }
            Err(err) => writeln!(stdout, "Error: {err}")?,
        }
    }

    // A script read from stdin leaves nothing there for its commands.
    let outcome = if cli.stdin {
        executor.run(source, &mut io::empty(), &mut stdout)
    } else {
        executor.run(source, &mut io::stdin().lock(), &mut stdout)
    };
    Ok(outcome.exit_code())
}

extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPT_REQUESTED.store(true, Ordering::SeqCst);
}

/// Turns Ctrl-C into an interrupt request instead of process termination.
/// At the prompt rustyline reads Ctrl-C as a key, so this only fires while a
/// script runs.
fn install_interrupt_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic.
    unsafe { signal::sigaction(Signal::SIGINT, &action) }
        .context("cannot install SIGINT handler")?;
    Ok(())
}

/// Console directives start with `@` and never reach the executor.
fn directive(line: &str, executor: &Executor, echo: &mut bool) {
    match line {
        "echo_on" => *echo = true,
        "echo_off" => *echo = false,
        "vars" => {
            for (name, value) in executor.variables() {
                println!("{name}={value}");
            }
        }
        "commands" => println!("{}", executor.registry().names().join(" ")),
        other => println!("Error: unknown directive @{other}"),
    }
}

fn repl(mut executor: Executor, config: &Config) -> Result<i32> {
    let mut rl = DefaultEditor::new()?;
    let mut echo = config.settings.echo_commands;
    install_interrupt_handler()?;

    loop {
        let line = match rl.readline(&config.settings.prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        if line == "exit" || line == "quit" {
            break;
        }
        if let Some(name) = line.strip_prefix('@') {
            directive(name, &executor, &mut echo);
            continue;
        }
        if echo {
            println!("$ {line}");
        }

        INTERRUPT_REQUESTED.store(false, Ordering::SeqCst);
        let handle = host::spawn(executor, line);
        let mut stdout = io::stdout();
        handle.drain_forwarding(&INTERRUPT_REQUESTED, INTERRUPT_POLL, |chunk| {
            print!("{chunk}");
            stdout.flush()?;
            Ok(())
        })?;
        let (back, outcome) = handle.join()?;
        executor = back;
        if outcome.is_interrupted() {
            println!("Interrupted");
        }
    }

    Ok(executor.last_status())
}
