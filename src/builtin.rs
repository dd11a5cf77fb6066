use crate::command::{CommandHandler, ExitCode};
use crate::registry::CommandRegistry;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use regex::{Regex, RegexBuilder};
use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

/// Commands shipped with the crate.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and run in-process
/// against the streams the executor hands them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for
    /// failure. Errors are reported by the executor as failures of this command.
    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode>;
}

/// Registry adapter that parses arguments into `T` on every call.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> CommandHandler for Factory<T> {
    fn call(&self, args: &[String], input: &mut dyn Read, output: &mut dyn Write) -> Result<ExitCode> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(input, output),
            // `--help` and argument errors: print what argh produced.
            Err(EarlyExit { output: text, status }) => {
                write!(output, "{text}")?;
                if !text.ends_with('\n') {
                    writeln!(output)?;
                }
                Ok(if status.is_err() { 1 } else { 0 })
            }
        }
    }
}

fn add<T: BuiltinCommand + 'static>(registry: &mut CommandRegistry) {
    registry.register_handler(T::name(), Box::new(Factory::<T>::default()));
}

/// Registers every builtin command.
pub fn register_all(registry: &mut CommandRegistry) {
    add::<Echo>(registry);
    add::<Cat>(registry);
    add::<Grep>(registry);
    add::<Wc>(registry);
    add::<Head>(registry);
    add::<Tail>(registry);
    add::<Sort>(registry);
    add::<Pwd>(registry);
    add::<Cd>(registry);
    add::<True>(registry);
    add::<False>(registry);
    add::<Seq>(registry);
}

/// Reads every file in order, or standard input when no file is given.
fn read_all(files: &[String], stdin: &mut dyn Read) -> Result<String> {
    let mut buf = String::new();
    if files.is_empty() {
        stdin.read_to_string(&mut buf)?;
        return Ok(buf);
    }
    for fname in files {
        let text = fs::read_to_string(fname).with_context(|| fname.clone())?;
        buf.push_str(&text);
    }
    Ok(buf)
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, _stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let cwd = env::current_dir().context("cannot read current directory")?;
        writeln!(stdout, "{}", cwd.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdin: &mut dyn Read, _stdout: &mut dyn Write) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env::var_os("HOME") {
                Some(home) => PathBuf::from(home),
                None => anyhow::bail!("no target and HOME not set"),
            },
        };

        let canonical = fs::canonicalize(&target)
            .with_context(|| format!("can't canonicalize {}", target.display()))?;
        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, _stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes
pub struct Wc {
    #[argh(positional, greedy)]
    /// files to count; standard input when omitted.
    pub files: Vec<String>,
}

fn counts(text: &str) -> (usize, usize, usize) {
    (text.lines().count(), text.split_whitespace().count(), text.len())
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        if self.files.is_empty() {
            let mut buf = String::new();
            stdin.read_to_string(&mut buf)?;
            let (lines, words, bytes) = counts(&buf);
            writeln!(stdout, "{} {} {}", lines, words, bytes)?;
            return Ok(0);
        }
        for fname in &self.files {
            let text = fs::read_to_string(fname).with_context(|| fname.clone())?;
            let (lines, words, bytes) = counts(&text);
            writeln!(stdout, "{} {} {} {}", lines, words, bytes, fname)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print file(s) to stdout
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print; standard input when omitted.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        if self.files.is_empty() {
            std::io::copy(stdin, stdout)?;
            return Ok(0);
        }
        for fname in &self.files {
            let mut f = fs::File::open(fname).with_context(|| fname.clone())?;
            std::io::copy(&mut f, stdout)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print lines matching a pattern
pub struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression)
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search. If none provided, reads from stdin.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words (using non-word characters as boundaries)
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions
    pub ignore_case: bool,

    #[argh(switch, short = 'v')]
    /// select non-matching lines
    pub invert_match: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after matching lines
    pub after_context: usize,
}

impl Grep {
    /// Prints selected lines of one source and returns how many lines matched.
    fn process_source(
        &self,
        reader: &mut dyn Read,
        stdout: &mut dyn Write,
        file_name: Option<&str>,
        re: &Regex,
    ) -> Result<usize> {
        let mut lines = Vec::new();
        for line in BufReader::new(reader).lines() {
            lines.push(line.context("read error")?);
        }

        let total_lines = lines.len();
        let mut to_print = vec![false; total_lines];
        let mut matched = 0;
        for (i, line) in lines.iter().enumerate() {
            if re.is_match(line) != self.invert_match {
                matched += 1;
                let end_print = i
                    .saturating_add(self.after_context)
                    .saturating_add(1)
                    .min(total_lines);
                to_print[i..end_print].fill(true);
            }
        }

        let prefix = file_name
            .map(|name| format!("{}:", name))
            .unwrap_or_default();
        let mut last_printed: Option<usize> = None;
        for (i, line) in lines.iter().enumerate() {
            if !to_print[i] {
                continue;
            }
            if self.after_context > 0 && last_printed.is_some_and(|last| i > last + 1) {
                writeln!(stdout, "--")?;
            }
            writeln!(stdout, "{}{}", prefix, line)?;
            last_printed = Some(i);
        }

        Ok(matched)
    }
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let pattern = if self.word_regexp {
            format!(r"\b({})\b", self.pattern)
        } else {
            self.pattern.clone()
        };

        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("invalid regex pattern: {}", pattern))?;

        let mut matched = 0;
        if self.files.is_empty() {
            matched += self.process_source(stdin, stdout, None, &re)?;
        } else {
            let show_names = self.files.len() > 1;
            for file_name in &self.files {
                let mut f = fs::File::open(file_name).with_context(|| file_name.clone())?;
                let label = show_names.then_some(file_name.as_str());
                matched += self.process_source(&mut f, stdout, label, &re)?;
            }
        }

        Ok(if matched > 0 { 0 } else { 1 })
    }
}

#[derive(FromArgs)]
/// print the first lines of the input
pub struct Head {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print
    pub lines: usize,

    #[argh(positional, greedy)]
    /// files to read; standard input when omitted.
    pub files: Vec<String>,
}

impl BuiltinCommand for Head {
    fn name() -> &'static str {
        "head"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let text = read_all(&self.files, stdin)?;
        for line in text.lines().take(self.lines) {
            writeln!(stdout, "{}", line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print the last lines of the input
pub struct Tail {
    #[argh(option, short = 'n', default = "10")]
    /// number of lines to print
    pub lines: usize,

    #[argh(positional, greedy)]
    /// files to read; standard input when omitted.
    pub files: Vec<String>,
}

impl BuiltinCommand for Tail {
    fn name() -> &'static str {
        "tail"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let text = read_all(&self.files, stdin)?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(self.lines);
        for line in &lines[start..] {
            writeln!(stdout, "{}", line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// sort lines of text
pub struct Sort {
    #[argh(switch, short = 'r')]
    /// reverse the result of comparisons
    pub reverse: bool,

    #[argh(positional, greedy)]
    /// files to sort; standard input when omitted.
    pub files: Vec<String>,
}

impl BuiltinCommand for Sort {
    fn name() -> &'static str {
        "sort"
    }

    fn execute(self, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let text = read_all(&self.files, stdin)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        if self.reverse {
            lines.reverse();
        }
        for line in lines {
            writeln!(stdout, "{}", line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// do nothing, successfully
pub struct True {}

impl BuiltinCommand for True {
    fn name() -> &'static str {
        "true"
    }

    fn execute(self, _stdin: &mut dyn Read, _stdout: &mut dyn Write) -> Result<ExitCode> {
        Ok(0)
    }
}

#[derive(FromArgs)]
/// do nothing, unsuccessfully
pub struct False {}

impl BuiltinCommand for False {
    fn name() -> &'static str {
        "false"
    }

    fn execute(self, _stdin: &mut dyn Read, _stdout: &mut dyn Write) -> Result<ExitCode> {
        Ok(1)
    }
}

#[derive(FromArgs)]
/// print a sequence of numbers, one per line.
/// `seq LAST` counts from 1, `seq FIRST LAST` from FIRST.
pub struct Seq {
    #[argh(positional)]
    /// last number, or the first one when two are given
    pub first: i64,

    #[argh(positional)]
    /// last number
    pub last: Option<i64>,
}

impl BuiltinCommand for Seq {
    fn name() -> &'static str {
        "seq"
    }

    fn execute(self, _stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<ExitCode> {
        let (first, last) = match self.last {
            Some(last) => (self.first, last),
            None => (1, self.first),
        };
        for n in first..=last {
            writeln!(stdout, "{}", n)?;
        }
        Ok(0)
    }
}
