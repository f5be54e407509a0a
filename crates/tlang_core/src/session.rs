//! Ways of feeding statements to a [`Program`]: the interactive shell,
//! script files and the step debugger.
use std::io::{self, BufRead};
use std::path::Path;

use tlang_error::{Result, ResultExt, TlangError};
use tracing::{debug, warn};

use crate::program::Program;
use crate::reader::{ReadState, Reader};
use crate::verb::Verb;

pub const PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

const EXIT_STATEMENTS: &[&str] = &["quit()", "exit()"];

/// Render an error the way the interpreter reports it to users.
pub fn describe_error(err: &TlangError) -> String {
    let mut out = match err.get_field("command") {
        Some(command) => format!("Error in '{command}' command: {}: {}", err.kind(), err.message()),
        None => format!("{}: {}", err.kind(), err.message()),
    };
    for (key, value) in err.fields().filter(|(k, _)| *k != "command") {
        out.push_str(&format!("\n  {key}: {value}"));
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSignal {
    /// Ready for the next statement.
    Continue,
    /// In the middle of a statement, more input needed.
    Pending,
    /// Exit the shell.
    Exit,
}

/// Interactive read-eval-print loop over a program.
pub struct Shell<W: io::Write> {
    program: Program<W>,
    reader: Reader,
}

impl<W: io::Write> Shell<W> {
    pub fn new(program: Program<W>) -> Self {
        Shell {
            program,
            reader: Reader::new(),
        }
    }

    pub fn program(&self) -> &Program<W> {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program<W> {
        &mut self.program
    }

    pub fn into_program(self) -> Program<W> {
        self.program
    }

    pub fn prompt(&self) -> &'static str {
        if self.reader.is_pending() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        }
    }

    pub fn banner(&mut self) -> Result<()> {
        let version = env!("CARGO_PKG_VERSION");
        let writer = self.program.writer_mut();
        writeln!(writer, "Welcome to T: ({version})")?;
        writeln!(writer, "Enter statements like read('data.csv'), quit() to exit.")?;
        writeln!(writer)?;
        Ok(())
    }

    /// Feed one line of input to the shell.
    ///
    /// Statement errors are reported to the writer, only failures writing
    /// output are returned.
    pub fn consume_line(&mut self, line: &str) -> Result<ShellSignal> {
        let state = match self.reader.next_line(line) {
            Ok(state) => state,
            Err(e) => {
                self.reader.reset();
                writeln!(self.program.writer_mut(), "{}", describe_error(&e))?;
                return Ok(ShellSignal::Continue);
            }
        };

        match state {
            ReadState::Blank => Ok(ShellSignal::Continue),
            ReadState::Continued => Ok(ShellSignal::Pending),
            ReadState::Commands => {
                for statement in self.reader.take_commands() {
                    if EXIT_STATEMENTS.contains(&statement.to_lowercase().as_str()) {
                        writeln!(self.program.writer_mut(), "Bye!")?;
                        return Ok(ShellSignal::Exit);
                    }
                    self.interpret(&statement)?;
                }
                Ok(ShellSignal::Continue)
            }
        }
    }

    fn interpret(&mut self, statement: &str) -> Result<()> {
        let result = self.program.run_statement(statement);

        if let Err(e) = self.program.history_mut().record(statement) {
            warn!(%e, "failed to record history");
        }

        match result {
            Ok(verb) => debug!(verb = verb.name(), "statement done"),
            Err(e) => writeln!(self.program.writer_mut(), "{}", describe_error(&e))?,
        }
        Ok(())
    }

    /// Read lines from `input` until end of input or an exit statement.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        loop {
            let prompt = self.prompt();
            write!(self.program.writer_mut(), "{prompt}")?;
            self.program.writer_mut().flush()?;

            let Some(line) = lines.next() else {
                writeln!(self.program.writer_mut(), "\nBye!")?;
                return Ok(());
            };

            if self.consume_line(&line?)? == ShellSignal::Exit {
                return Ok(());
            }
        }
    }
}

/// Result of running a script file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    pub failed: bool,
    /// Last verb of a script that ran to the end.
    pub last_verb: Option<Verb>,
}

/// Run a script, reporting any error to the program's writer.
pub fn run_script<W: io::Write>(program: &mut Program<W>, path: &Path) -> Result<ScriptOutcome> {
    let source = std::fs::read_to_string(path)
        .context_fn(|| format!("Failed to read '{}'", path.display()))?;
    run_script_source(program, &source)
}

pub fn run_script_source<W: io::Write>(program: &mut Program<W>, source: &str) -> Result<ScriptOutcome> {
    match program.run_source(source) {
        Ok(last_verb) => Ok(ScriptOutcome {
            failed: false,
            last_verb,
        }),
        Err(e) => {
            let writer = program.writer_mut();
            writeln!(writer, "{}", describe_error(&e))?;
            writeln!(writer, "Exiting program due to errors.")?;
            Ok(ScriptOutcome {
                failed: true,
                last_verb: None,
            })
        }
    }
}

/// Runs a script held in memory, one line at a time if wanted.
pub struct DebugSession<W: io::Write> {
    program: Program<W>,
    reader: Reader,
    lines: Vec<String>,
    /// Index of the next line to run.
    pc: usize,
}

impl<W: io::Write> DebugSession<W> {
    pub fn new(program: Program<W>, lines: Vec<String>) -> Self {
        DebugSession {
            program,
            reader: Reader::new(),
            lines,
            pc: 0,
        }
    }

    pub fn program(&self) -> &Program<W> {
        &self.program
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn add_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Insert a line and start over from the top.
    pub fn insert_line(&mut self, idx: usize, line: impl Into<String>) {
        let idx = idx.min(self.lines.len());
        self.lines.insert(idx, line.into());
        self.reset();
    }

    /// Start over from the top. Tables already on the stack stay there.
    pub fn reset(&mut self) {
        self.reader.reset();
        self.pc = 0;
    }

    /// Run the next line.
    pub fn step(&mut self) -> Result<()> {
        self.run(true)
    }

    /// Run the next line, or all remaining lines if not stepping.
    pub fn run(&mut self, step: bool) -> Result<()> {
        let end = if step {
            (self.pc + 1).min(self.lines.len())
        } else {
            self.lines.len()
        };

        while self.pc < end {
            let line = &self.lines[self.pc];
            self.pc += 1;
            let state = match self.reader.next_line(line) {
                Ok(state) => state,
                Err(e) => {
                    self.reader.reset();
                    return Err(e.with_field("line", self.pc));
                }
            };

            if state == ReadState::Commands {
                for statement in self.reader.take_commands() {
                    self.program
                        .run_statement(&statement)
                        .map_err(|e| TlangError::with_source("Error in T script.", Box::new(e)))?;
                }
            }
        }

        if self.pc == self.lines.len() && self.reader.is_pending() {
            return Err(TlangError::syntax("Unexpected end of script."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tlang_error::ErrorKind;

    use super::*;
    use crate::config::ProgramConfig;
    use crate::history::MemoryHistory;

    const DATA: &str = "name,n\nalpha,1\nbeta,22\ngamma,333\n";

    fn program(dir: &Path, repl: bool) -> Program<Vec<u8>> {
        fs::write(dir.join("data.csv"), DATA).unwrap();
        let config = ProgramConfig {
            data_dir: Some(dir.to_path_buf()),
            src_dir: Some(dir.to_path_buf()),
            repl,
            ..Default::default()
        };
        Program::with_seed(config, Box::new(MemoryHistory::new()), Vec::new(), 0)
    }

    fn output<W: AsRef<[u8]>>(writer: W) -> String {
        String::from_utf8(writer.as_ref().to_vec()).unwrap()
    }

    #[test]
    fn describe() {
        let err = TlangError::reference("Invalid column reference: x")
            .with_field("command", "keep")
            .with_field("line", 3);
        assert_eq!(
            "Error in 'keep' command: ReferenceError: Invalid column reference: x\n  line: 3",
            describe_error(&err)
        );

        let err = TlangError::syntax("Unexpected end of script.");
        assert_eq!("SyntaxError: Unexpected end of script.", describe_error(&err));
    }

    #[test]
    fn shell_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(program(dir.path(), false));

        assert_eq!(PROMPT, shell.prompt());
        assert_eq!(ShellSignal::Continue, shell.consume_line("").unwrap());
        assert_eq!(ShellSignal::Pending, shell.consume_line("read(").unwrap());
        assert_eq!(CONTINUATION_PROMPT, shell.prompt());
        assert_eq!(ShellSignal::Continue, shell.consume_line("'data.csv')").unwrap());
        assert_eq!(1, shell.program().tables().len());

        // Errors are reported and the shell keeps going.
        assert_eq!(ShellSignal::Continue, shell.consume_line("keep(nope)").unwrap());
        assert_eq!(ShellSignal::Continue, shell.consume_line("first(1); pop()").unwrap());
        assert_eq!(ShellSignal::Exit, shell.consume_line("quit()").unwrap());

        let out = output(shell.program().writer());
        assert!(out.contains("Error in 'keep' command: ReferenceError"));
        assert!(out.ends_with("Bye!\n"));

        let history = shell.program_mut().history_mut().recent(None).unwrap();
        assert_eq!(
            vec!["001 read( 'data.csv')", "002 keep(nope)", "003 first(1)", "004 pop()"],
            history
        );
    }

    #[test]
    fn shell_reader_errors_reset() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(program(dir.path(), false));

        shell.consume_line("keep(a,").unwrap();
        assert_eq!(ShellSignal::Continue, shell.consume_line("b]").unwrap());
        assert_eq!(PROMPT, shell.prompt());
        assert!(output(shell.program().writer()).contains("Continuation mismatch"));
    }

    #[test]
    fn shell_run_until_eof() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(program(dir.path(), true));
        shell.banner().unwrap();
        shell.run("read('data.csv')\nshow(1)\n".as_bytes()).unwrap();

        let out = output(shell.program().writer());
        assert!(out.starts_with("Welcome to T:"));
        assert!(out.contains(">>> "));
        assert!(out.contains("gamma"));
        assert!(out.ends_with("Bye!\n"));
    }

    #[test]
    fn script_outcomes() {
        logutil::init_test();

        let dir = tempfile::tempdir().unwrap();

        let mut prog = program(dir.path(), false);
        let outcome = run_script_source(&mut prog, "read('data.csv')\nsort((n, DESC))\n").unwrap();
        assert!(!outcome.failed);
        assert_eq!(Some("sort"), outcome.last_verb.as_ref().map(|v| v.name()));

        let mut prog = program(dir.path(), false);
        let outcome = run_script_source(&mut prog, "read('data.csv')\nkeep(nope)\nshow()\n").unwrap();
        assert!(outcome.failed);
        assert_eq!(None, outcome.last_verb);
        // The table read before the failure stays on the stack.
        assert_eq!(1, prog.tables().len());
        let out = output(prog.writer());
        assert!(out.contains("line: 2"));
        assert!(out.ends_with("Exiting program due to errors.\n"));

        let mut prog = program(dir.path(), false);
        let outcome = run_script_source(&mut prog, "read('data.csv')\n\"\"\"\nopen comment\n").unwrap();
        assert!(outcome.failed);
        assert!(output(prog.writer()).contains("Unexpected end of script."));
    }

    #[test]
    fn script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.t"), "read('data.csv') # load\nlast(2)\n").unwrap();

        let mut prog = program(dir.path(), false);
        let outcome = run_script(&mut prog, &dir.path().join("main.t")).unwrap();
        assert!(!outcome.failed);
        assert_eq!(2, prog.summary().unwrap().num_rows);

        let err = run_script(&mut prog, &dir.path().join("missing.t")).unwrap_err();
        assert_eq!(ErrorKind::Io, err.kind());
    }

    #[test]
    fn debug_stepping() {
        let dir = tempfile::tempdir().unwrap();
        let lines = vec![
            "read('data.csv')".to_string(),
            "first(2)".to_string(),
            "keep(name)".to_string(),
        ];
        let mut session = DebugSession::new(program(dir.path(), false), lines);

        session.step().unwrap();
        assert_eq!(1, session.pc());
        assert_eq!(3, session.program().summary().unwrap().num_rows);

        session.run(false).unwrap();
        assert_eq!(3, session.pc());
        assert_eq!(vec!["name"], session.program().summary().unwrap().column_names);

        // Stepping past the end does nothing.
        session.step().unwrap();
        assert_eq!(3, session.pc());

        session.insert_line(3, "keep(nope)");
        assert_eq!(0, session.pc());
        session.add_line("pop()");
        assert_eq!(5, session.lines().len());
    }

    #[test]
    fn debug_errors() {
        let dir = tempfile::tempdir().unwrap();
        let lines = vec!["read('data.csv')".to_string(), "keep(nope)".to_string()];
        let mut session = DebugSession::new(program(dir.path(), false), lines);
        let err = session.run(false).unwrap_err();
        assert_eq!("Error in T script.", err.message());
        assert_eq!(ErrorKind::Reference, err.kind());

        let lines = vec!["read(".to_string()];
        let mut session = DebugSession::new(program(dir.path(), false), lines);
        let err = session.run(false).unwrap_err();
        assert_eq!("Unexpected end of script.", err.message());

        // A bad continuation is skipped and the next step starts clean.
        let lines = vec![
            "keep(a,".to_string(),
            "b]".to_string(),
            "read('data.csv')".to_string(),
        ];
        let mut session = DebugSession::new(program(dir.path(), false), lines);
        session.step().unwrap();
        let err = session.step().unwrap_err();
        assert_eq!("Continuation mismatch: ( ]", err.message());
        assert_eq!(Some("2"), err.get_field("line"));
        assert_eq!(2, session.pc());
        session.step().unwrap();
        assert_eq!(1, session.program().tables().len());
    }
}
