//! The stack machine that executes verbs.
use std::fs;
use std::io;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tlang_error::{Result, ResultExt, TlangError};
use tracing::{debug, info, trace};

use crate::binding::{CallStack, Namespace, bind_command};
use crate::command::split_verb_and_args;
use crate::config::ProgramConfig;
use crate::expr::compile;
use crate::history::HistorySink;
use crate::reader::{ReadState, Reader};
use crate::stack::Stack;
use crate::table::format::{inspect_format, pretty_format};
use crate::table::io::{OutputFormat, read_csv, write_file, write_table};
use crate::table::{ColumnStats, Table};
use crate::udf::UdfRegistry;
use crate::verb::{StackEffect, Verb};

/// Scripts calling scripts deeper than this are assumed to recurse forever.
const MAX_SCRIPT_DEPTH: usize = 64;

/// Cached facts about the table on top of the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub column_names: Vec<String>,
    pub num_columns: usize,
    pub num_rows: usize,
    pub stats: Vec<ColumnStats>,
}

impl TableSummary {
    fn new(table: &Table) -> Self {
        TableSummary {
            column_names: table.column_names().into_iter().map(String::from).collect(),
            num_columns: table.num_columns(),
            num_rows: table.num_rows(),
            stats: table.stats(),
        }
    }
}

/// Executes verbs against a stack of tables.
///
/// Anything a verb prints goes to `writer`.
pub struct Program<W: io::Write> {
    tables: Stack<Table>,
    calls: CallStack,
    registry: UdfRegistry,
    history: Box<dyn HistorySink>,
    config: ProgramConfig,
    rng: StdRng,
    writer: W,
    summary: Option<TableSummary>,
}

impl<W: io::Write> Program<W> {
    pub fn new(config: ProgramConfig, history: Box<dyn HistorySink>, writer: W) -> Self {
        Self::with_rng(config, history, writer, StdRng::from_os_rng())
    }

    /// Create a program with a deterministic random number generator.
    pub fn with_seed(
        config: ProgramConfig,
        history: Box<dyn HistorySink>,
        writer: W,
        seed: u64,
    ) -> Self {
        Self::with_rng(config, history, writer, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        config: ProgramConfig,
        history: Box<dyn HistorySink>,
        writer: W,
        rng: StdRng,
    ) -> Self {
        Program {
            tables: Stack::new(),
            calls: CallStack::default(),
            registry: UdfRegistry::with_builtins(),
            history,
            config,
            rng,
            writer,
            summary: None,
        }
    }

    pub fn tables(&self) -> &Stack<Table> {
        &self.tables
    }

    pub fn calls(&self) -> &CallStack {
        &self.calls
    }

    /// Replace the top level script arguments.
    pub fn set_script_args(&mut self, args: Namespace) {
        self.calls = CallStack::new(args);
    }

    pub fn registry(&self) -> &UdfRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut UdfRegistry {
        &mut self.registry
    }

    pub fn history_mut(&mut self) -> &mut dyn HistorySink {
        self.history.as_mut()
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProgramConfig {
        &mut self.config
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Summary of the top table, if there is one.
    pub fn summary(&self) -> Option<&TableSummary> {
        self.summary.as_ref()
    }

    pub fn push_table(&mut self, table: Table) {
        self.tables.push(table);
        self.refresh_summary();
    }

    /// Bind, parse and execute a single statement.
    ///
    /// Errors carry the verb they came from in the `command` field.
    pub fn run_statement(&mut self, statement: &str) -> Result<Verb> {
        trace!(%statement, "running statement");
        let result = bind_command(statement, &self.calls)
            .and_then(|cmd| Verb::from_command(&cmd))
            .and_then(|verb| self.execute(&verb).map(|_| verb));

        result.map_err(|e| {
            if e.get_field("command").is_some() {
                return e;
            }
            let verb = split_verb_and_args(statement)
                .map(|(verb, _)| verb.to_string())
                .unwrap_or_else(|_| statement.trim().to_string());
            e.with_field("command", verb)
        })
    }

    /// Run every statement in `source`, stopping at the first error.
    ///
    /// Returns the last verb that ran. Errors carry the script line they
    /// came from; errors from nested scripts keep their own line.
    pub fn run_source(&mut self, source: &str) -> Result<Option<Verb>> {
        let mut reader = Reader::new();
        let mut last = None;

        for (idx, line) in source.lines().enumerate() {
            let with_line = |e: TlangError| match e.get_field("line") {
                Some(_) => e,
                None => e.with_field("line", idx + 1),
            };
            let state = reader.next_line(line).map_err(with_line)?;
            if state != ReadState::Commands {
                continue;
            }
            for statement in reader.take_commands() {
                last = Some(self.run_statement(&statement).map_err(with_line)?);
            }
        }

        reader.finish()?;
        Ok(last)
    }

    /// Run a script file. Relative paths are used as is.
    pub fn run_file(&mut self, path: &Path) -> Result<Option<Verb>> {
        let source = fs::read_to_string(path)
            .context_fn(|| format!("Failed to read '{}'", path.display()))?;
        info!(path = %path.display(), "running script");
        self.run_source(&source)
    }

    /// Execute a verb: check the stack, run it, then update the stack.
    pub fn execute(&mut self, verb: &Verb) -> Result<()> {
        let effect = verb.stack_effect();
        self.pre_op(effect)?;

        debug!(verb = verb.name(), depth = self.tables.len(), "executing verb");
        let result = self.dispatch(verb)?;

        self.post_op(verb, effect, result)
    }

    fn pre_op(&self, effect: StackEffect) -> Result<()> {
        match effect.required {
            0 => Ok(()),
            1 if self.tables.is_empty() => Err(TlangError::stack("No tables on the stack.")),
            n if self.tables.len() < n => {
                Err(TlangError::stack("Not enough tables on the stack."))
            }
            _ => Ok(()),
        }
    }

    fn post_op(&mut self, verb: &Verb, effect: StackEffect, result: Option<Table>) -> Result<()> {
        for _ in 0..effect.pops {
            self.tables.pop();
        }
        if let Some(table) = result {
            trace!(rows = table.num_rows(), columns = table.num_columns(), "pushing table");
            self.tables.push(table);
        }
        self.refresh_summary();

        let changes_top = effect.pushes > 0
            || matches!(
                verb,
                Verb::RunScript { .. } | Verb::Pop | Verb::Swap | Verb::Reverse | Verb::Rotate
            );
        let preview = self.config.repl && !self.config.silent && self.calls.depth() == 1;
        if changes_top && preview && !self.tables.is_empty() {
            self.show(Some(self.config.preview_rows))?;
        }

        Ok(())
    }

    fn refresh_summary(&mut self) {
        self.summary = self.tables.first().map(TableSummary::new);
    }

    /// Run the verb. Returns the table to push, if any.
    fn dispatch(&mut self, verb: &Verb) -> Result<Option<Table>> {
        let table = match verb {
            Verb::Read { path } => {
                let path = self.config.resolve_data(path);
                Some(read_csv(&path)?)
            }
            Verb::RunScript { path, bindings } => {
                if self.calls.depth() >= MAX_SCRIPT_DEPTH {
                    return Err(TlangError::stack("Too many nested scripts."));
                }
                let path = self.config.resolve_script(path);
                self.calls.push(bindings.clone());
                let result = self.run_file(&path);
                self.calls.pop();
                result.map_err(|e| e.with_field("script", path.display()))?;
                None
            }
            Verb::Write { path, format } => {
                let top = top_of(&self.tables)?;
                match path {
                    Some(path) => {
                        let path = self.config.resolve_output(path);
                        let format = format.unwrap_or_else(|| OutputFormat::from_path(&path));
                        write_file(top, &path, format)?;
                        info!(path = %path.display(), ?format, "wrote table");
                    }
                    None => write_table(top, format.unwrap_or_default(), &mut self.writer)?,
                }
                None
            }
            Verb::Show { rows } => {
                self.show(*rows)?;
                None
            }
            Verb::Inspect { pattern } => {
                let top = top_of(&self.tables)?;
                let listing = inspect_format(top, pattern.as_deref(), self.config.width);
                write!(self.writer, "{listing}")?;
                None
            }
            Verb::History { count } => {
                for entry in self.history.recent(*count)? {
                    writeln!(self.writer, "{entry}")?;
                }
                None
            }
            Verb::Use { path } => {
                let path = self.config.resolve_script(path);
                let names = self.registry.load_file(&path)?;
                info!(path = %path.display(), functions = ?names, "loaded functions");
                None
            }
            Verb::Duplicate => Some(top_of(&self.tables)?.clone()),
            Verb::Keep { columns } => Some(top_of(&self.tables)?.project(columns)?),
            Verb::Drop { columns } => Some(top_of(&self.tables)?.exclude(columns)?),
            Verb::Rename { pairs } => Some(top_of(&self.tables)?.rename(pairs)?),
            Verb::Alias { pairs } => Some(top_of(&self.tables)?.alias(pairs)?),
            Verb::Select { expr } => {
                let top = top_of(&self.tables)?;
                let columns = top.column_names();
                let compiled = compile(expr, &columns, &mut self.registry)?;
                Some(top.filter(&|row| compiled.eval(row))?)
            }
            Verb::Derive { name, expr } => {
                let top = top_of(&self.tables)?;
                let columns = top.column_names();
                let compiled = compile(expr, &columns, &mut self.registry)?;
                Some(top.derive(name, &|row| compiled.eval(row))?)
            }
            Verb::Sort { keys } => Some(top_of(&self.tables)?.sort(keys)?),
            Verb::First { count } => {
                let top = top_of(&self.tables)?;
                Some(top.head(count.resolve(top.num_rows())))
            }
            Verb::Last { count } => {
                let top = top_of(&self.tables)?;
                Some(top.tail(count.resolve(top.num_rows())))
            }
            Verb::Sample { count } => {
                let top = top_of(&self.tables)?;
                Some(top.sample(count.resolve(top.num_rows()), &mut self.rng))
            }
            Verb::Cast { columns, datatype } => Some(top_of(&self.tables)?.cast(columns, *datatype)?),
            Verb::GroupBy { by, only, aggs } => {
                Some(top_of(&self.tables)?.group_by(by, only.as_deref(), aggs)?)
            }
            Verb::Join(opts) => {
                let (left, right) = self.top_two()?;
                Some(left.join(right, opts)?)
            }
            Verb::Union => {
                let (second, top) = self.top_two()?;
                Some(second.union(top)?)
            }
            Verb::Clear => {
                self.tables.clear();
                None
            }
            Verb::Pop => {
                self.tables.pop();
                None
            }
            Verb::Swap => {
                self.tables.swap();
                None
            }
            Verb::Reverse => {
                self.tables.reverse();
                None
            }
            Verb::Rotate => {
                self.tables.rotate();
                None
            }
        };

        Ok(table)
    }

    /// The second table and the top table, in that order.
    fn top_two(&self) -> Result<(&Table, &Table)> {
        match (self.tables.second(), self.tables.first()) {
            (Some(second), Some(top)) => Ok((second, top)),
            _ => Err(TlangError::stack("Not enough tables on the stack.")),
        }
    }

    fn show(&mut self, rows: Option<usize>) -> Result<()> {
        let top = top_of(&self.tables)?;
        if top.num_rows() == 0 {
            writeln!(self.writer, "This table does not have any rows.")?;
            return Ok(());
        }
        let pretty = pretty_format(top, rows, self.config.width);
        writeln!(self.writer, "{pretty}")?;
        Ok(())
    }
}

fn top_of(tables: &Stack<Table>) -> Result<&Table> {
    tables
        .first()
        .ok_or_else(|| TlangError::stack("No tables on the stack."))
}

#[cfg(test)]
mod tests {
    use tlang_error::ErrorKind;

    use super::*;
    use crate::history::MemoryHistory;
    use crate::table::scalar::ScalarValue;

    const CENSUS: &str = "\
GEOID,County,Total,Black,White
01001,Autauga,100,25,70
01003,Baldwin,250,50,180
01005,Barbour,50,30,18
02013,Aleutians,80,5,40
";

    const COUNTIES: &str = "\
GEOID,Region
01001,North
01003,South
02013,West
";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("census.csv"), CENSUS).unwrap();
            fs::write(dir.path().join("counties.csv"), COUNTIES).unwrap();
            Fixture { dir }
        }

        fn config(&self) -> ProgramConfig {
            ProgramConfig {
                src_dir: Some(self.dir.path().to_path_buf()),
                data_dir: Some(self.dir.path().to_path_buf()),
                output_dir: Some(self.dir.path().to_path_buf()),
                ..Default::default()
            }
        }

        fn program(&self) -> Program<Vec<u8>> {
            Program::with_seed(self.config(), Box::new(MemoryHistory::new()), Vec::new(), 0)
        }
    }

    fn output(program: &Program<Vec<u8>>) -> String {
        String::from_utf8(program.writer().clone()).unwrap()
    }

    #[test]
    fn keep_columns() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program.run_statement("read('census.csv')").unwrap();
        program.run_statement("keep(GEOID, Total)").unwrap();

        let summary = program.summary().unwrap();
        assert_eq!(vec!["GEOID", "Total"], summary.column_names);
        assert_eq!(4, summary.num_rows);
        assert_eq!(1, program.tables().len());
    }

    #[test]
    fn stack_errors_leave_stack_unchanged() {
        let fixture = Fixture::new();
        let mut program = fixture.program();

        let err = program.run_statement("duplicate()").unwrap_err();
        assert_eq!(ErrorKind::Stack, err.kind());
        assert_eq!("No tables on the stack.", err.message());

        program.run_statement("read('census.csv')").unwrap();
        for statement in ["join()", "union()", "swap()"] {
            let err = program.run_statement(statement).unwrap_err();
            assert_eq!(ErrorKind::Stack, err.kind(), "statement: {statement}");
            assert_eq!("Not enough tables on the stack.", err.message());
            assert_eq!(1, program.tables().len());
        }

        let before = program.tables().first().unwrap().clone();
        let err = program.run_statement("keep(nope)").unwrap_err();
        assert_eq!(ErrorKind::Reference, err.kind());
        assert_eq!(Some("keep"), err.get_field("command"));
        assert_eq!(&before, program.tables().first().unwrap());
    }

    #[test]
    fn stack_reordering() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program.run_statement("pop()").unwrap();

        program.run_statement("read('census.csv')").unwrap();
        program.run_statement("read('counties.csv')").unwrap();
        program.run_statement("duplicate()").unwrap();
        assert_eq!(3, program.tables().len());

        program.run_statement("pop()").unwrap();
        program.run_statement("swap()").unwrap();
        assert_eq!(5, program.summary().unwrap().num_columns);

        program.run_statement("rotate()").unwrap();
        assert_eq!(2, program.summary().unwrap().num_columns);

        program.run_statement("clear()").unwrap();
        assert!(program.tables().is_empty());
        assert!(program.summary().is_none());
    }

    #[test]
    fn join_on_shared_column() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program
            .run_source("read('census.csv')\nread('counties.csv')\njoin(how=left)\n")
            .unwrap();

        assert_eq!(1, program.tables().len());
        let top = program.tables().first().unwrap();
        assert_eq!(
            vec!["GEOID", "County", "Total", "Black", "White", "Region"],
            top.column_names()
        );
        assert_eq!(4, top.num_rows());
        assert_eq!(ScalarValue::Null, top.row(2)[5]);
    }

    #[test]
    fn union_puts_top_rows_first() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program
            .run_source("read('census.csv')\nfirst(1)\nread('census.csv')\nlast(1)\nunion()")
            .unwrap();

        let top = program.tables().first().unwrap();
        assert_eq!(ScalarValue::from("02013"), top.row(0)[0]);
        assert_eq!(ScalarValue::from("01001"), top.row(1)[0]);
    }

    #[test]
    fn expressions_with_functions() {
        let fixture = Fixture::new();
        fs::write(
            fixture.dir.path().join("fns.py"),
            "def share(part, whole): part / whole * 100\n",
        )
        .unwrap();

        let mut program = fixture.program();
        program
            .run_source(
                "use('fns.py')
                 read('census.csv')
                 derive(pct, share(Black, Total) + share(White, Total))
                 select(pct < 94)
                 sort((Total, DESC))",
            )
            .unwrap();

        let top = program.tables().first().unwrap();
        assert_eq!(2, top.num_rows());
        assert_eq!(ScalarValue::from("Baldwin"), top.row(0)[1]);
        assert_eq!(ScalarValue::from("Aleutians"), top.row(1)[1]);
    }

    #[test]
    fn nested_script_binds_arguments() {
        logutil::init_test();

        let fixture = Fixture::new();
        fs::write(
            fixture.dir.path().join("pct.t"),
            "derive(args.demo _pct, args.demo / Total * 100)\nkeep(GEOID, args.demo _pct)\n",
        )
        .unwrap();

        let mut program = fixture.program();
        program.run_statement("read('census.csv')").unwrap();
        program.run_statement("from('pct.t', demo=Black)").unwrap();

        assert_eq!(vec!["GEOID", "Black_pct"], program.summary().unwrap().column_names);
        assert_eq!(1, program.calls().depth());

        // The namespace is popped on errors too.
        let err = program.run_statement("from('pct.t')").unwrap_err();
        assert_eq!(ErrorKind::Binding, err.kind());
        assert!(err.get_field("script").is_some());
        assert_eq!(1, program.calls().depth());

        // The line reported is the one inside the nested script.
        let err = program.run_source("first(2)\nfrom('pct.t')").unwrap_err();
        assert_eq!(Some("1"), err.get_field("line"));
        assert_eq!(1, err.fields().filter(|(k, _)| *k == "line").count());
    }

    #[test]
    fn recursive_script_stops() {
        let fixture = Fixture::new();
        fs::write(fixture.dir.path().join("loop.t"), "from('loop.t')\n").unwrap();

        let mut program = fixture.program();
        let err = program.run_statement("from('loop.t')").unwrap_err();
        assert_eq!(ErrorKind::Stack, err.kind());
        assert_eq!(1, program.calls().depth());
    }

    #[test]
    fn write_outputs() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program
            .run_source("read('counties.csv')\nfirst(1)\nwrite()\nwrite('out.json')")
            .unwrap();
        assert_eq!("GEOID,Region\n01001,North\n", output(&program));

        let json = fs::read_to_string(fixture.dir.path().join("out.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!("North", value[0]["Region"]);
    }

    #[test]
    fn show_and_inspect() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program.run_source("read('census.csv')\nshow(2)\ninspect('Tot')").unwrap();

        let out = output(&program);
        assert!(out.contains("Autauga"));
        assert!(out.contains("4 rows (2 shown)"));
        assert!(out.contains("# rows: 4"));

        let mut program = fixture.program();
        program.run_source("read('census.csv')\nselect(Total > 1000)\nshow()").unwrap();
        assert!(output(&program).contains("This table does not have any rows."));
    }

    #[test]
    fn repl_previews_results() {
        let fixture = Fixture::new();
        let config = ProgramConfig {
            repl: true,
            ..fixture.config()
        };
        let mut program =
            Program::with_seed(config, Box::new(MemoryHistory::new()), Vec::new(), 0);
        program.run_statement("read('census.csv')").unwrap();
        assert!(output(&program).contains("Autauga"));

        program.config_mut().silent = true;
        program.writer_mut().clear();
        program.run_statement("first(1)").unwrap();
        assert!(output(&program).is_empty());
    }

    #[test]
    fn sample_rows() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program.run_source("read('census.csv')\nsample(50%)").unwrap();
        assert_eq!(2, program.summary().unwrap().num_rows);

        program.run_statement("sample(10)").unwrap();
        assert_eq!(2, program.summary().unwrap().num_rows);
    }

    #[test]
    fn history_verb() {
        let fixture = Fixture::new();
        let mut program = fixture.program();
        program.history_mut().record("read('census.csv')").unwrap();
        program.history_mut().record("show()").unwrap();
        program.run_statement("history(1)").unwrap();
        assert_eq!("002 show()\n", output(&program));
    }
}
