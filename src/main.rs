//! plainc CLI - Plain to Python compiler and REPL

use anyhow::{Context, Result};
use clap::Parser;
use plainc::diagnostics::PlainDiagnostic;
use plainc::runner::{FragmentOutcome, PythonRunner, ReplWorker};
use plainc::{CompileError, CompileOptions, CompiledUnit, Session};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Words that leave a header line waiting for an indented block
const BLOCK_OPENERS: &[&str] = &["then", "do", "otherwise", "else", "try", "finally", "forever"];

/// plainc - compile natural-English Plain programs to Python
#[derive(Parser, Debug)]
#[command(name = "plainc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile Plain source to Python", long_about = None)]
struct Cli {
    /// Input Plain file; starts the REPL when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output Python file (default: <INPUT>.py)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Run the generated Python instead of writing it
    #[arg(short, long)]
    run: bool,

    /// Check only (don't generate output)
    #[arg(short, long)]
    check: bool,

    /// Also write the line map as <OUTPUT>.map.json
    #[arg(long)]
    line_map: bool,

    /// Emit JSON diagnostics to stderr (on failure only)
    #[arg(long)]
    diag_json: bool,

    /// Show debug information
    #[arg(short, long)]
    debug: bool,

    /// Spaces per indentation level in the generated Python
    #[arg(long, value_name = "N", default_value_t = plainc::emitter::DEFAULT_INDENT_WIDTH)]
    indent: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = CompileOptions {
        indent_width: cli.indent,
    };

    if cli.debug {
        println!("[DEBUG] Input: {:?}", cli.input);
        println!("[DEBUG] Output: {:?}", cli.output);
        println!("[DEBUG] Indent width: {}", options.indent_width);
    }

    match cli.input.clone() {
        Some(input) => compile_input(&cli, &input, &options),
        None => repl(&cli, options),
    }
}

fn compile_input(cli: &Cli, input: &Path, options: &CompileOptions) -> Result<()> {
    let unit = match read_and_compile(input, options) {
        Ok(unit) => unit,
        Err(err) => report(cli, &PlainDiagnostic::from_error(&err, Some(input))),
    };

    if cli.debug {
        println!("[DEBUG] Generated Python ({} lines):", unit.python.lines().count());
        print!("{}", unit.python);
        println!("[DEBUG] Line map entries: {}", unit.line_map.len());
    }

    if cli.check {
        println!("✅ Compilation successful!");
        return Ok(());
    }

    if cli.run {
        let runner = PythonRunner::detect()?;
        if cli.debug {
            println!("[DEBUG] Interpreter: {}", runner.interpreter());
        }
        let output = runner.run(&unit.python, &unit.line_map)?;
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        std::process::exit(output.status.unwrap_or(1));
    }

    let output_path = cli.output.clone().unwrap_or_else(|| default_output(input));
    std::fs::write(&output_path, &unit.python)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    println!("✅ Compiled to: {output_path:?}");

    if cli.line_map {
        let map_path = output_path.with_extension("map.json");
        std::fs::write(&map_path, unit.line_map.to_json()?)
            .with_context(|| format!("failed to write {}", map_path.display()))?;
        println!("   Line map: {map_path:?}");
    }

    Ok(())
}

fn read_and_compile(input: &Path, options: &CompileOptions) -> plainc::Result<CompiledUnit> {
    let source = plainc::read_source(input)?;
    let name = input.display().to_string();
    plainc::compile_with_options(&source, options).map_err(|err| err.in_file(&name))
}

/// Print the diagnostic and exit with status 1
fn report(cli: &Cli, diag: &PlainDiagnostic) -> ! {
    print!("{}", diag.to_text());
    if cli.diag_json {
        eprintln!("{}", diag.to_json());
    }
    std::process::exit(1);
}

/// Same file name with a `.py` suffix, in the current directory
fn default_output(input: &Path) -> PathBuf {
    let mut p = input.to_path_buf();
    p.set_extension("py");
    match p.file_name() {
        Some(filename) => PathBuf::from(filename),
        None => p,
    }
}

// -------------------------------------------------------------------
// REPL
// -------------------------------------------------------------------

fn repl(cli: &Cli, options: CompileOptions) -> Result<()> {
    let mut session = Session::with_options(options);
    let mut verbose = cli.debug;
    let mut worker = match PythonRunner::detect().and_then(|runner| ReplWorker::spawn(&runner, session.id())) {
        Ok(worker) => Some(worker),
        Err(err) => {
            eprintln!("warning: {err}; fragments will be compiled but not run");
            None
        }
    };

    println!("Plain {} (type 'exit' to leave)", env!("CARGO_PKG_VERSION"));
    if cli.debug {
        println!("[DEBUG] Session: {}", session.id());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let Some(fragment) = read_fragment(&mut lines)? else {
            break;
        };
        let command = fragment.trim();
        match command {
            "" => continue,
            "exit" | "quit" | "q" => break,
            "verbose" => {
                verbose = !verbose;
                println!("verbose {}", if verbose { "on" } else { "off" });
                continue;
            }
            "reset" => {
                session.reset();
                if let Some(worker) = worker.as_mut() {
                    worker.reset()?;
                }
                println!("session cleared");
                continue;
            }
            "history" => {
                print_history(&session);
                continue;
            }
            _ => {}
        }

        let unit = match plainc::compile_incremental(&mut session, &fragment) {
            Ok(unit) => unit,
            Err(err) => {
                show_error(cli, &err);
                continue;
            }
        };

        if verbose {
            print!("{}", unit.python);
        }
        let Some(worker) = worker.as_mut() else {
            if !verbose {
                print!("{}", unit.python);
            }
            continue;
        };

        let mut answer = |pending: &str, prompt: &str| read_input(&mut lines, pending, prompt);
        let output = worker.execute(&unit.python, &unit.line_map, &mut answer)?;
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        if let FragmentOutcome::Exited { code } = output.outcome {
            if cli.debug {
                println!("[DEBUG] Program exited with status {code}");
            }
            break;
        }
    }

    Ok(())
}

/// Answer an `input()` call in a fragment from the REPL's own stdin
fn read_input(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    pending: &str,
    prompt: &str,
) -> Option<String> {
    print!("{pending}{prompt}");
    io::stdout().flush().ok()?;
    lines.next()?.ok()
}

/// Read one line, or a block if the first line opens one
fn read_fragment(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<Option<String>> {
    prompt(">>> ")?;
    let Some(first) = lines.next().transpose()? else {
        return Ok(None);
    };
    if !opens_block(&first) {
        return Ok(Some(first));
    }

    let mut fragment = first;
    loop {
        prompt("... ")?;
        match lines.next().transpose()? {
            Some(line) if !line.trim().is_empty() => {
                fragment.push('\n');
                fragment.push_str(&line);
            }
            _ => break,
        }
    }
    Ok(Some(fragment))
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    io::stdout().flush()?;
    Ok(())
}

fn opens_block(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.ends_with(':') {
        return true;
    }
    trimmed
        .rsplit(char::is_whitespace)
        .next()
        .is_some_and(|last| BLOCK_OPENERS.iter().any(|w| last.eq_ignore_ascii_case(w)))
}

fn show_error(cli: &Cli, err: &CompileError) {
    let diag = PlainDiagnostic::from_error(err, None);
    print!("{}", diag.to_text());
    if cli.diag_json {
        eprintln!("{}", diag.to_json());
    }
}

fn print_history(session: &Session) {
    for (i, record) in session.history().iter().enumerate() {
        let first_line = record.source.lines().next().unwrap_or("");
        match (&record.rejected_after, &record.error) {
            (Some(stage), Some(error)) => {
                println!("[{:03}] {:?} after {:?}: {}  ({})", i, record.stage, stage, first_line, error)
            }
            _ => println!("[{:03}] {:?}: {}", i, record.stage, first_line),
        }
    }
}
