use clap::Parser as ClapParser;
use std::{
    fs,
    io::{self, Read, Write},
    process,
};

use wsvm::{
    Diagnostics, ErrorPolicy, LabelResolution, Outcome, Runner, RunnerSettings, StdConsole,
    encode, parse,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Program to run; reads standard input when omitted
    #[arg(help = "The whitespace source file to execute")]
    file: Option<String>,

    /// Stop at the first runtime fault
    #[arg(long, help = "Abort on the first runtime error instead of continuing")]
    strict: bool,

    /// Only bind labels once their mark has executed
    #[arg(long, help = "Bind labels when their mark executes")]
    lazy_labels: bool,

    /// Print the instruction listing instead of executing
    #[arg(long, help = "Dump the parsed instructions")]
    dump_ir: bool,

    /// Re-encode the parsed program with comments stripped
    #[arg(long, help = "Write the canonical encoding of the program")]
    emit: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_source(file: Option<&str>) -> io::Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path),
        None => {
            let mut source = Vec::new();
            io::stdin().lock().read_to_end(&mut source)?;
            Ok(source)
        }
    }
}

fn report(diagnostics: &Diagnostics) {
    let mut stderr = io::stderr().lock();
    for diagnostic in diagnostics {
        let _ = writeln!(stderr, "{diagnostic}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = match read_source(cli.file.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            let name = cli.file.as_deref().unwrap_or("<stdin>");
            eprintln!("Error reading '{}': {}", name, err);
            process::exit(1);
        }
    };

    let mut diagnostics = Diagnostics::new();
    let program = parse(&source, &mut diagnostics);
    log::debug!("parsed {} instructions", program.len());

    if cli.dump_ir || cli.emit {
        let mut stdout = io::stdout().lock();
        let written = if cli.dump_ir {
            write!(stdout, "{program}")
        } else {
            stdout.write_all(&encode(program.instructions()))
        };
        report(&diagnostics);
        if let Err(err) = written.and_then(|()| stdout.flush()) {
            eprintln!("Error writing output: {}", err);
            process::exit(1);
        }
        process::exit(i32::from(diagnostics.has_errors()));
    }

    let settings = RunnerSettings {
        policy: if cli.strict {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Lenient
        },
        labels: if cli.lazy_labels {
            LabelResolution::OnMark
        } else {
            LabelResolution::Eager
        },
        ..Default::default()
    };

    let mut runner = Runner::new(&program, StdConsole::stdio(), settings);
    let outcome = runner.run();
    if let Outcome::Aborted { pc } = outcome {
        log::debug!("aborted at instruction {pc}");
    }
    let (_, runtime, _) = runner.into_parts();
    diagnostics.extend(runtime);

    report(&diagnostics);
    if diagnostics.has_errors() {
        process::exit(1);
    }
}
