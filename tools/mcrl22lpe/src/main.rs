use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::process::ExitCode;

use anyhow::{Context, Result as AnyResult};
use clap::Parser;

use mcrl2rust_aterm::TermPool;
use mcrl2rust_io::{read_term, write_term, FileType};
use mcrl2rust_lin::{linearise, LinMethod, LinOptions, RewriteStrategy};

#[derive(Parser, Debug)]
#[command(
    name = "mcrl22lpe",
    about = "Transforms an mCRL2 process specification into a linear process equation",
    long_about = "Reads a process specification term, linearises it and writes the resulting \
                  linear process specification. The input is either a binary term file or the \
                  textual representation of the specification term."
)]
pub struct Cli {
    /// The specification to linearise.
    input: String,

    /// The file to write the result to; standard output when absent.
    output: Option<String>,

    /// The linearisation method.
    #[arg(long, value_parser = parse_lin_method, default_value = "regular")]
    lin_method: LinMethod,

    /// Apply clustering to the final result.
    #[arg(long)]
    cluster: bool,

    /// Skip the intermediate clustering of the sequential processes.
    #[arg(long)]
    no_cluster: bool,

    /// Encode the control state as a positive number instead of an
    /// enumerated sort.
    #[arg(long)]
    oldstate: bool,

    /// Encode the control state as a tuple of booleans.
    #[arg(long)]
    binary: bool,

    /// Do not apply sum elimination.
    #[arg(long)]
    no_sumelm: bool,

    /// Derive the names of state constants from process names.
    #[arg(long)]
    statenames: bool,

    /// Do not use the rewriter during linearisation.
    #[arg(long)]
    no_rewrite: bool,

    /// Do not leave free data variables in the result.
    #[arg(long)]
    no_freevars: bool,

    /// Do not eliminate subsumed deadlock summands.
    #[arg(long)]
    no_deltaelm: bool,

    /// The rewrite strategy used to simplify conditions.
    #[arg(long, value_parser = parse_strategy, default_value = "compact")]
    strategy: RewriteStrategy,

    /// Write the result as a textual term instead of a binary stream.
    #[arg(long)]
    text: bool,
}

fn parse_lin_method(text: &str) -> Result<LinMethod, String> {
    match text {
        "stack" => Ok(LinMethod::Stack),
        "regular" => Ok(LinMethod::Regular),
        "regular2" => Ok(LinMethod::Regular2),
        _ => Err(format!("unknown linearisation method {text}")),
    }
}

fn parse_strategy(text: &str) -> Result<RewriteStrategy, String> {
    match text {
        "innermost" => Ok(RewriteStrategy::Innermost),
        "compact" => Ok(RewriteStrategy::Compact),
        _ => Err(format!("unknown rewrite strategy {text}")),
    }
}

impl Cli {
    fn options(&self) -> LinOptions {
        LinOptions {
            lin_method: self.lin_method,
            final_cluster: self.cluster,
            no_intermediate_cluster: self.no_cluster,
            newstate: !self.oldstate,
            binary: self.binary,
            nosumelm: self.no_sumelm,
            statenames: self.statenames,
            norewrite: self.no_rewrite,
            nofreevars: self.no_freevars,
            nodeltaelimination: self.no_deltaelm,
            strategy: self.strategy,
        }
    }
}

fn run(cli: &Cli) -> AnyResult<()> {
    let mut tp = TermPool::new();

    // Try the binary stream first and fall back to the textual form.
    let specification = {
        let file = File::open(&cli.input).with_context(|| format!("cannot open {}", cli.input))?;
        match read_term(&mut BufReader::new(file), &mut tp) {
            Ok((term, _)) => term,
            Err(_) => {
                let text = fs::read_to_string(&cli.input)
                    .with_context(|| format!("cannot read {}", cli.input))?;
                tp.from_string(&text)
                    .with_context(|| format!("{} does not contain a specification term", cli.input))?
            }
        }
    };

    let result = linearise(&mut tp, &specification, cli.options())?;

    match &cli.output {
        Some(path) => {
            if cli.text {
                fs::write(path, format!("{}\n", result.spec))
                    .with_context(|| format!("cannot write {path}"))?;
            } else {
                let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
                write_term(
                    &mut BufWriter::new(file),
                    &result.spec,
                    true,
                    "mcrl22lpe",
                    &FileType::Mcrl2,
                )?;
            }
        }
        None => {
            println!("{}", result.spec);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("mcrl22lpe: {error:#}");
            ExitCode::FAILURE
        }
    }
}
