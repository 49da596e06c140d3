use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::config::Config;
use crate::executor::{
    ChannelHandle, DebugEvent, Outcome, Runtime, RuntimeBuilder, Scheduler, Value,
};
use crate::parser;
use crate::program::ProgramFile;

#[derive(Parser)]
#[command(name = "pseudo")]
#[command(about = "Pseudo - parser and bytecode runtime for a teaching language", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a source file and print its syntax tree
    Parse {
        /// Source file
        file: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a compiled program (.json or .toml function table)
    Run {
        /// Program file
        program: PathBuf,

        /// Honor breakpoints; press Enter to resume
        #[arg(long)]
        debug: bool,

        /// Entry function (default: $main)
        #[arg(long)]
        entry: Option<String>,

        /// Operations per scheduler tick
        #[arg(long)]
        steps_per_tick: Option<usize>,

        /// Run without yielding (breakpoints end the run)
        #[arg(long)]
        run_to_completion: bool,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Parse { file, json } => parse_file(&file, json),

        Commands::Run {
            program,
            debug,
            entry,
            steps_per_tick,
            run_to_completion,
        } => {
            let config = Config::builder()
                .config_path(cli.config)
                .entry(entry)
                .steps_per_tick(steps_per_tick)
                .debug(debug.then_some(true))
                .build()
                .context("Failed to load configuration")?;
            run_program(&program, &config, run_to_completion).await
        }
    }
}

fn parse_file(path: &Path, json: bool) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let program = match parser::parse(&source) {
        Ok(program) => program,
        Err(err) => bail!("{}: {}", path.display(), err),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&program)?);
    } else {
        println!("{:#?}", program);
    }
    Ok(())
}

/// Host natives registered next to the stdlib
fn host_natives(builder: RuntimeBuilder) -> RuntimeBuilder {
    builder.native("output", ["X"], |runtime: &mut Runtime, args: Vec<Value>| {
        for value in &args {
            println!("{value}");
        }
        runtime.push(&Value::null());
        Ok(())
    })
}

async fn run_program(path: &Path, config: &Config, run_to_completion: bool) -> Result<()> {
    let program = ProgramFile::load(path)
        .with_context(|| format!("Failed to load program {}", path.display()))?;
    let settings = &config.runtime;

    let (handle, mut events) = ChannelHandle::new();
    let builder = Runtime::builder(program.into_function_table())
        .with_stdlib()
        .debug_mode(settings.debug)
        .handle(handle);
    let mut runtime = host_natives(builder).build();

    if run_to_completion {
        let outcome = runtime.run_main(&settings.entry)?;
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        return finish(outcome);
    }

    let (scheduler, control) =
        Scheduler::new(runtime, settings.steps_per_tick, settings.tick_interval());
    let entry = settings.entry.clone();
    let task = tokio::spawn(async move { scheduler.run_main(&entry).await });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Some(event) = events.recv().await {
        print_event(&event);
        match event {
            DebugEvent::Paused { .. } => {
                if let Some(vars) = control.variables().await {
                    println!("{}", serde_json::to_string_pretty(&vars)?);
                }
                println!("Press Enter to resume");
                if stdin.next_line().await?.is_none() {
                    debug!("stdin closed, stopping");
                    control.stop();
                    break;
                }
                control.resume();
            }
            DebugEvent::Resumed => {}
            DebugEvent::Error(_) | DebugEvent::Exited => break,
        }
    }

    let exit = task.await.context("Scheduler task panicked")??;
    finish(exit.outcome)
}

fn print_event(event: &DebugEvent) {
    match event {
        DebugEvent::Paused { line } => println!("Paused at line {line}"),
        DebugEvent::Resumed => println!("Resumed"),
        DebugEvent::Error(report) => eprintln!("{report}"),
        DebugEvent::Exited => info!("program exited"),
    }
}

fn finish(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Finished | Outcome::Stopped => Ok(()),
        Outcome::Halted => bail!("Execution halted"),
        Outcome::Paused => bail!("Execution paused at a breakpoint (run without --run-to-completion to resume)"),
        Outcome::Yielded => bail!("Execution did not finish"),
    }
}
