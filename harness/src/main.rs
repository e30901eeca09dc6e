//! Wires `hal-sim` + `kernel` + `test-programs` together behind a small CLI:
//! a positional test name plus independent verbosity overrides for the
//! scheduler, memory, and other tracer streams.

use std::sync::Arc;

use clap::{Parser, ValueEnum};

use hal_sim::{entry_addr, ConsoleTracer, HalSim};
use kernel::config::{DEFAULT_PRIORITY, PHYS_FRAMES};
use kernel::tracer::Verbosity;
use kernel::Kernel;

#[derive(Clone, Copy, ValueEnum)]
enum VerbosityArg {
    Full,
    Limited,
    None,
}

impl From<VerbosityArg> for Verbosity {
    fn from(v: VerbosityArg) -> Self {
        match v {
            VerbosityArg::Full => Verbosity::Full,
            VerbosityArg::Limited => Verbosity::Limited,
            VerbosityArg::None => Verbosity::None,
        }
    }
}

/// Run one test-program entry point against the simulated kernel.
#[derive(Parser)]
struct Args {
    /// Name of the initial process's entry point (test0..test2g).
    test_name: String,

    /// Override the "other" tracer stream's verbosity (Create/Done/AllDone/Interrupt).
    #[arg(long)]
    other: Option<VerbosityArg>,

    /// Override the scheduler tracer stream's verbosity.
    #[arg(long)]
    scheduler: Option<VerbosityArg>,

    /// Override the memory tracer stream's verbosity.
    #[arg(long)]
    memory: Option<VerbosityArg>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let Some(entry) = test_programs::find(&args.test_name) else {
        eprintln!("unknown test name: {}", args.test_name);
        std::process::exit(1);
    };

    let other = args.other.map(Verbosity::from).unwrap_or(entry.other);
    let scheduler = args.scheduler.map(Verbosity::from).unwrap_or(entry.scheduler);
    let memory = args.memory.map(Verbosity::from).unwrap_or(entry.memory);

    let hal = HalSim::new();
    let tracer = Arc::new(ConsoleTracer::new(scheduler, memory, other));
    let kernel = Arc::new(Kernel::new(hal.clone(), tracer, PHYS_FRAMES));
    hal.bind_kernel(Arc::downgrade(&kernel));

    kernel
        .create(entry.name, entry_addr(entry.entry), DEFAULT_PRIORITY)
        .expect("harness: failed to create the initial process");

    kernel.bootstrap();
}
