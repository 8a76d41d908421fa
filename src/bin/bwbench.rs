//! Benchmark driver.
//!
//! Exit status: 0 on success, 1 on configuration errors, fatal measurement
//! errors, or a failed correctness validation.

use std::process::ExitCode;

use bwbench::affinity::CpuPinGuard;
use bwbench::allocate::DataInit;
use bwbench::check;
use bwbench::cli::{self, BenchConfig, Parsed};
use bwbench::error::BenchError;
use bwbench::kernels::ExecMode;
use bwbench::measure::{run_fixed, MeasurementContext};
use bwbench::profile::{NoopMarker, RegionMarker, RegionTally};
use bwbench::report::{self, DatFileSink};
use bwbench::sweep::run_sweep;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match cli::parse(&args) {
        Ok(Parsed::Help) => {
            print!("{}", cli::HELPTEXT);
            return ExitCode::SUCCESS;
        }
        Ok(Parsed::Run(config)) => config,
        Err(message) => {
            eprintln!("bwbench: {message}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("bwbench: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the run completed but its validation failed.
fn run(config: &BenchConfig) -> Result<bool, BenchError> {
    if config.device.is_some() {
        eprintln!("bwbench: warning: no accelerator support in this build, ignoring -d");
    }

    let marker: Box<dyn RegionMarker> = if config.verbose {
        Box::new(RegionTally::new())
    } else {
        Box::new(NoopMarker)
    };

    let mut ctx = MeasurementContext::new(
        config.n,
        config.mode,
        config.simd,
        config.threading,
        config.init,
        bwbench::allocate::INIT_SCALAR,
        config.reps,
        marker,
    )?;

    report::print_header();
    report::print_datasize(config.n);
    if config.verbose {
        report::print_verbose_preamble(config.n, &ctx.clock);
        if let Some(core) = bwbench::affinity::current_core() {
            println!("Main thread running on processor {core}");
        }
    }

    // Parallel workers pin themselves per invocation; a sequential run pins
    // the one measuring thread for its whole duration.
    let _pin = (config.mode == ExecMode::Sequential && config.threading.pin)
        .then(CpuPinGuard::new);

    let validated = if config.sweep {
        let mut sink = DatFileSink::new(&config.results_dir)?;
        run_sweep(&mut ctx, config.n, &mut sink)?;
        true
    } else {
        ctx.reinit(config.n);
        let results = run_fixed(&mut ctx, config.n)?;
        report::print_table(&results);

        match config.init {
            DataInit::Constant => {
                match check::verify(&ctx.vectors, config.n, ctx.scalar, ctx.events()) {
                    Ok(()) => {
                        println!("Solution Validates");
                        true
                    }
                    Err(err) => {
                        eprintln!("bwbench: {err}");
                        eprintln!("bwbench: results above are untrusted");
                        false
                    }
                }
            }
            DataInit::Random => true,
        }
    };

    if config.verbose {
        report::print_region_summary(&ctx.marker_summary());
    }

    Ok(validated)
}
