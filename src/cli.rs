//! Command-line parsing and run configuration.

use std::path::PathBuf;

use crate::allocate::DataInit;
use crate::kernels::{ExecMode, SimdPolicy, Threading};

pub const DEFAULT_SIZE: usize = 125_000_000;
pub const DEFAULT_SWEEP_MAX: usize = 8_000_000;
pub const DEFAULT_REPS: usize = 10;
pub const DEFAULT_RESULTS_DIR: &str = "results";

pub const HELPTEXT: &str = "\
Usage: bwbench [options]

Options:
  -h              Show this help text
  -m <type>       Benchmark type, can be ws (default), tp, or seq
  -s <elements>   Vector length in elements (sweep mode: maximum length)
  -n <count>      Number of repetitions per kernel (minimum 2)
  -i <type>       Data initialization type, can be constant, or random
  -t <threads>    Worker threads for tp and ws modes
  -d <int>        Accelerator device id (accepted for compatibility)
  -S              Memory-hierarchy sweep, one .dat file per kernel
  -o <dir>        Results directory for sweep output
  -v              Verbose output
";

/// Fully resolved run configuration.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub mode: ExecMode,
    pub simd: SimdPolicy,
    /// Fixed-mode problem size, or the sweep maximum in sweep mode.
    pub n: usize,
    pub reps: usize,
    pub init: DataInit,
    pub threading: Threading,
    pub device: Option<usize>,
    pub sweep: bool,
    pub results_dir: PathBuf,
    pub verbose: bool,
}

pub enum Parsed {
    Help,
    Run(BenchConfig),
}

/// Parse command-line arguments (without the program name).
///
/// Errors carry the diagnostic to print before exiting with a non-zero
/// status.
pub fn parse(args: &[String]) -> Result<Parsed, String> {
    let mut mode = ExecMode::Worksharing;
    let mut size: Option<usize> = None;
    let mut reps = DEFAULT_REPS;
    let mut init = DataInit::Constant;
    let mut threads = default_threads();
    let mut device = None;
    let mut sweep = false;
    let mut results_dir = PathBuf::from(DEFAULT_RESULTS_DIR);
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-m" => {
                mode = match value(args, &mut i, "-m")? {
                    "ws" => ExecMode::Worksharing,
                    "tp" => ExecMode::Throughput,
                    "seq" => ExecMode::Sequential,
                    other => return Err(format!("unknown bench type {other}")),
                };
            }
            "-s" => {
                let v = value(args, &mut i, "-s")?;
                let n: usize = v
                    .parse()
                    .map_err(|_| format!("invalid numeric value for -s: {v}"))?;
                if n == 0 {
                    return Err("vector length must be positive".to_string());
                }
                size = Some(n);
            }
            "-n" => {
                let v = value(args, &mut i, "-n")?;
                reps = v
                    .parse()
                    .map_err(|_| format!("invalid numeric value for -n: {v}"))?;
                if reps < 2 {
                    return Err(
                        "repetition count must be at least 2 (the first sample is discarded)"
                            .to_string(),
                    );
                }
            }
            "-i" => {
                init = match value(args, &mut i, "-i")? {
                    "constant" => DataInit::Constant,
                    "random" => DataInit::Random,
                    other => {
                        return Err(format!("invalid data initialization type {other}"))
                    }
                };
            }
            "-t" => {
                let v = value(args, &mut i, "-t")?;
                threads = v
                    .parse()
                    .map_err(|_| format!("invalid numeric value for -t: {v}"))?;
                if threads == 0 {
                    return Err("thread count must be positive".to_string());
                }
            }
            "-d" => {
                let v = value(args, &mut i, "-d")?;
                let id: usize = v
                    .parse()
                    .map_err(|_| format!("invalid device id: {v}"))?;
                device = Some(id);
            }
            "-S" => sweep = true,
            "-o" => results_dir = PathBuf::from(value(args, &mut i, "-o")?),
            "-v" => verbose = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{other}'"));
            }
            other => {
                return Err(format!("non-option argument {other}"));
            }
        }
        i += 1;
    }

    let n = size.unwrap_or(if sweep { DEFAULT_SWEEP_MAX } else { DEFAULT_SIZE });

    Ok(Parsed::Run(BenchConfig {
        mode,
        simd: SimdPolicy::build_default(),
        n,
        reps,
        init,
        threading: Threading {
            threads,
            pin: true,
        },
        device,
        sweep,
        results_dir,
        verbose,
    }))
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("option {flag} requires an argument"))
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
