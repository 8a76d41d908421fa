//! Console and file output of measurement results.

use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use terminal_size::{terminal_size, Width};

use crate::allocate::{Vectors, BYTES_PER_WORD};
use crate::kernels::KernelDescriptor;
use crate::measure::KernelMeasurement;
use crate::profile::RegionSummary;
use crate::sweep::{SweepPoint, SweepSink};
use crate::timing::WallClock;

/// Classic report width; narrower terminals shrink the rules.
const TABLE_WIDTH: usize = 76;

fn rule_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => (w as usize).clamp(40, TABLE_WIDTH),
        None => TABLE_WIDTH,
    }
}

pub fn hline() -> String {
    "-".repeat(rule_width())
}

pub fn print_header() {
    println!("{}", hline());
    println!("bwbench {}", env!("CARGO_PKG_VERSION"));
}

/// Allocation preamble: total working-set size, KB below one MB.
pub fn print_datasize(n: usize) {
    println!("{}", hline());
    let bytes = Vectors::footprint_bytes(n) as f64;
    if bytes < 1.0e6 {
        println!("Total allocated datasize: {:8.2} KB", bytes * 1.0e-3);
    } else {
        println!("Total allocated datasize: {:8.2} MB", bytes * 1.0e-6);
    }
}

/// Extra preamble for `-v`: per-kernel traffic and the observed clock
/// resolution.
pub fn print_verbose_preamble(n: usize, clock: &WallClock) {
    for desc in crate::kernels::KERNELS.iter() {
        println!(
            "\t{:<8} {:8.2} MB",
            desc.label,
            (desc.words * BYTES_PER_WORD * n) as f64 * 1.0e-6
        );
    }
    println!("Timer resolution {:.2e} s", clock.resolution());
}

/// Fixed-size result table, one row per kernel.
pub fn print_table(results: &[KernelMeasurement]) {
    println!("{}", hline());
    println!("Function      Rate(MB/s)  Rate(MFlop/s)  Avg time     Min time     Max time");

    for r in results {
        let label = format!("{}:", r.kernel.label());
        let bandwidth = match r.bandwidth {
            Some(bw) => format!("{:11.2}", bw * 1.0e-6),
            None => format!("{:>11}", "-"),
        };
        let flop_rate = match r.flop_rate {
            Some(fr) => format!("{:11.2}", fr * 1.0e-6),
            None => format!("{:>11}", "-"),
        };
        println!(
            "{:<12}{} {}   {:11.4}  {:11.4}  {:11.4}",
            label, bandwidth, flop_rate, r.stats.avg, r.stats.min, r.stats.max
        );
    }
    println!("{}", hline());
}

pub fn print_region_summary(rows: &[RegionSummary]) {
    if rows.is_empty() {
        return;
    }
    println!("{}", hline());
    println!("Region          Calls     Time(s)");
    for row in rows {
        println!("{:<12} {:>8} {:11.4}", row.region, row.calls, row.seconds);
    }
    println!("{}", hline());
}

/// Sweep result sink writing one `<label>.dat` file per kernel.
pub struct DatFileSink {
    dir: PathBuf,
    file: Option<BufWriter<File>>,
}

impl DatFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)?;
        Ok(Self { dir, file: None })
    }

    fn path_for(&self, desc: &KernelDescriptor) -> PathBuf {
        self.dir.join(format!("{}.dat", desc.label.to_lowercase()))
    }
}

impl SweepSink for DatFileSink {
    fn begin_kernel(&mut self, desc: &'static KernelDescriptor) -> io::Result<()> {
        let path = self.path_for(desc);
        println!("{}: writing {}", desc.label, path.display());

        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "# {} sweep", desc.label)?;
        writeln!(
            file,
            "# {} words and {} flops per element, times in seconds",
            desc.words, desc.flops
        )?;
        writeln!(
            file,
            "# N  datasize(MB)  rate(GB/s)  rate(GFlop/s)  avg  min  max"
        )?;
        self.file = Some(file);
        Ok(())
    }

    fn point(
        &mut self,
        desc: &'static KernelDescriptor,
        point: &SweepPoint,
    ) -> io::Result<()> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Err(io::Error::other("sweep point emitted before begin_kernel")),
        };

        let datasize = (desc.words * BYTES_PER_WORD * point.n) as f64 * 1.0e-6;
        let bandwidth = match point.bandwidth {
            Some(bw) => format!("{:.2}", bw * 1.0e-9),
            None => "-".to_string(),
        };
        let flop_rate = match point.flop_rate {
            Some(fr) => format!("{:.2}", fr * 1.0e-9),
            None => "-".to_string(),
        };

        writeln!(
            file,
            "{} {:.6} {} {} {:.6} {:.6} {:.6}",
            point.n, datasize, bandwidth, flop_rate, point.stats.avg, point.stats.min,
            point.stats.max
        )
    }

    fn finish_kernel(&mut self, _desc: &'static KernelDescriptor) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::KernelId;
    use crate::measure::AggregateStats;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bwbench-test-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_dat_sink_writes_header_and_rows() {
        let dir = temp_dir("dat");
        let mut sink = DatFileSink::new(&dir).unwrap();
        let desc = KernelId::Triad.descriptor();

        sink.begin_kernel(desc).unwrap();
        for n in [100, 120] {
            sink.point(
                desc,
                &SweepPoint {
                    n,
                    iter: 1000,
                    stats: AggregateStats {
                        avg: 0.2,
                        min: 0.1,
                        max: 0.3,
                    },
                    bandwidth: Some(2.4e9),
                    flop_rate: Some(2.0e9),
                },
            )
            .unwrap();
        }
        sink.finish_kernel(desc).unwrap();

        let contents = std::fs::read_to_string(dir.join("triad.dat")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('#'));
        assert!(lines[2].starts_with('#'));
        assert!(lines[3].starts_with("100 "));
        assert!(lines[3].contains("2.40"));
        assert!(lines[4].starts_with("120 "));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dat_sink_degenerate_rates_print_sentinel() {
        let dir = temp_dir("sentinel");
        let mut sink = DatFileSink::new(&dir).unwrap();
        let desc = KernelId::Copy.descriptor();

        sink.begin_kernel(desc).unwrap();
        sink.point(
            desc,
            &SweepPoint {
                n: 100,
                iter: 2,
                stats: AggregateStats::default(),
                bandwidth: None,
                flop_rate: None,
            },
        )
        .unwrap();
        sink.finish_kernel(desc).unwrap();

        let contents = std::fs::read_to_string(dir.join("copy.dat")).unwrap();
        let row = contents.lines().last().unwrap();
        assert!(row.contains(" - "));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_point_before_begin_is_an_error() {
        let dir = temp_dir("order");
        let mut sink = DatFileSink::new(&dir).unwrap();
        let result = sink.point(
            KernelId::Copy.descriptor(),
            &SweepPoint {
                n: 100,
                iter: 2,
                stats: AggregateStats::default(),
                bandwidth: None,
                flop_rate: None,
            },
        );
        assert!(result.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
