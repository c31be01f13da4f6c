use std::f64::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Normal, NormalError};

use poles::write_grid_file;

/// Writes a synthetic monthly 2 m temperature archive.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Where to write the archive
    #[arg(long, default_value = "data.grid")]
    output: PathBuf,

    /// First year of the archive
    #[arg(long, default_value_t = 1979)]
    first_year: i32,

    /// Last year of the archive (included)
    #[arg(long, default_value_t = 2023)]
    last_year: i32,

    /// Grid spacing in degrees
    #[arg(long, default_value_t = 2.5)]
    resolution: f64,

    /// Seed of the noise generator
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Degrees Celsius at `lat` for `month` (1-12), `years` after the start.
fn temperature(lat: f64, month: u32, years: f64) -> f64 {
    let equator = 27.0;
    let pole = -25.0;
    let gradient = equator + (pole - equator) * (lat.abs() / 90.0).powf(1.5);
    // warmest in July up north, in January down south
    let phase = 2.0 * PI * (month as f64 - 7.0) / 12.0;
    let seasonal = 15.0 * (lat / 90.0) * phase.cos();
    let trend = 0.03 * years * (1.0 + lat.abs() / 45.0);
    gradient + seasonal + trend
}

fn axis(from: f64, to: f64, step: f64) -> Array1<f64> {
    let count = ((to - from) / step).abs().floor() as usize;
    let sign = if to >= from { 1.0 } else { -1.0 };
    Array1::from_iter((0..=count).map(|i| from + sign * step * i as f64))
}

/// One noisy grid per month of `years`, all on the `lats` × `width` grid.
fn generate(
    lats: &Array1<f64>,
    width: usize,
    years: RangeInclusive<i32>,
    seed: u64,
) -> Result<Vec<(String, Array2<f64>)>, NormalError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.5)?;
    let first_year = *years.start();

    let mut records = Vec::new();
    for year in years {
        let elapsed = (year - first_year) as f64;
        for month in 1..=12 {
            let data = Array2::from_shape_fn((lats.len(), width), |(row, _)| {
                temperature(lats[row], month, elapsed) + rng.sample(noise)
            });
            records.push((format!("2 metre temperature:C {year}{month:02}"), data));
        }
    }
    Ok(records)
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    if args.last_year < args.first_year {
        miette::bail!(
            "last year {} is before first year {}",
            args.last_year,
            args.first_year
        );
    }
    if !(args.resolution > 0.0 && args.resolution <= 90.0) {
        miette::bail!("resolution must be within (0, 90], got {}", args.resolution);
    }

    let lats = axis(90.0, -90.0, args.resolution);
    let mut lons = axis(0.0, 360.0, args.resolution);
    if lons.last().is_some_and(|lon| *lon >= 360.0) {
        lons = lons.slice(ndarray::s![..-1]).to_owned();
    }

    let records = generate(&lats, lons.len(), args.first_year..=args.last_year, args.seed)
        .into_diagnostic()?;

    let file = File::create(&args.output).into_diagnostic()?;
    write_grid_file(
        BufWriter::new(file),
        &lats,
        &lons,
        records.iter().map(|(descriptor, data)| (descriptor.as_str(), data)),
    )?;

    println!(
        "Wrote {} records of {}x{} to {}",
        records.len(),
        lats.len(),
        lons.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn same_seed_same_archive() {
        let lats = axis(90.0, -90.0, 45.0);
        assert_eq!(lats, array![90.0, 45.0, 0.0, -45.0, -90.0]);

        let first = generate(&lats, 4, 2000..=2001, 7).unwrap();
        let again = generate(&lats, 4, 2000..=2001, 7).unwrap();
        let other = generate(&lats, 4, 2000..=2001, 8).unwrap();

        assert_eq!(first.len(), 24);
        assert_eq!(first[13].0, "2 metre temperature:C 200102");
        assert_eq!(first[0].1.dim(), (5, 4));
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn poles_are_colder_than_the_equator() {
        for month in 1..=12 {
            assert!(temperature(0.0, month, 0.0) > temperature(90.0, month, 0.0));
            assert!(temperature(0.0, month, 0.0) > temperature(-90.0, month, 0.0));
        }
        assert!(temperature(80.0, 7, 0.0) > temperature(80.0, 1, 0.0));
        assert!(temperature(-80.0, 1, 0.0) > temperature(-80.0, 7, 0.0));
    }
}
