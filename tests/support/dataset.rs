use std::fmt::Write as _;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Write a balanced synthetic dataset: even rows are ransomware-like, odd rows benign.
///
/// A few rows get flipped labels so holdout accuracy is realistic rather than perfect.
pub fn write_synthetic_dataset(path: &Path, rows: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = String::from("entropy,file_size_mb,modification_rate,rename_count,is_ransomware\n");
    for i in 0..rows {
        let ransomware = i % 2 == 0;
        let (entropy, size, rate, renames) = if ransomware {
            (
                rng.random_range(7.0..8.0),
                rng.random_range(0.05..8.0),
                rng.random_range(15.0..90.0),
                rng.random_range(2..25) as f64,
            )
        } else {
            (
                rng.random_range(1.5..7.2),
                rng.random_range(0.01..200.0),
                rng.random_range(0.0..20.0),
                rng.random_range(0..3) as f64,
            )
        };
        let noisy = rng.random_range(0..20) == 0;
        let label = u8::from(ransomware != noisy);
        writeln!(csv, "{entropy:.4},{size:.4},{rate:.3},{renames},{label}").expect("format row");
    }
    std::fs::write(path, csv).expect("write dataset");
}
