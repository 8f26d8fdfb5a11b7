use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::Dataset;

/// Shuffle rows with `seed` and split off `ceil(n * test_fraction)` rows for testing.
///
/// Returns `(train, test)`. Both partitions must end up non-empty.
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset), String> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(format!(
            "Test fraction must be between 0 and 1 (exclusive), got {test_fraction}"
        ));
    }
    let n = dataset.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(format!(
            "Dataset with {n} rows is too small for a {:.0}% holdout",
            test_fraction * 100.0
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((dataset.select(train_idx), dataset.select(test_idx)))
}
