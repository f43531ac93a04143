//! Path-length normalization for isolation trees.

/// Euler–Mascheroni constant.
pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a binary search tree
/// built from `n` points, `c(n)`.
///
/// Used both to normalize depths across subsample sizes and to account for
/// the unbuilt subtree below a leaf that still holds `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Raw isolation score for a mean path length, negated so that lower
/// values are more anomalous.
///
/// The unnegated quantity `2^(-E[h]/c(psi))` approaches 1 for points that
/// isolate immediately and 0.5 or below for typical points.
pub fn isolation_score(mean_path_length: f64, subsample_size: usize) -> f64 {
    let c = average_path_length(subsample_size);
    if c <= 0.0 {
        // A one-point subsample cannot separate anything.
        return -1.0;
    }
    -(2f64).powf(-mean_path_length / c)
}

/// Depth limit for a tree grown from `subsample_size` points.
pub fn height_limit(subsample_size: usize) -> usize {
    if subsample_size <= 1 {
        return 0;
    }
    (subsample_size as f64).log2().ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
    }

    #[test]
    fn c_256_matches_reference() {
        // 2 * (ln 255 + gamma) - 2 * 255/256
        let expected = 2.0 * (255f64.ln() + EULER_GAMMA) - 2.0 * 255.0 / 256.0;
        assert!((average_path_length(256) - expected).abs() < 1e-12);
        assert!((average_path_length(256) - 10.244_770_920_116_851).abs() < 1e-9);
    }

    #[test]
    fn score_at_average_depth_is_minus_half() {
        let c = average_path_length(256);
        assert!((isolation_score(c, 256) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn shallow_points_score_lower() {
        assert!(isolation_score(1.0, 256) < isolation_score(8.0, 256));
    }

    #[test]
    fn height_limit_is_ceil_log2() {
        assert_eq!(height_limit(1), 0);
        assert_eq!(height_limit(2), 1);
        assert_eq!(height_limit(256), 8);
        assert_eq!(height_limit(257), 9);
    }
}
