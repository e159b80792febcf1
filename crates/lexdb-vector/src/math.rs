use lexdb_core::types::SimilarityMetric;

/// Scale `v` to unit length in place. Zero vectors are left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() { *x /= norm; }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Vector as stored for `metric`: normalised for cosine, untouched for L2.
pub fn prepare(metric: SimilarityMetric, v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    if metric == SimilarityMetric::Cosine { l2_normalize(&mut out); }
    out
}

/// Higher is closer. Both inputs must already be [`prepare`]d.
pub fn similarity(metric: SimilarityMetric, stored: &[f32], query: &[f32]) -> f32 {
    match metric {
        SimilarityMetric::Cosine => dot(stored, query),
        SimilarityMetric::L2 => -squared_l2(stored, query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let a = prepare(SimilarityMetric::Cosine, &[3.0, 4.0]);
        let b = prepare(SimilarityMetric::Cosine, &[6.0, 8.0]);
        assert!((similarity(SimilarityMetric::Cosine, &a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_is_negative_squared_distance() {
        let s = similarity(SimilarityMetric::L2, &[0.0, 0.0], &[3.0, 4.0]);
        assert!((s + 25.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_survives_normalisation() {
        let mut z = vec![0.0; 3];
        l2_normalize(&mut z);
        assert_eq!(z, vec![0.0; 3]);
    }
}
