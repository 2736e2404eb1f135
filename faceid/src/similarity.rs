/// Cosine similarity above which a candidate counts as a duplicate.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Cosine similarity between two vectors, accumulated in f64.
///
/// Returns `None` when the similarity is undefined: either vector has zero
/// magnitude, the lengths differ, or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let mut dot: f64 = 0.0;
    let mut na: f64 = 0.0;
    let mut nb: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let x = x as f64;
        let y = y as f64;
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        return None;
    }
    let sim = dot / denom;
    sim.is_finite().then_some(sim)
}

/// Squared Euclidean distance. Ordering by it equals ordering by distance.
pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Decides whether `candidate` is a face not seen before.
///
/// Returns `false` as soon as any existing embedding has cosine similarity
/// strictly greater than `threshold`, `true` otherwise (including when
/// `existing` is empty). An undefined similarity (zero-magnitude vector,
/// length mismatch) never exceeds the threshold, so degenerate model output
/// is admitted rather than silently merged.
pub fn is_new_face<E: AsRef<[f32]>>(candidate: &[f32], existing: &[E], threshold: f32) -> bool {
    let threshold = threshold as f64;
    !existing.iter().any(|e| {
        cosine_similarity(candidate, e.as_ref()).is_some_and(|sim| sim > threshold)
    })
}
