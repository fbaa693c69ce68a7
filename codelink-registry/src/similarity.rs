use ndarray::Array1;
use rayon::prelude::*;

use crate::registry::RegistryEntry;
use crate::thresholds::{COSINE_WEIGHT, OVERLAP_WEIGHT, VECTOR_DIMENSIONS};

/// Stopwords excluded from tokenization. These carry no discriminating
/// signal between procedure descriptions and only inflate vector overlap.
const STOPWORDS: [&str; 12] = [
    "a", "an", "and", "for", "in", "of", "on", "or", "per", "the", "to", "with",
];

/// Split free text into lowercase alphanumeric tokens, dropping stopwords
/// and single-character fragments.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// FNV-1a 64-bit hash. Used instead of `std::hash` so token bucketing is
/// deterministic across processes and builds.
fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Encode tokens as a fixed-dimension term-frequency vector via feature
/// hashing. Each token increments the bucket at `fnv1a(token) % dims`.
pub fn token_vector(tokens: &[String], dims: usize) -> Array1<f64> {
    let mut v = Array1::<f64>::zeros(dims);
    for token in tokens {
        let idx = (fnv1a(token) % dims as u64) as usize;
        v[idx] += 1.0;
    }
    v
}

/// Cosine similarity between two hashed token vectors.
///
/// Zero vectors (no tokens survived tokenization) score 0.0 rather than
/// dividing by zero. The result is clamped to [0, 1] to absorb
/// floating-point rounding.
pub fn cosine_similarity(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a < 1e-12 || norm_b < 1e-12 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Overlap coefficient between two token sets: |A ∩ B| / min(|A|, |B|).
///
/// More forgiving than Jaccard for short free-text queries against longer
/// canonical descriptions, which is the normal HIS input shape.
pub fn overlap_coefficient(query: &[String], entry: &[String]) -> f64 {
    if query.is_empty() || entry.is_empty() {
        return 0.0;
    }
    let shared = query.iter().filter(|t| entry.contains(t)).count();
    shared as f64 / query.len().min(entry.len()) as f64
}

/// A raw registry match before pipeline scoring.
#[derive(Clone, Debug)]
pub struct RegistryMatch {
    /// Index into the registry entry list.
    pub entry_index: usize,
    /// Blended lexical similarity in [0, 1].
    pub score: f64,
    /// Query tokens that also appear in the entry's canonical tokens.
    pub matched_terms: Vec<String>,
}

/// Scan the registry for entries lexically similar to the query tokens.
///
/// Returns (entry index, score, matched terms) tuples sorted by descending
/// score, ties broken by ascending SBS code so ranking is fully
/// deterministic. Only matches at or above `threshold` are kept, truncated
/// to `top_k`.
pub fn find_candidates(
    query_tokens: &[String],
    entries: &[RegistryEntry],
    threshold: f64,
    top_k: usize,
) -> Vec<RegistryMatch> {
    let query_vec = token_vector(query_tokens, VECTOR_DIMENSIONS);

    let mut matches: Vec<RegistryMatch> = entries
        .par_iter()
        .enumerate()
        .map(|(i, entry)| {
            let cosine = cosine_similarity(&query_vec, &entry.vector);
            let overlap = overlap_coefficient(query_tokens, &entry.tokens);
            let score = COSINE_WEIGHT * cosine + OVERLAP_WEIGHT * overlap;
            let matched_terms: Vec<String> = query_tokens
                .iter()
                .filter(|t| entry.tokens.contains(t))
                .cloned()
                .collect();
            RegistryMatch {
                entry_index: i,
                score,
                matched_terms,
            }
        })
        .filter(|m| m.score >= threshold)
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| entries[a.entry_index].code.cmp(&entries[b.entry_index].code))
    });
    matches.truncate(top_k);
    matches
}
