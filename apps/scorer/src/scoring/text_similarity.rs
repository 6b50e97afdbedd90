//! TF-IDF cosine similarity between the job description and the profile narrative.
//!
//! The corpus is exactly the two documents being compared. IDF is smoothed,
//! `ln((1 + n) / (1 + df)) + 1`, so terms shared by both documents keep a
//! non-zero weight. Vectors are L2-normalised; the dot product is the cosine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSimilarityScore {
    pub points_earned: f64,
    pub points_possible: f64,
    /// Cosine similarity, 0–1.
    pub similarity: f64,
    pub similarity_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "no", "nor", "not", "of", "off", "on", "once", "only", "or",
    "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours",
];

/// Lowercased alphanumeric terms of two or more chars, minus stop words.
pub fn term_frequencies(text: &str) -> BTreeMap<String, u32> {
    let mut frequencies = BTreeMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
    {
        let token = token.to_lowercase();
        if STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        *frequencies.entry(token).or_insert(0) += 1;
    }
    frequencies
}

/// Cosine similarity of the TF-IDF vectors of `a` and `b` over the corpus {a, b}.
///
/// Symmetric in its arguments. Returns 0 when either document has no terms.
pub fn tfidf_cosine(a: &str, b: &str) -> f64 {
    let tf_a = term_frequencies(a);
    let tf_b = term_frequencies(b);
    if tf_a.is_empty() || tf_b.is_empty() {
        return 0.0;
    }

    let weigh = |tf: &BTreeMap<String, u32>| -> BTreeMap<String, f64> {
        let mut vector: BTreeMap<String, f64> = tf
            .iter()
            .map(|(term, count)| {
                let df = u32::from(tf_a.contains_key(term)) + u32::from(tf_b.contains_key(term));
                (term.clone(), f64::from(*count) * smoothed_idf(2, df))
            })
            .collect();
        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.values_mut().for_each(|w| *w /= norm);
        }
        vector
    };

    let vec_a = weigh(&tf_a);
    let vec_b = weigh(&tf_b);

    // Walk the shared vocabulary in term order so argument order cannot change
    // the floating-point summation.
    let dot: f64 = vec_a
        .iter()
        .filter_map(|(term, wa)| vec_b.get(term).map(|wb| wa * wb))
        .sum();
    dot.clamp(0.0, 1.0)
}

fn smoothed_idf(documents: u32, document_frequency: u32) -> f64 {
    ((1.0 + f64::from(documents)) / (1.0 + f64::from(document_frequency))).ln() + 1.0
}

/// Scores the profile narrative against the job description.
pub fn score_text_similarity(
    job_description: &str,
    profile_text: &str,
    max_points: f64,
) -> TextSimilarityScore {
    let note = if job_description.trim().is_empty() {
        Some("No job description provided".to_string())
    } else if profile_text.trim().is_empty() {
        Some("No profile text available".to_string())
    } else {
        None
    };

    let similarity = if note.is_some() {
        0.0
    } else {
        tfidf_cosine(job_description, profile_text)
    };

    TextSimilarityScore {
        points_earned: similarity * max_points,
        points_possible: max_points,
        similarity,
        similarity_percentage: similarity * 100.0,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JD: &str = "We are hiring a backend engineer to build scalable REST APIs \
                      with Python, FastAPI and PostgreSQL in a microservices architecture.";
    const PROFILE: &str = "Experienced backend developer building scalable web applications \
                           using Python, FastAPI, and PostgreSQL. Passionate about microservices.";

    #[test]
    fn test_term_frequencies_lowercases_and_drops_stop_words() {
        let tf = term_frequencies("The Rust and the rust, a C compiler!");
        assert_eq!(tf.get("rust"), Some(&2));
        assert_eq!(tf.get("compiler"), Some(&1));
        assert!(!tf.contains_key("the"));
        assert!(!tf.contains_key("c"));
    }

    #[test]
    fn test_identical_documents_have_similarity_one() {
        let sim = tfidf_cosine(JD, JD);
        assert!((sim - 1.0).abs() < 1e-9, "sim was {sim}");
    }

    #[test]
    fn test_disjoint_vocabulary_is_zero() {
        assert_eq!(tfidf_cosine("kubernetes terraform", "watercolor painting"), 0.0);
    }

    #[test]
    fn test_empty_document_is_zero() {
        assert_eq!(tfidf_cosine("", PROFILE), 0.0);
        assert_eq!(tfidf_cosine(JD, "   "), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let forward = tfidf_cosine(JD, PROFILE);
        let backward = tfidf_cosine(PROFILE, JD);
        assert!(forward > 0.0 && forward < 1.0, "forward was {forward}");
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_points_scale_with_max() {
        let score = score_text_similarity(JD, PROFILE, 30.0);
        assert!((score.points_earned - score.similarity * 30.0).abs() < 1e-12);
        assert!((0.0..=30.0).contains(&score.points_earned));
        assert!(score.note.is_none());
    }

    #[test]
    fn test_missing_job_description_notes_and_scores_zero() {
        let score = score_text_similarity("", PROFILE, 30.0);
        assert_eq!(score.points_earned, 0.0);
        assert_eq!(score.note.as_deref(), Some("No job description provided"));
    }
}
