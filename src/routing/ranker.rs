use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::reference::ReferenceData;
use super::types::{DepartmentScore, TriageError};
use crate::models::PatientHistory;
use crate::routing_config::RoutingConfig;

/// Words of two or more characters, compiled once.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

// ═══════════════════════════════════════════════════════════
// TF-IDF
// ═══════════════════════════════════════════════════════════

/// Term-frequency × smoothed inverse-document-frequency, L2-normalised.
///
/// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`. Vocabulary is sorted so
/// vector positions are stable across runs.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut n_docs = 0usize;
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            n_docs += 1;
            let terms: BTreeSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in terms {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = n_docs as f64;
        let vocabulary = df
            .keys()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        let idf = df
            .values()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Project text into the fitted space. Unknown terms are ignored; text
    /// with no known terms gives the zero vector.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut v = vec![0.0; self.idf.len()];
        for term in tokenize(text) {
            if let Some(&i) = self.vocabulary.get(&term) {
                v[i] += 1.0;
            }
        }
        for (x, idf) in v.iter_mut().zip(&self.idf) {
            *x *= idf;
        }
        l2_normalize(&mut v);
        v
    }
}

fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

// ═══════════════════════════════════════════════════════════
// Ranker
// ═══════════════════════════════════════════════════════════

/// Scores departments by cosine similarity between the symptom text and each
/// department's keyword bag. The vectorizer and the department vectors are
/// built once in `new` and never refit.
pub struct DepartmentRanker {
    reference: Arc<ReferenceData>,
    vectorizer: TfidfVectorizer,
    /// Parallel to `reference.departments`.
    profiles: Vec<Vec<f64>>,
    history_bonus: f64,
    top_k: usize,
}

impl DepartmentRanker {
    pub fn new(reference: Arc<ReferenceData>, config: &RoutingConfig) -> Self {
        let vectorizer = TfidfVectorizer::fit(
            reference
                .departments
                .iter()
                .flat_map(|d| d.keywords.iter().map(String::as_str)),
        );
        let profiles = reference
            .departments
            .iter()
            .map(|d| vectorizer.transform(&d.keywords.join(" ")))
            .collect();
        tracing::debug!(
            vocabulary = vectorizer.vocabulary_len(),
            departments = reference.departments.len(),
            "Department ranker fitted"
        );

        Self {
            reference,
            vectorizer,
            profiles,
            history_bonus: config.history_bonus,
            top_k: config.top_k,
        }
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Raw similarity for every department, table order.
    pub fn score_all(&self, text: &str) -> Vec<DepartmentScore> {
        let query = self.vectorizer.transform(text);
        self.reference
            .departments
            .iter()
            .zip(&self.profiles)
            .map(|(d, profile)| DepartmentScore {
                department: d.tag.clone(),
                score: cosine_similarity(&query, profile).clamp(0.0, 1.0),
            })
            .collect()
    }

    /// Top-K departments over the whole table.
    pub fn rank(&self, text: &str, history: Option<&PatientHistory>) -> Vec<DepartmentScore> {
        self.shortlist(self.score_all(text), history)
    }

    /// Top-K restricted to `candidates`, which keep their given order for
    /// ties. Unknown tags are rejected rather than scored as zero.
    pub fn rank_among(
        &self,
        text: &str,
        candidates: &[String],
        history: Option<&PatientHistory>,
    ) -> Result<Vec<DepartmentScore>, TriageError> {
        let all = self.score_all(text);
        let mut scores = Vec::with_capacity(candidates.len());
        for tag in candidates {
            let score = all
                .iter()
                .find(|s| &s.department == tag)
                .ok_or_else(|| TriageError::InvalidDepartment(tag.clone()))?;
            scores.push(score.clone());
        }
        Ok(self.shortlist(scores, history))
    }

    /// Stable sort, keep top-K, then boost previously visited departments
    /// and sort again. Boosted scores are capped at 1.0 after ordering.
    fn shortlist(
        &self,
        mut scores: Vec<DepartmentScore>,
        history: Option<&PatientHistory>,
    ) -> Vec<DepartmentScore> {
        sort_descending(&mut scores);
        scores.truncate(self.top_k);

        if let Some(history) = history {
            for s in scores.iter_mut() {
                if history.has_visited(&s.department) {
                    s.score *= self.history_bonus;
                }
            }
            sort_descending(&mut scores);
            for s in scores.iter_mut() {
                s.score = s.score.min(1.0);
            }
        }
        scores
    }
}

fn sort_descending(scores: &mut [DepartmentScore]) {
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
