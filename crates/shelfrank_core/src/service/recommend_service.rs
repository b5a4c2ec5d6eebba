//! To-read candidate scoring and ranking use-case.
//!
//! # Responsibility
//! - Combine a preference profile with each to-read candidate's author,
//!   year, and page attributes into one weighted score.
//! - Produce a deterministic ranked list with a per-candidate explanation.
//!
//! # Invariants
//! - Ranking order: `raw_score`, `year_component`, `pages_component` all
//!   descending, then case-folded title ascending as the final tie-break.
//! - `count` reports all scored candidates, not the truncated list length.
//! - Scoring never fails on sparse history; unseen keys use the documented
//!   defaults.

use crate::model::book::BookId;
use crate::repo::catalog_repo::{CandidateRow, CatalogRepository, RepoResult};
use crate::service::profile_service::{build_profile, clamp01, PreferenceProfile};
use log::info;
use serde::Serialize;
use std::time::Instant;

/// Affinity for an author absent from the rated history. Deliberately 0.0
/// rather than neutral: the scorer favors authors the user has rated.
pub const UNKNOWN_AUTHOR_DEFAULT: f64 = 0.0;

/// Preference for a publication year absent from the rated history.
pub const UNSEEN_YEAR_DEFAULT: f64 = 0.5;

/// Caller-overridable scoring knobs with their documented defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendParams {
    /// Maximum items returned; zero or negative yields an empty list.
    pub limit: i64,
    pub w_author: f64,
    pub w_year: f64,
    pub w_pages: f64,
    /// Shrinkage strength for per-author affinity.
    pub k_author: f64,
    /// Shrinkage strength for per-year preference.
    pub k_year: f64,
    /// Page-length normalization ceiling.
    pub max_pages: i64,
}

impl Default for RecommendParams {
    fn default() -> Self {
        Self {
            limit: 10,
            w_author: 0.35,
            w_year: 0.25,
            w_pages: 0.20,
            k_author: 2.0,
            k_year: 2.0,
            max_pages: 800,
        }
    }
}

/// Weights echoed back in each explanation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub author: f64,
    pub year: f64,
    pub pages: f64,
}

/// Human-readable score breakdown, components rounded to 3 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreExplain {
    pub author_affinity: f64,
    pub year_component: f64,
    pub pages_component: f64,
    pub weights: ScoreWeights,
}

/// One scored to-read candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    /// Display score, `raw_score` rounded to 4 decimals.
    pub score: f64,
    /// Unrounded score; primary ranking key, not serialized.
    #[serde(skip)]
    pub raw_score: f64,
    /// Unrounded year component; second ranking key.
    #[serde(skip)]
    pub year_component: f64,
    /// Unrounded pages component; third ranking key.
    #[serde(skip)]
    pub pages_component: f64,
    pub explain: ScoreExplain,
}

/// Ranked recommendation envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Total candidates scored, before truncation to `limit`.
    pub count: usize,
    pub items: Vec<ScoredCandidate>,
}

/// Recommendation facade over any catalog repository.
pub struct RecommendService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> RecommendService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Scores and ranks the user's to-read shelf.
    ///
    /// # Contract
    /// - Deterministic: a fixed store state and fixed params yield the same
    ///   ordered list and rounded scores on every call.
    /// - Read-only; never mutates the store.
    ///
    /// # Side effects
    /// - Emits `event=recommend` logging with counts and duration.
    pub fn recommend_to_read(
        &self,
        user_id: &str,
        params: &RecommendParams,
    ) -> RepoResult<Recommendation> {
        let started_at = Instant::now();

        let profile = build_profile(&self.repo, user_id, params.k_author, params.k_year)?;
        let candidates = self.repo.to_read_candidates_for_user(user_id)?;

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|candidate| score_candidate(&profile, candidate, params))
            .collect();
        rank(&mut scored);

        let count = scored.len();
        if params.limit <= 0 {
            scored.clear();
        } else {
            scored.truncate(params.limit as usize);
        }

        info!(
            "event=recommend module=recommend status=ok user={user_id} candidates={count} returned={} duration_ms={}",
            scored.len(),
            started_at.elapsed().as_millis()
        );

        Ok(Recommendation {
            count,
            items: scored,
        })
    }
}

/// Combines profile lookups and page length into one weighted score.
pub fn score_candidate(
    profile: &PreferenceProfile,
    candidate: &CandidateRow,
    params: &RecommendParams,
) -> ScoredCandidate {
    let author_affinity = clamp01(
        profile
            .author_pref
            .get(&candidate.author)
            .copied()
            .unwrap_or(UNKNOWN_AUTHOR_DEFAULT),
    );
    let year_component = clamp01(
        candidate
            .year
            .and_then(|year| profile.year_pref.get(&year).copied())
            .unwrap_or(UNSEEN_YEAR_DEFAULT),
    );

    // Shorter books score higher. A missing page count falls through the
    // clamp as 0 pages and therefore scores 1.0, not a neutral 0.5; this
    // matches the importer's observed behavior and is kept as-is.
    let ceiling = params.max_pages.max(1);
    let clamped = candidate.pages.unwrap_or(0).clamp(0, ceiling) as f64;
    let pages_component = 1.0 - clamped / ceiling as f64;

    let raw_score = params.w_author * author_affinity
        + params.w_year * year_component
        + params.w_pages * pages_component;

    ScoredCandidate {
        book_id: candidate.book_id,
        title: candidate.title.clone(),
        author: candidate.author.clone(),
        score: round_to(raw_score, 4),
        raw_score,
        year_component,
        pages_component,
        explain: ScoreExplain {
            author_affinity: round_to(author_affinity, 3),
            year_component: round_to(year_component, 3),
            pages_component: round_to(pages_component, 3),
            weights: ScoreWeights {
                author: params.w_author,
                year: params.w_year,
                pages: params.w_pages,
            },
        },
    }
}

/// Sorts candidates by the composite ranking key.
///
/// Numeric keys compare descending via `total_cmp`; the title tie-break
/// compares ascending on the case-folded title, so exact numeric ties come
/// out in stable alphabetical order.
pub fn rank(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then(b.year_component.total_cmp(&a.year_component))
            .then(b.pages_component.total_cmp(&a.pages_component))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::{rank, round_to, score_candidate, RecommendParams, ScoredCandidate};
    use crate::repo::catalog_repo::CandidateRow;
    use crate::service::profile_service::PreferenceProfile;
    use std::collections::HashMap;

    fn profile() -> PreferenceProfile {
        PreferenceProfile {
            global_mean_norm: 0.8,
            author_pref: HashMap::from([("Frank Herbert".to_string(), 0.9)]),
            year_pref: HashMap::from([(1965, 1.0)]),
        }
    }

    fn candidate(author: &str, year: Option<i64>, pages: Option<i64>) -> CandidateRow {
        CandidateRow {
            book_id: 1,
            title: "Dune Messiah".to_string(),
            author: author.to_string(),
            pages,
            year,
        }
    }

    #[test]
    fn known_author_and_year_feed_the_score() {
        let scored = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(1965), Some(400)),
            &RecommendParams::default(),
        );

        assert_eq!(scored.explain.author_affinity, 0.9);
        assert_eq!(scored.explain.year_component, 1.0);
        assert_eq!(scored.explain.pages_component, 0.5);
        let expected = 0.35 * 0.9 + 0.25 * 1.0 + 0.20 * 0.5;
        assert_eq!(scored.score, round_to(expected, 4));
    }

    #[test]
    fn unknown_author_contributes_zero_affinity() {
        let scored = score_candidate(
            &profile(),
            &candidate("Unknown Author", Some(1965), Some(400)),
            &RecommendParams::default(),
        );
        assert_eq!(scored.explain.author_affinity, 0.0);
    }

    #[test]
    fn unseen_year_defaults_to_neutral() {
        let scored = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(2020), Some(400)),
            &RecommendParams::default(),
        );
        assert_eq!(scored.explain.year_component, 0.5);

        let no_year = score_candidate(
            &profile(),
            &candidate("Frank Herbert", None, Some(400)),
            &RecommendParams::default(),
        );
        assert_eq!(no_year.explain.year_component, 0.5);
    }

    #[test]
    fn missing_pages_score_like_zero_pages() {
        let missing = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(1965), None),
            &RecommendParams::default(),
        );
        assert_eq!(missing.explain.pages_component, 1.0);

        let oversized = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(1965), Some(2000)),
            &RecommendParams::default(),
        );
        assert_eq!(oversized.explain.pages_component, 0.0);
    }

    #[test]
    fn rank_breaks_ties_on_components_then_title() {
        let mut base = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(1965), Some(400)),
            &RecommendParams::default(),
        );
        base.raw_score = 1.0;
        base.year_component = 0.5;

        let mut shorter = base.clone();
        shorter.title = "Zebra".to_string();
        shorter.pages_component = 0.9;

        let mut alpha_first = base.clone();
        alpha_first.title = "Alpha".to_string();
        alpha_first.pages_component = base.pages_component;

        let mut scored = vec![base.clone(), alpha_first.clone(), shorter.clone()];
        rank(&mut scored);

        // Higher pages component wins before the title tie-break kicks in.
        assert_eq!(scored[0].title, "Zebra");
        assert_eq!(scored[1].title, "Alpha");
        assert_eq!(scored[2].title, "Dune Messiah");
    }

    fn titled(title: &str) -> ScoredCandidate {
        let mut scored = score_candidate(
            &profile(),
            &candidate("Frank Herbert", Some(1965), Some(400)),
            &RecommendParams::default(),
        );
        scored.title = title.to_string();
        scored
    }

    #[test]
    fn exact_ties_sort_alphabetically_case_insensitive() {
        let mut scored = vec![titled("beta"), titled("Alpha"), titled("gamma")];
        rank(&mut scored);
        assert_eq!(scored[0].title, "Alpha");
        assert_eq!(scored[1].title, "beta");
        assert_eq!(scored[2].title, "gamma");
    }

    #[test]
    fn round_to_matches_display_contract() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(0.123456, 3), 0.123);
    }
}
