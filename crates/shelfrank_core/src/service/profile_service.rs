//! Preference profile construction from rated reading history.
//!
//! # Responsibility
//! - Aggregate the user's `read`-shelf ratings into per-author and per-year
//!   preference estimates.
//! - Apply Bayesian shrinkage so sparse groups lean on the global mean.
//!
//! # Invariants
//! - Authors/years with zero qualifying ratings are absent from their maps,
//!   never zero-filled; callers supply their own defaults for unseen keys.
//! - All emitted preferences lie in `[0, 1]`.

use crate::repo::catalog_repo::{CatalogRepository, RepoResult};
use std::collections::HashMap;

/// Shelf whose ratings feed the profile.
const RATED_SHELF: &str = "read";

/// `global_mean_norm` fallback when the user has no rated history.
const NEUTRAL_GLOBAL_MEAN_NORM: f64 = 0.6;

/// Evidence weighting for the author confidence boost: `n/(n+2)` readings.
const CONFIDENCE_PIVOT: f64 = 2.0;

/// Statistical snapshot of one user's tastes, recomputed per request and
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceProfile {
    /// Mean rating over the rated `read` history, normalized to `[0, 1]`;
    /// 0.6 when no rated history exists.
    pub global_mean_norm: f64,
    /// Shrunk, confidence-boosted per-author affinity in `[0, 1]`.
    pub author_pref: HashMap<String, f64>,
    /// Shrunk, min-max normalized per-year preference in `[0, 1]`.
    pub year_pref: HashMap<i64, f64>,
}

/// Builds the preference profile for one user.
///
/// `k_author`/`k_year` are the shrinkage strengths: how many phantom
/// global-mean ratings each group is blended with.
pub fn build_profile<R: CatalogRepository>(
    repo: &R,
    user_id: &str,
    k_author: f64,
    k_year: f64,
) -> RepoResult<PreferenceProfile> {
    let author_rows = repo.ratings_by_author_for_user(user_id, RATED_SHELF)?;
    let year_rows = repo.ratings_by_year_for_user(user_id, RATED_SHELF)?;

    // Author rows cover every rated read (author is never null), so the
    // global mean is taken from them.
    let global_mean = mean(author_rows.iter().map(|(_, rating)| *rating as f64));

    let author_pref = author_rows
        .into_iter()
        .fold(
            HashMap::<String, Vec<f64>>::new(),
            |mut groups, (author, rating)| {
                groups.entry(author).or_default().push(rating as f64);
                groups
            },
        )
        .into_iter()
        .map(|(author, ratings)| {
            let affinity = author_affinity(&ratings, global_mean, k_author);
            (author, affinity)
        })
        .collect();

    let year_pref = normalize_minmax(
        year_rows
            .into_iter()
            .fold(
                HashMap::<i64, Vec<f64>>::new(),
                |mut groups, (year, rating)| {
                    groups.entry(year).or_default().push(rating as f64);
                    groups
                },
            )
            .into_iter()
            .map(|(year, ratings)| {
                let n = ratings.len() as f64;
                (year, shrink(mean(ratings.into_iter()), n, global_mean, k_year))
            })
            .collect(),
    );

    let global_mean_norm = if global_mean > 0.0 {
        global_mean / 5.0
    } else {
        NEUTRAL_GLOBAL_MEAN_NORM
    };

    Ok(PreferenceProfile {
        global_mean_norm,
        author_pref,
        year_pref,
    })
}

/// Blends a sparse group mean toward the global prior: `k` phantom ratings
/// at `global_mean` are mixed with the `n` observed ones.
fn shrink(avg: f64, n: f64, global_mean: f64, k: f64) -> f64 {
    if n + k == 0.0 {
        global_mean
    } else {
        (avg * n + global_mean * k) / (n + k)
    }
}

/// Shrunk mean normalized to `[0, 1]` with an evidence boost: authors with
/// both a high shrunk rating and more supporting readings score higher.
fn author_affinity(ratings: &[f64], global_mean: f64, k_author: f64) -> f64 {
    let n = ratings.len() as f64;
    let bayes = shrink(mean(ratings.iter().copied()), n, global_mean, k_author);
    let confidence = n / (n + CONFIDENCE_PIVOT);
    clamp01(bayes / 5.0 * (0.7 + 0.3 * confidence))
}

/// Min-max scales the shrunk per-year values over the observed range.
///
/// Degenerate case: a single distinct value maps every year to 0.5.
fn normalize_minmax(shrunk: HashMap<i64, f64>) -> HashMap<i64, f64> {
    let mut values = shrunk.values().copied();
    let Some(first) = values.next() else {
        return HashMap::new();
    };
    let (min, max) = values.fold((first, first), |(min, max), value| {
        (min.min(value), max.max(value))
    });

    shrunk
        .into_iter()
        .map(|(year, value)| {
            let normalized = if max > min {
                (value - min) / (max - min)
            } else {
                0.5
            };
            (year, normalized)
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (count, sum) = values.fold((0_u64, 0.0_f64), |(count, sum), value| {
        (count + 1, sum + value)
    });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
