//! Similarity weighting.
//!
//! Each observation gets one non-negative weight for a query: the product of
//! a Gaussian kernel on both condition axes, recency decay, a reliability
//! penalty for extreme ratings, frequency dampening of crowded cells and the
//! source and anchor boosts. Each source then keeps its top `k` neighbours.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::config::{AnchorConfig, KernelConfig};
use super::kernel::{bucket_key, gaussian, half_life_decay};
use super::History;
use crate::observation::{Observation, Query, SatisfactionScale};

/// Which pool a neighbour was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    User,
    Global,
}

/// A weighted observation.
#[derive(Debug, Clone)]
pub struct Neighbor<'a> {
    pub observation: &'a Observation,
    pub weight: f64,
    pub anchor: bool,
}

/// Top neighbours of each source for one query.
#[derive(Debug, Clone, Default)]
pub struct Neighborhood<'a> {
    pub user: Vec<Neighbor<'a>>,
    pub global: Vec<Neighbor<'a>>,
}

/// Whether `o` lies within the context window of `query`.
///
/// The window spans `context_sigmas` kernel widths on both axes.
pub fn in_context(query: &Query, o: &Observation, cfg: &KernelConfig) -> bool {
    (o.duration - query.duration).abs() <= cfg.context_sigmas * cfg.sigma_duration
        && (o.temperature - query.temperature).abs() <= cfg.context_sigmas * cfg.sigma_temperature
}

/// Weigh every observation in `history` against `query`.
pub fn weigh<'a>(
    query: &Query,
    history: &'a History,
    now: DateTime<Utc>,
    scale: &SatisfactionScale,
    kernel: &KernelConfig,
    anchor: &AnchorConfig,
) -> Neighborhood<'a> {
    let cell = |o: &Observation| {
        bucket_key(o.duration, o.temperature, kernel.bucket_duration, kernel.bucket_temperature)
    };
    let mut cells: HashMap<(i64, i64), usize> = HashMap::new();
    for o in history.user.iter().chain(history.global.iter()) {
        *cells.entry(cell(o)).or_insert(0) += 1;
    }

    let weigh_one = |o: &'a Observation, source: Source| -> Neighbor<'a> {
        let deviation = scale.deviation(o.satisfaction);
        let similarity = gaussian(o.duration - query.duration, kernel.sigma_duration)
            * gaussian(o.temperature - query.temperature, kernel.sigma_temperature);
        let recency = half_life_decay(o.age_days(now), kernel.recency_half_life_days);
        let reliability = gaussian(deviation, kernel.reliability_sigma);
        let crowd = cells.get(&cell(o)).copied().unwrap_or(1).max(1) as f64;

        let mut weight = similarity * recency * reliability / crowd.sqrt();
        if source == Source::User {
            weight *= kernel.user_boost;
        }
        let is_anchor = deviation.abs() <= anchor.tolerance;
        if is_anchor {
            weight *= anchor.boost;
        }

        Neighbor {
            observation: o,
            weight,
            anchor: is_anchor,
        }
    };

    let user = history
        .user
        .iter()
        .map(|o| weigh_one(o, Source::User))
        .collect();
    let global = history
        .global
        .iter()
        .map(|o| weigh_one(o, Source::Global))
        .collect();

    Neighborhood {
        user: select(user, kernel),
        global: select(global, kernel),
    }
}

/// Keep the heaviest neighbours of one source.
///
/// Returns an empty list when the whole source weighs less than
/// `min_total_weight`.
fn select<'a>(neighbors: Vec<Neighbor<'a>>, kernel: &KernelConfig) -> Vec<Neighbor<'a>> {
    let selected = top_k(neighbors, kernel.k.max(kernel.min_k));
    let total: f64 = selected.iter().map(|n| n.weight).sum();
    if total < kernel.min_total_weight {
        if !selected.is_empty() {
            tracing::trace!(
                count = selected.len(),
                total,
                "discarding source with negligible weight"
            );
        }
        return Vec::new();
    }
    selected
}

/// The `k` heaviest neighbours, heaviest first. Zero weights are dropped.
pub fn top_k<'a>(mut neighbors: Vec<Neighbor<'a>>, k: usize) -> Vec<Neighbor<'a>> {
    neighbors.retain(|n| n.weight > 0.0 && n.weight.is_finite());
    neighbors.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    neighbors.truncate(k);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn obs(
        owner: &str,
        d: f64,
        t: f64,
        h: f64,
        s: f64,
        days_ago: i64,
        now: DateTime<Utc>,
    ) -> Observation {
        Observation {
            id: format!("{owner}-{d}-{t}-{h}-{s}-{days_ago}"),
            owner: owner.into(),
            occurred_at: now - Duration::days(days_ago),
            duration: d,
            temperature: t,
            heating_time: h,
            satisfaction: s,
        }
    }

    fn weigh_default<'a>(
        query: &Query,
        history: &'a History,
        now: DateTime<Utc>,
    ) -> Neighborhood<'a> {
        weigh(
            query,
            history,
            now,
            &SatisfactionScale::default(),
            &KernelConfig::default(),
            &AnchorConfig::default(),
        )
    }

    #[test]
    fn closer_conditions_weigh_more() {
        let now = Utc::now();
        let history = History::new(
            vec![],
            vec![
                obs("b", 15.0, 22.0, 10.0, 40.0, 1, now),
                obs("b", 25.0, 22.0, 10.0, 40.0, 1, now),
            ],
        );
        let n = weigh_default(&Query::new("a", 15.0, 22.0), &history, now);
        assert_eq!(n.global.len(), 2);
        assert_eq!(n.global[0].observation.duration, 15.0);
        assert!(n.global[0].weight > n.global[1].weight);
    }

    #[test]
    fn user_observations_are_boosted() {
        let now = Utc::now();
        let history = History::new(
            vec![obs("a", 15.0, 22.0, 10.0, 40.0, 1, now)],
            vec![obs("b", 15.0, 22.0, 10.0, 40.0, 1, now)],
        );
        let n = weigh_default(&Query::new("a", 15.0, 22.0), &history, now);
        assert!((n.user[0].weight / n.global[0].weight - 2.0).abs() < 1e-9);
    }

    #[test]
    fn unit_boost_disables_personalisation() {
        let now = Utc::now();
        let history = History::new(
            vec![obs("a", 15.0, 22.0, 10.0, 40.0, 1, now)],
            vec![obs("b", 15.0, 22.0, 10.0, 40.0, 1, now)],
        );
        let kernel = KernelConfig {
            user_boost: 1.0,
            ..Default::default()
        };
        let n = weigh(
            &Query::new("a", 15.0, 22.0),
            &history,
            now,
            &SatisfactionScale::default(),
            &kernel,
            &AnchorConfig::default(),
        );
        assert!((n.user[0].weight - n.global[0].weight).abs() < 1e-12);
    }

    #[test]
    fn anchors_are_marked_and_boosted() {
        let now = Utc::now();
        let history = History::new(
            vec![],
            vec![
                obs("b", 15.0, 22.0, 10.0, 51.0, 1, now),
                obs("c", 15.0, 22.0, 10.0, 49.0, 1, now),
            ],
        );
        let n = weigh_default(&Query::new("a", 15.0, 22.0), &history, now);
        assert!(n.global.iter().all(|x| x.anchor));

        let plain = History::new(vec![], vec![obs("b", 15.0, 22.0, 10.0, 60.0, 1, now)]);
        let m = weigh_default(&Query::new("a", 15.0, 22.0), &plain, now);
        assert!(!m.global[0].anchor);
    }

    #[test]
    fn crowded_cells_are_dampened() {
        let now = Utc::now();
        let crowded = History::new(
            vec![],
            (0..4).map(|_| obs("b", 15.0, 22.0, 10.0, 40.0, 1, now)).collect(),
        );
        let single = History::new(vec![], vec![obs("b", 15.0, 22.0, 10.0, 40.0, 1, now)]);
        let q = Query::new("a", 15.0, 22.0);
        let a = weigh_default(&q, &crowded, now);
        let b = weigh_default(&q, &single, now);
        assert!((a.global[0].weight * 2.0 - b.global[0].weight).abs() < 1e-12);
    }

    #[test]
    fn older_observations_decay() {
        let now = Utc::now();
        let history = History::new(
            vec![],
            vec![
                obs("b", 15.0, 22.0, 10.0, 40.0, 0, now),
                obs("c", 15.4, 22.4, 10.0, 40.0, 5, now),
            ],
        );
        let n = weigh_default(&Query::new("a", 15.0, 22.0), &history, now);
        assert!(n.global[0].observation.owner == "b");
        assert!(n.global[1].weight < n.global[0].weight * 0.55);
    }

    #[test]
    fn future_timestamps_do_not_inflate_weight() {
        let now = Utc::now();
        let history = History::new(vec![], vec![obs("b", 15.0, 22.0, 10.0, 40.0, -2, now)]);
        let n = weigh_default(&Query::new("a", 15.0, 22.0), &history, now);
        let reliability = gaussian(SatisfactionScale::default().deviation(40.0), 0.44);
        assert!((n.global[0].weight - reliability).abs() < 1e-12);
    }

    #[test]
    fn top_k_keeps_heaviest() {
        let now = Utc::now();
        let history = History::new(
            vec![],
            (0..40)
                .map(|i| obs("b", 10.0 + i as f64 * 0.5, 22.0, 10.0, 40.0, 1, now))
                .collect(),
        );
        let n = weigh_default(&Query::new("a", 10.0, 22.0), &history, now);
        assert_eq!(n.global.len(), 25);
        assert!(n.global.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert_eq!(n.global[0].observation.duration, 10.0);
    }

    #[test]
    fn negligible_source_counts_as_empty() {
        let now = Utc::now();
        let history = History::new(vec![], vec![obs("b", 15.0, 22.0, 10.0, 40.0, 1, now)]);
        let kernel = KernelConfig {
            min_total_weight: 10.0,
            ..Default::default()
        };
        let n = weigh(
            &Query::new("a", 15.0, 22.0),
            &history,
            now,
            &SatisfactionScale::default(),
            &kernel,
            &AnchorConfig::default(),
        );
        assert!(n.user.is_empty() && n.global.is_empty());
    }

    #[test]
    fn context_window_spans_two_sigmas() {
        let now = Utc::now();
        let cfg = KernelConfig::default();
        let q = Query::new("a", 15.0, 22.0);
        assert!(in_context(&q, &obs("a", 23.0, 16.0, 10.0, 50.0, 0, now), &cfg));
        assert!(!in_context(&q, &obs("a", 23.5, 22.0, 10.0, 50.0, 0, now), &cfg));
        assert!(!in_context(&q, &obs("a", 15.0, 28.5, 10.0, 50.0, 0, now), &cfg));
    }
}
