//! Monotone envelope over a grid of conditions.
//!
//! A longer shower never needs less heating and a warmer day never needs
//! more. Local stages (step clamp, streak amplification, pattern override)
//! and the query-dependent user/global mix do not guarantee that on their
//! own, so the final estimate is read from a fixed grid of conditions:
//! each grid value is reduced over every point it dominates, and the result
//! is interpolated bilinearly at the query. The grid does not move with the
//! query, so two queries always see nested point sets and the order between
//! them holds exactly.
//!
//! Grid indices grow with duration (`i`) and with falling temperature
//! (`j`). Point `(i', j')` is dominated by `(i, j)` when `i' <= i` and
//! `j' <= j`, i.e. it is a shorter-or-equal shower on a warmer-or-equal day.

use super::config::MonotoneConfig;
use crate::observation::Query;

#[derive(Debug, Clone, Copy)]
pub struct Grid {
    min_duration: f64,
    duration_step: f64,
    max_temperature: f64,
    temperature_step: f64,
    columns: usize,
    rows: usize,
}

/// Grid cell around a query plus its fractional position inside it.
#[derive(Debug, Clone, Copy)]
struct Cell {
    i0: usize,
    i1: usize,
    fu: f64,
    j0: usize,
    j1: usize,
    fv: f64,
}

impl Cell {
    fn interpolate(&self, at: impl Fn(usize, usize) -> f64) -> f64 {
        let lerp = |a: f64, b: f64, f: f64| a + (b - a) * f;
        let warm = lerp(at(self.i0, self.j0), at(self.i1, self.j0), self.fu);
        let cool = lerp(at(self.i0, self.j1), at(self.i1, self.j1), self.fu);
        lerp(warm, cool, self.fv)
    }
}

/// Lower index, upper index and fraction of `position` on an axis of
/// `points` grid points. Positions beyond the axis stick to its ends.
fn axis(position: f64, points: usize) -> (usize, usize, f64) {
    let last = points.saturating_sub(1);
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, last as f64)
    };
    let lo = (position.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = if hi == lo { 0.0 } else { position - lo as f64 };
    (lo, hi, frac)
}

fn count(span: f64, step: f64) -> usize {
    (span / step).floor().max(0.0) as usize + 1
}

impl Grid {
    pub fn new(cfg: &MonotoneConfig) -> Self {
        Self {
            min_duration: cfg.min_duration,
            duration_step: cfg.duration_step,
            max_temperature: cfg.max_temperature,
            temperature_step: cfg.temperature_step,
            columns: count(cfg.max_duration - cfg.min_duration, cfg.duration_step),
            rows: count(cfg.max_temperature - cfg.min_temperature, cfg.temperature_step),
        }
    }

    pub fn points(&self) -> usize {
        self.columns * self.rows
    }

    fn index(&self, i: usize, j: usize) -> usize {
        i * self.rows + j
    }

    fn locate(&self, query: &Query) -> Cell {
        let (i0, i1, fu) = axis(
            (query.duration - self.min_duration) / self.duration_step,
            self.columns,
        );
        let (j0, j1, fv) = axis(
            (self.max_temperature - query.temperature) / self.temperature_step,
            self.rows,
        );
        Cell {
            i0,
            i1,
            fu,
            j0,
            j1,
            fv,
        }
    }

    /// Run `f` at every grid point. `template` supplies the owner; the
    /// conditions are overwritten point by point.
    pub fn evaluate<T>(&self, template: &Query, mut f: impl FnMut(&Query) -> T) -> Vec<T> {
        let mut point = template.clone();
        let mut values = Vec::with_capacity(self.points());
        for i in 0..self.columns {
            point.duration = self.min_duration + i as f64 * self.duration_step;
            for j in 0..self.rows {
                point.temperature = self.max_temperature - j as f64 * self.temperature_step;
                values.push(f(&point));
            }
        }
        values
    }

    /// Smallest monotone function above the grid values `at(index)`: the
    /// largest value over every dominated point, interpolated at `query`.
    pub fn envelope(&self, query: &Query, at: impl Fn(usize) -> f64) -> f64 {
        let cell = self.locate(query);
        let mut best = vec![f64::NEG_INFINITY; self.points()];

        for i in 0..=cell.i1 {
            for j in 0..=cell.j1 {
                let mut value = at(self.index(i, j));
                if i > 0 {
                    value = value.max(best[self.index(i - 1, j)]);
                }
                if j > 0 {
                    value = value.max(best[self.index(i, j - 1)]);
                }
                best[self.index(i, j)] = value;
            }
        }
        cell.interpolate(|i, j| best[self.index(i, j)])
    }

    /// Largest monotone function below the grid values `at(index)`: the
    /// smallest value over every dominating point, interpolated at `query`.
    pub fn ceiling(&self, query: &Query, at: impl Fn(usize) -> f64) -> f64 {
        let cell = self.locate(query);
        let mut best = vec![f64::INFINITY; self.points()];

        for i in (cell.i0..self.columns).rev() {
            for j in (cell.j0..self.rows).rev() {
                let mut value = at(self.index(i, j));
                if i + 1 < self.columns {
                    value = value.min(best[self.index(i + 1, j)]);
                }
                if j + 1 < self.rows {
                    value = value.min(best[self.index(i, j + 1)]);
                }
                best[self.index(i, j)] = value;
            }
        }
        cell.interpolate(|i, j| best[self.index(i, j)])
    }

    /// Monotone estimate at `query` from per-point estimates.
    ///
    /// `None` marks a point without evidence. Such points take no part, and
    /// `fallback` (itself monotone) fills in only as far as the observed
    /// points around the query allow. `(low, high)` must lie at or beyond
    /// the final clamp so they act as minus and plus infinity.
    pub fn resolve(
        &self,
        query: &Query,
        observed: &[Option<f64>],
        fallback: f64,
        (low, high): (f64, f64),
    ) -> f64 {
        let lifted = self.envelope(query, |k| observed[k].unwrap_or(low));
        let capped = self.ceiling(query, |k| observed[k].unwrap_or(high));
        lifted.max(fallback.min(capped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(&MonotoneConfig::default())
    }

    fn linear(q: &Query) -> f64 {
        8.0 + 0.3 * q.duration - 0.1 * q.temperature
    }

    fn envelope_of(g: &Grid, q: &Query, f: impl FnMut(&Query) -> f64) -> f64 {
        let values = g.evaluate(q, f);
        g.envelope(q, |k| values[k])
    }

    #[test]
    fn grid_spans_the_input_limits() {
        assert_eq!(grid().points(), 60 * 51);
    }

    #[test]
    fn monotone_input_is_reproduced() {
        let g = grid();
        let on_grid = Query::new("a", 15.0, 22.0);
        assert_eq!(envelope_of(&g, &on_grid, linear), linear(&on_grid));

        let between = Query::new("a", 15.4, 21.3);
        assert!((envelope_of(&g, &between, linear) - linear(&between)).abs() < 1e-9);
    }

    #[test]
    fn dip_is_lifted_to_shorter_showers() {
        let dip = |q: &Query| {
            if (14.0..=16.0).contains(&q.duration) {
                5.0
            } else {
                10.0
            }
        };
        assert_eq!(envelope_of(&grid(), &Query::new("a", 15.0, 22.0), dip), 10.0);
    }

    #[test]
    fn jagged_input_becomes_monotone() {
        let g = grid();
        let jagged = |q: &Query| {
            10.0 + 4.0 * (q.duration * 1.7).sin() + (q.temperature * 0.9).cos()
        };

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=236 {
            let d = 1.0 + step as f64 * 0.25;
            let value = envelope_of(&g, &Query::new("a", d, 18.5), jagged);
            assert!(value >= previous - 1e-9, "d={d}: {value} < {previous}");
            previous = value;
        }

        let mut previous = f64::INFINITY;
        for step in 0..=200 {
            let t = -50.0 + step as f64 * 0.5;
            let value = envelope_of(&g, &Query::new("a", 33.3, t), jagged);
            assert!(value <= previous + 1e-9, "t={t}: {value} > {previous}");
            previous = value;
        }
    }

    #[test]
    fn ceiling_reaches_shorter_showers_only() {
        let g = grid();
        let q = Query::new("a", 18.0, 20.0);
        let caps = g.evaluate(&q, |p| {
            if (22.0..=38.0).contains(&p.duration) {
                13.5
            } else {
                120.0
            }
        });
        assert_eq!(g.ceiling(&q, |k| caps[k]), 13.5);
        assert_eq!(g.ceiling(&Query::new("a", 30.0, 20.0), |k| caps[k]), 13.5);
        assert_eq!(g.ceiling(&Query::new("a", 45.0, 20.0), |k| caps[k]), 120.0);
    }

    #[test]
    fn unobserved_points_do_not_lift_observed_ones() {
        let g = grid();
        let q = Query::new("a", 15.0, 22.0);
        // evidence only up to 40 degrees, far below the fallback formula
        let observed = g.evaluate(&q, |p| (p.temperature <= 40.0).then_some(3.0));

        assert_eq!(g.resolve(&q, &observed, linear(&q), (0.0, 120.0)), 3.0);
        let warm = Query::new("a", 15.0, 46.0);
        assert_eq!(g.resolve(&warm, &observed, linear(&warm), (0.0, 120.0)), 3.0);
    }

    #[test]
    fn fallback_applies_without_evidence() {
        let g = grid();
        let q = Query::new("a", 15.0, 22.0);
        let observed = vec![None; g.points()];
        assert_eq!(g.resolve(&q, &observed, 10.3, (5.0, 120.0)), 10.3);
    }

    #[test]
    fn queries_beyond_the_grid_stick_to_its_edge() {
        let g = grid();
        let edge = envelope_of(&g, &Query::new("a", 60.0, -50.0), linear);
        assert_eq!(envelope_of(&g, &Query::new("a", 75.0, -80.0), linear), edge);

        let nan = envelope_of(&g, &Query::new("a", f64::NAN, 0.0), linear);
        assert_eq!(nan, envelope_of(&g, &Query::new("a", 1.0, 0.0), linear));
    }
}
