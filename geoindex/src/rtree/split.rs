//! Node splitting.
//!
//! A split works purely on the envelopes of the overflowing node's children
//! and returns two groups of positions into that slice. The caller moves the
//! entries (leaf) or child links (internal) accordingly, so leaves and
//! internal nodes share one implementation.

use rand::Rng;

use super::config::SeedPicker;
use crate::envelope::Envelope;

/// Splits `envelopes` into two groups of positions, each holding at least
/// `min_entries` elements.
pub(crate) fn partition<R: Rng + ?Sized>(
    envelopes: &[Envelope],
    min_entries: usize,
    picker: SeedPicker,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    assert!(
        envelopes.len() >= 2 * min_entries && envelopes.len() >= 2,
        "cannot split {} children with min_entries {}",
        envelopes.len(),
        min_entries
    );

    let (seed_a, seed_b) = match picker {
        SeedPicker::Quadratic => quadratic_seeds(envelopes),
        SeedPicker::Linear => linear_seeds(envelopes),
    };
    debug_assert_ne!(seed_a, seed_b);

    let mut first = vec![seed_a];
    let mut second = vec![seed_b];
    let mut first_env = envelopes[seed_a];
    let mut second_env = envelopes[seed_b];

    let mut remaining: Vec<usize> = (0..envelopes.len())
        .filter(|&i| i != seed_a && i != seed_b)
        .collect();

    while !remaining.is_empty() {
        // One side needs everything that is left to reach the minimum
        if first.len() + remaining.len() <= min_entries {
            first.append(&mut remaining);
            break;
        }
        if second.len() + remaining.len() <= min_entries {
            second.append(&mut remaining);
            break;
        }

        let pos = match picker {
            SeedPicker::Quadratic => quadratic_next(envelopes, &remaining, &first_env, &second_env),
            SeedPicker::Linear => 0,
        };
        let candidate = remaining.remove(pos);
        let env = &envelopes[candidate];

        if prefers_first(&first_env, first.len(), &second_env, second.len(), env, rng) {
            first.push(candidate);
            first_env.merge(env);
        } else {
            second.push(candidate);
            second_env.merge(env);
        }
    }

    (first, second)
}

/// Group choice for one child: least enlargement, then smaller resulting
/// area, then fewer members, then a coin flip.
fn prefers_first<R: Rng + ?Sized>(
    first_env: &Envelope,
    first_len: usize,
    second_env: &Envelope,
    second_len: usize,
    env: &Envelope,
    rng: &mut R,
) -> bool {
    let d1 = first_env.enlargement(env);
    let d2 = second_env.enlargement(env);
    if d1 != d2 {
        return d1 < d2;
    }

    let a1 = first_env.area() + d1;
    let a2 = second_env.area() + d2;
    if a1 != a2 {
        return a1 < a2;
    }

    if first_len != second_len {
        return first_len < second_len;
    }

    rng.gen_bool(0.5)
}

/// The pair whose common envelope wastes the most area.
fn quadratic_seeds(envelopes: &[Envelope]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_waste = f64::NEG_INFINITY;

    for i in 0..envelopes.len() {
        for j in (i + 1)..envelopes.len() {
            let a = &envelopes[i];
            let b = &envelopes[j];
            let waste = a.union(b).area() - a.area() - b.area();
            if waste > best_waste {
                best_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}

/// The remaining child with the strongest preference for one group.
fn quadratic_next(
    envelopes: &[Envelope],
    remaining: &[usize],
    first_env: &Envelope,
    second_env: &Envelope,
) -> usize {
    let mut best_pos = 0;
    let mut best_diff = f64::NEG_INFINITY;

    for (pos, &i) in remaining.iter().enumerate() {
        let diff = (first_env.enlargement(&envelopes[i]) - second_env.enlargement(&envelopes[i])).abs();
        if diff > best_diff {
            best_diff = diff;
            best_pos = pos;
        }
    }
    best_pos
}

/// Greatest normalized separation along either axis. Falls back to the
/// first two children when every axis is degenerate.
fn linear_seeds(envelopes: &[Envelope]) -> (usize, usize) {
    let axes: [fn(&Envelope) -> (f64, f64); 2] =
        [|e| (e.min_x, e.max_x), |e| (e.min_y, e.max_y)];

    let mut best: Option<(f64, usize, usize)> = None;

    for bounds in axes {
        let mut highest_low = 0;
        let mut min_low = f64::INFINITY;
        let mut max_high = f64::NEG_INFINITY;

        for (i, env) in envelopes.iter().enumerate() {
            let (low, high) = bounds(env);
            if low > bounds(&envelopes[highest_low]).0 {
                highest_low = i;
            }
            min_low = min_low.min(low);
            max_high = max_high.max(high);
        }

        let mut lowest_high: Option<usize> = None;
        for (i, env) in envelopes.iter().enumerate() {
            if i == highest_low {
                continue;
            }
            let high = bounds(env).1;
            if lowest_high.map_or(true, |j| high < bounds(&envelopes[j]).1) {
                lowest_high = Some(i);
            }
        }
        let Some(lowest_high) = lowest_high else {
            continue;
        };

        let extent = max_high - min_low;
        if extent <= 0.0 {
            continue;
        }

        let separation =
            (bounds(&envelopes[highest_low]).0 - bounds(&envelopes[lowest_high]).1) / extent;
        if best.map_or(true, |(s, _, _)| separation > s) {
            best = Some((separation, highest_low, lowest_high));
        }
    }

    best.map(|(_, a, b)| (a, b)).unwrap_or((0, 1))
}
