//! Penalty-based alternative routes
//!
//! After the primary path is found, edges of every path seen so far get
//! their cost inflated and the search runs again. A candidate is kept only
//! if it is different enough from every accepted path and not much slower
//! than the primary. Rejected candidates are penalised too, which pushes
//! the next attempt elsewhere. The number of attempts is bounded.

use std::collections::{HashMap, HashSet};

use nav_common::{Error, Result};

use super::{search, SearchAlgorithm, SearchBudget, SearchResult};
use crate::config::AlternativeConfig;
use crate::cost::EdgeCost;
use crate::graph::{EdgeIx, NodeIx, RoutingGraph};

/// Inner cost times the accumulated penalty of each edge
struct Penalized<'a, C> {
    inner: &'a C,
    penalties: &'a HashMap<EdgeIx, f64>,
}

impl<C: EdgeCost> EdgeCost for Penalized<'_, C> {
    fn cost(&self, edge: EdgeIx) -> Option<f64> {
        let base = self.inner.cost(edge)?;
        Some(base * self.penalties.get(&edge).copied().unwrap_or(1.0))
    }
}

/// Fraction of the shorter path's length that both paths share.
///
/// Segments are compared by their polyline, so driving the same street in
/// the opposite direction still counts as shared.
pub fn similarity(graph: &RoutingGraph, a: &SearchResult, b: &SearchResult) -> f64 {
    let len_a = a.distance_m(graph);
    let len_b = b.distance_m(graph);
    let shorter = len_a.min(len_b);
    if shorter <= 0.0 {
        return 1.0;
    }

    let segments_a: HashSet<u32> = a.edges.iter().map(|&e| graph.edge(e).geom).collect();
    let mut counted = HashSet::new();
    let shared: f64 = b
        .edges
        .iter()
        .map(|&e| graph.edge(e))
        .filter(|edge| segments_a.contains(&edge.geom) && counted.insert(edge.geom))
        .map(|edge| edge.length_m)
        .sum();

    (shared / shorter).min(1.0)
}

/// The primary route followed by up to `k` alternatives sorted by duration.
///
/// Durations of alternatives are re-evaluated without penalties. An
/// unreachable destination fails with [`Error::NoRouteFound`]; running out
/// of time while looking for alternatives keeps what was found.
#[allow(clippy::too_many_arguments)]
pub fn find_alternatives<C: EdgeCost>(
    graph: &RoutingGraph,
    cost: &C,
    start: NodeIx,
    end: NodeIx,
    k: usize,
    config: &AlternativeConfig,
    budget: &SearchBudget,
    algorithm: SearchAlgorithm,
) -> Result<Vec<SearchResult>> {
    let primary = search(graph, cost, start, end, budget, algorithm)?;
    if k == 0 || primary.edges.is_empty() {
        return Ok(vec![primary]);
    }

    let mut penalties: HashMap<EdgeIx, f64> = HashMap::new();
    penalize(&mut penalties, &primary.edges, config.penalty_factor);

    let max_duration = primary.duration * config.max_duration_ratio;
    let max_attempts = k * config.max_attempts_per_alternative.max(1);
    let mut accepted = vec![primary];
    let mut attempts = 0;

    while accepted.len() <= k && attempts < max_attempts {
        attempts += 1;

        let penalized = Penalized {
            inner: cost,
            penalties: &penalties,
        };
        let mut candidate = match search(graph, &penalized, start, end, budget, algorithm) {
            Ok(c) => c,
            Err(Error::DeadlineExceeded) => {
                tracing::debug!(attempts, found = accepted.len(), "alternative search out of budget");
                break;
            }
            Err(e) => return Err(e),
        };
        penalize(&mut penalties, &candidate.edges, config.penalty_factor);

        // Penalties are not part of the real duration
        let Some(duration) = candidate.edges.iter().map(|&e| cost.cost(e)).sum::<Option<f64>>()
        else {
            continue;
        };
        candidate.duration = duration;

        if candidate.duration > max_duration {
            tracing::trace!(attempts, duration, max_duration, "alternative too slow");
            continue;
        }
        let too_similar = accepted
            .iter()
            .any(|a| similarity(graph, a, &candidate) >= config.similarity_threshold);
        if too_similar {
            tracing::trace!(attempts, "alternative too similar");
            continue;
        }

        accepted.push(candidate);
    }

    accepted[1..].sort_by(|a, b| a.duration.total_cmp(&b.duration));

    tracing::debug!(
        requested = k,
        found = accepted.len() - 1,
        attempts,
        "alternatives finished"
    );
    Ok(accepted)
}

fn penalize(penalties: &mut HashMap<EdgeIx, f64>, edges: &[EdgeIx], factor: f64) {
    for &e in edges {
        *penalties.entry(e).or_insert(1.0) *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ladder, node, visited, TableCost};
    use super::*;
    use crate::cost::{CostModel, RouteOptions};
    use crate::overlay::WeightOverlay;
    use crate::profile::Mode;

    fn run(k: usize, overlay: &WeightOverlay) -> (RoutingGraph, Vec<SearchResult>) {
        let g = ladder();
        let opts = RouteOptions::default();
        // Rebuild costs against this graph
        let results = {
            let model = CostModel::new(&g, overlay, Mode::Car, &opts);
            find_alternatives(
                &g,
                &model,
                node(&g, 101),
                node(&g, 104),
                k,
                &AlternativeConfig::default(),
                &SearchBudget::unlimited(),
                SearchAlgorithm::Dijkstra,
            )
            .unwrap()
        };
        (g, results)
    }

    #[test]
    fn test_zero_alternatives_returns_primary_only() {
        let (g, routes) = run(0, &WeightOverlay::new());
        assert_eq!(routes.len(), 1);
        assert_eq!(visited(&g, &routes[0]), vec![101, 102, 103, 104]);
    }

    #[test]
    fn test_finds_distinct_alternative() {
        let (g, routes) = run(2, &WeightOverlay::new());
        assert!(routes.len() >= 2, "found {}", routes.len());
        assert!(routes.len() <= 3);

        // Primary first and fastest
        assert_eq!(visited(&g, &routes[0]), vec![101, 102, 103, 104]);
        for alt in &routes[1..] {
            assert!(alt.duration >= routes[0].duration);
        }
        // Pairwise below the threshold
        let threshold = AlternativeConfig::default().similarity_threshold;
        for (i, a) in routes.iter().enumerate() {
            for b in &routes[i + 1..] {
                assert!(similarity(&g, a, b) < threshold);
            }
        }
        // Alternatives sorted by duration
        for pair in routes[1..].windows(2) {
            assert!(pair[0].duration <= pair[1].duration);
        }
    }

    #[test]
    fn test_alternative_duration_excludes_penalties() {
        let (g, routes) = run(1, &WeightOverlay::new());
        let alt = &routes[1];
        // Every ladder edge takes 10 s
        let expected = alt.edges.len() as f64 * 10.0;
        assert!((alt.duration - expected).abs() < 1e-3, "{} vs {}", alt.duration, expected);
        assert!((alt.distance_m(&g) - expected * 10.0).abs() < 1e-2);
    }

    #[test]
    fn test_no_alternative_on_single_path() {
        // Only one street: every re-search finds the same path
        let g = ladder();
        let mut table = vec![None; g.edge_count()];
        for &e in g.edges_of_way(1) {
            table[e as usize] = Some(10.0);
        }
        let routes = find_alternatives(
            &g,
            &TableCost(table),
            node(&g, 101),
            node(&g, 104),
            3,
            &AlternativeConfig::default(),
            &SearchBudget::unlimited(),
            SearchAlgorithm::Dijkstra,
        )
        .unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_unreachable_propagates() {
        let g = ladder();
        let err = find_alternatives(
            &g,
            &TableCost(vec![None; g.edge_count()]),
            node(&g, 101),
            node(&g, 104),
            2,
            &AlternativeConfig::default(),
            &SearchBudget::unlimited(),
            SearchAlgorithm::Bidirectional,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoRouteFound));
    }

    #[test]
    fn test_similarity() {
        let g = ladder();
        let overlay = WeightOverlay::new();
        let opts = RouteOptions::default();
        let model = CostModel::new(&g, &overlay, Mode::Car, &opts);
        let budget = SearchBudget::unlimited();

        let top = super::super::shortest_path(&g, &model, node(&g, 101), node(&g, 104), &budget).unwrap();
        assert_eq!(similarity(&g, &top, &top), 1.0);

        overlay.set(1, 10.0, &g).unwrap();
        let bottom = super::super::shortest_path(&g, &model, node(&g, 101), node(&g, 104), &budget).unwrap();
        assert_eq!(similarity(&g, &top, &bottom), 0.0);
    }
}
