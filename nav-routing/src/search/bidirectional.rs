//! Bidirectional Dijkstra
//!
//! A forward search from the start over outgoing edges and a backward search
//! from the end over incoming edges, advanced alternately by whichever side
//! has the cheaper next node. The search stops once the two queue heads
//! together cost at least as much as the best meeting found so far.

use nav_common::{Error, Result};

use super::{finish, Frontier, SearchBudget, SearchResult, SearchState};
use crate::cost::EdgeCost;
use crate::graph::{EdgeIx, NodeIx, RoutingGraph};

pub fn shortest_path_bidirectional<C: EdgeCost>(
    graph: &RoutingGraph,
    cost: &C,
    start: NodeIx,
    end: NodeIx,
    budget: &SearchBudget,
) -> Result<SearchResult> {
    let mut state = SearchState::Initialized;
    let result = run(graph, cost, start, end, budget, &mut state);
    finish(&mut state, &result);

    tracing::debug!(
        start,
        end,
        ?state,
        settled = result.as_ref().map_or(0, |r| r.settled),
        "bidirectional search finished"
    );
    result
}

fn run<C: EdgeCost>(
    graph: &RoutingGraph,
    cost: &C,
    start: NodeIx,
    end: NodeIx,
    budget: &SearchBudget,
    state: &mut SearchState,
) -> Result<SearchResult> {
    if start == end {
        return Ok(SearchResult {
            start,
            end,
            edges: Vec::new(),
            duration: 0.0,
            settled: 0,
        });
    }

    let n = graph.node_count();
    let mut fwd = Frontier::new(n, start);
    let mut bwd = Frontier::new(n, end);
    *state = SearchState::Expanding;

    let mut best = f64::INFINITY;
    let mut meeting: Option<NodeIx> = None;

    loop {
        let top_f = fwd.peek_cost();
        let top_b = bwd.peek_cost();
        let (tf, tb) = match (top_f, top_b) {
            (None, None) => break,
            (f, b) => (f.unwrap_or(f64::INFINITY), b.unwrap_or(f64::INFINITY)),
        };
        if tf + tb >= best {
            break;
        }

        budget.check(fwd.n_settled() + bwd.n_settled() + 1)?;

        if tf <= tb {
            let Some((u, d)) = fwd.pop() else { break };
            for (e, v) in graph.neighbors(u) {
                let Some(c) = cost.cost(e) else { continue };
                fwd.relax(v, e, d + c);
                let total = fwd.dist(v) + bwd.dist(v);
                if total < best {
                    best = total;
                    meeting = Some(v);
                }
            }
        } else {
            let Some((u, d)) = bwd.pop() else { break };
            for (e, v) in graph.reverse_neighbors(u) {
                let Some(c) = cost.cost(e) else { continue };
                bwd.relax(v, e, d + c);
                let total = fwd.dist(v) + bwd.dist(v);
                if total < best {
                    best = total;
                    meeting = Some(v);
                }
            }
        }
    }

    let Some(meet) = meeting else {
        return Err(Error::NoRouteFound);
    };

    let edges = join_paths(graph, &fwd, &bwd, start, end, meet);
    Ok(SearchResult {
        start,
        end,
        edges,
        duration: best,
        settled: fwd.n_settled() + bwd.n_settled(),
    })
}

/// Forward parents lead from the meeting node back to `start`, backward
/// parents lead from it on to `end`.
fn join_paths(
    graph: &RoutingGraph,
    fwd: &Frontier,
    bwd: &Frontier,
    start: NodeIx,
    end: NodeIx,
    meet: NodeIx,
) -> Vec<EdgeIx> {
    let mut edges = Vec::new();

    let mut current = meet;
    while current != start {
        let Some(e) = fwd.parent(current) else { break };
        edges.push(e);
        current = graph.edge(e).source;
    }
    edges.reverse();

    let mut current = meet;
    while current != end {
        let Some(e) = bwd.parent(current) else { break };
        edges.push(e);
        current = graph.edge(e).target;
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::super::dijkstra::shortest_path;
    use super::super::test_support::{ladder, node, TableCost};
    use super::*;
    use crate::cost::{CostModel, RouteOptions};
    use crate::overlay::WeightOverlay;
    use crate::profile::Mode;

    #[test]
    fn test_matches_dijkstra_cost() {
        let g = ladder();
        let overlay = WeightOverlay::new();
        overlay.set(12, 3.0, &g).unwrap();
        let opts = RouteOptions::default();
        let model = CostModel::new(&g, &overlay, Mode::Car, &opts);
        let budget = SearchBudget::unlimited();

        for from in [101, 102, 201, 204] {
            for to in [104, 203, 101] {
                let (s, t) = (node(&g, from), node(&g, to));
                let uni = shortest_path(&g, &model, s, t, &budget).unwrap();
                let bi = shortest_path_bidirectional(&g, &model, s, t, &budget).unwrap();
                assert!((uni.duration - bi.duration).abs() < 1e-6, "{from}->{to}");

                // The joined path is connected and costs what was reported
                let sum: f64 = bi.edges.iter().map(|&e| model.traverse_cost(e).seconds().unwrap()).sum();
                assert!((sum - bi.duration).abs() < 1e-6);
                if let (Some(&first), Some(&last)) = (bi.edges.first(), bi.edges.last()) {
                    assert_eq!(g.edge(first).source, s);
                    assert_eq!(g.edge(last).target, t);
                }
                for pair in bi.edges.windows(2) {
                    assert_eq!(g.edge(pair[0]).target, g.edge(pair[1]).source);
                }
            }
        }
    }

    #[test]
    fn test_same_node() {
        let g = ladder();
        let costs = TableCost(vec![Some(1.0); g.edge_count()]);
        let s = node(&g, 102);
        let r = shortest_path_bidirectional(&g, &costs, s, s, &SearchBudget::unlimited()).unwrap();
        assert!(r.edges.is_empty());
    }

    #[test]
    fn test_unreachable() {
        let g = ladder();
        let costs = TableCost(vec![None; g.edge_count()]);
        let err = shortest_path_bidirectional(
            &g,
            &costs,
            node(&g, 101),
            node(&g, 204),
            &SearchBudget::unlimited(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoRouteFound));
    }
}
