//! Forward Dijkstra from the start node

use nav_common::{Error, Result};

use super::{finish, Frontier, SearchBudget, SearchResult, SearchState};
use crate::cost::EdgeCost;
use crate::graph::{NodeIx, RoutingGraph};

/// Lowest-cost path from `start` to `end`.
///
/// Terminates as soon as `end` is settled. Forbidden edges are never
/// relaxed. Fails with [`Error::NoRouteFound`] once every reachable node has
/// been settled without meeting `end`.
pub fn shortest_path<C: EdgeCost>(
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
        "dijkstra finished"
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
    let mut frontier = Frontier::new(graph.node_count(), start);
    *state = SearchState::Expanding;

    while let Some((u, d)) = frontier.pop() {
        budget.check(frontier.n_settled())?;

        if u == end {
            let mut edges = Vec::new();
            let mut current = end;
            while let Some(e) = frontier.parent(current) {
                edges.push(e);
                current = graph.edge(e).source;
            }
            edges.reverse();

            return Ok(SearchResult {
                start,
                end,
                edges,
                duration: d,
                settled: frontier.n_settled(),
            });
        }

        for (e, v) in graph.neighbors(u) {
            if let Some(c) = cost.cost(e) {
                frontier.relax(v, e, d + c);
            }
        }
    }

    Err(Error::NoRouteFound)
}
