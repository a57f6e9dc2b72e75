//! Depth and path computations over a [`GraphSnapshot`].
//!
//! All traversals are depth-first with a per-branch visited set: a node
//! already on the current branch stops that branch, but the same node may
//! appear again on a sibling branch. The walk uses an explicit stack, so
//! the visited set is exactly the nodes on the stack and is undone on pop.

use std::collections::HashSet;

use serde::Serialize;
use storycast_core::ids::NodeId;

use super::snapshot::GraphSnapshot;

/// Title given to padding entries.
pub const PLACEHOLDER_TITLE: &str = "?";

/// One entry of the path shown to the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    /// The node, or `None` for a placeholder.
    pub node_id: Option<NodeId>,
    /// Node title, or [`PLACEHOLDER_TITLE`].
    pub title: String,
    /// Already walked in this session.
    pub visited: bool,
    /// The last walked node.
    pub is_current: bool,
    /// Not reachable from the current position.
    pub unreachable: bool,
}

impl PathEntry {
    fn walked(graph: &GraphSnapshot, node_id: NodeId, is_current: bool) -> Self {
        Self {
            node_id: Some(node_id),
            title: graph.title(node_id).unwrap_or_default().to_owned(),
            visited: true,
            is_current,
            unreachable: false,
        }
    }

    fn ahead(graph: &GraphSnapshot, node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            title: graph.title(node_id).unwrap_or_default().to_owned(),
            visited: false,
            is_current: false,
            unreachable: false,
        }
    }

    fn placeholder() -> Self {
        Self {
            node_id: None,
            title: PLACEHOLDER_TITLE.to_owned(),
            visited: false,
            is_current: false,
            unreachable: true,
        }
    }

    /// Returns `true` for padding entries.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.node_id.is_none()
    }
}

struct Frame {
    children: Vec<NodeId>,
    next: usize,
    blocked: bool,
}

/// Calls `on_path` once for every maximal branch starting at `start`: a
/// branch ends at a node with no resolved route, and also at a node one of
/// whose children is already on the branch.
fn for_each_maximal_path(
    graph: &GraphSnapshot,
    start: NodeId,
    mut on_path: impl FnMut(&[NodeId]),
) {
    if !graph.contains(start) {
        return;
    }
    let mut path = vec![start];
    let mut on_branch = HashSet::from([start]);
    let mut stack = vec![Frame {
        children: graph.targets(start),
        next: 0,
        blocked: false,
    }];

    while let Some(frame) = stack.last_mut() {
        if let Some(&child) = frame.children.get(frame.next) {
            frame.next += 1;
            if on_branch.contains(&child) {
                frame.blocked = true;
                continue;
            }
            path.push(child);
            on_branch.insert(child);
            stack.push(Frame {
                children: graph.targets(child),
                next: 0,
                blocked: false,
            });
            continue;
        }

        if frame.children.is_empty() || frame.blocked {
            on_path(path.as_slice());
        }
        stack.pop();
        if let Some(done) = path.pop() {
            on_branch.remove(&done);
        }
    }
}

/// Greatest number of nodes along any branch from `root`. Zero when the
/// root is not in the snapshot.
#[must_use]
pub fn max_depth(graph: &GraphSnapshot, root: NodeId) -> usize {
    let mut deepest = 0;
    for_each_maximal_path(graph, root, |path| deepest = deepest.max(path.len()));
    deepest
}

/// Every branch from `from` to a leaf or to the point where it would
/// revisit a node, in route order. The repeated node is not included.
#[must_use]
pub fn all_forward_paths(graph: &GraphSnapshot, from: NodeId) -> Vec<Vec<NodeId>> {
    let mut paths = Vec::new();
    for_each_maximal_path(graph, from, |path| paths.push(path.to_vec()));
    paths
}

/// First longest path among `paths`.
#[must_use]
pub fn longest(paths: &[Vec<NodeId>]) -> Option<&[NodeId]> {
    paths
        .iter()
        .rev()
        .max_by_key(|path| path.len())
        .map(Vec::as_slice)
}

/// The part of `path` that lies ahead of `history`: the seam with the
/// current node is dropped and the rest stops at the first walked node,
/// because moving there truncates history rather than extending it.
fn unwalked<'a>(path: &'a [NodeId], history: &[NodeId]) -> &'a [NodeId] {
    let seam = usize::from(path.first().is_some_and(|first| history.last() == Some(first)));
    let ahead = &path[seam..];
    let stop = ahead
        .iter()
        .position(|node_id| history.contains(node_id))
        .unwrap_or(ahead.len());
    &ahead[..stop]
}

/// Longest forward extension of `history` among `forward`, measured after
/// each path is cut at the walked prefix. Ties go to the first path.
#[must_use]
pub fn longest_unwalked<'a>(forward: &'a [Vec<NodeId>], history: &[NodeId]) -> &'a [NodeId] {
    forward
        .iter()
        .map(|path| unwalked(path, history))
        .rev()
        .max_by_key(|ahead| ahead.len())
        .unwrap_or_default()
}

/// Builds the displayed path: the walked `history`, then the longest
/// unwalked extension among the `forward` paths from its last node, padded
/// with placeholders to `depth`.
#[must_use]
pub fn assemble_path(
    graph: &GraphSnapshot,
    history: &[NodeId],
    forward: &[Vec<NodeId>],
    depth: usize,
) -> Vec<PathEntry> {
    let Some((&current, walked)) = history.split_last() else {
        return Vec::new();
    };

    let mut entries: Vec<PathEntry> = walked
        .iter()
        .map(|&node_id| PathEntry::walked(graph, node_id, false))
        .collect();
    entries.push(PathEntry::walked(graph, current, true));
    entries.extend(
        longest_unwalked(forward, history)
            .iter()
            .map(|&node_id| PathEntry::ahead(graph, node_id)),
    );

    while entries.len() < depth {
        entries.push(PathEntry::placeholder());
    }
    entries
}

/// Unmemoized displayed path for `history` in the scenario rooted at `root`.
#[must_use]
pub fn longest_path(
    graph: &GraphSnapshot,
    root: Option<NodeId>,
    history: &[NodeId],
) -> Vec<PathEntry> {
    let (Some(root), Some(&current)) = (root, history.last()) else {
        return Vec::new();
    };
    let forward = all_forward_paths(graph, current);
    assemble_path(graph, history, &forward, max_depth(graph, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storycast_core::ids::RouteId;
    use storycast_core::node::{Node, Route};
    use storycast_test_support::StoryGraph;

    fn snapshot(graph: &StoryGraph, root: &str) -> GraphSnapshot {
        GraphSnapshot::new(Some(graph.id(root)), 1, graph.nodes())
    }

    fn titles(graph: &GraphSnapshot, paths: &[Vec<NodeId>]) -> Vec<Vec<String>> {
        paths
            .iter()
            .map(|path| {
                path.iter()
                    .map(|id| graph.title(*id).unwrap().to_owned())
                    .collect()
            })
            .collect()
    }

    fn branching_story() -> StoryGraph {
        StoryGraph::new()
            .root("A")
            .route("A", "B")
            .route("A", "C")
            .route("B", "D")
    }

    #[test]
    fn test_branching_story_depth_and_paths() {
        // Arrange
        let graph = branching_story();
        let snap = snapshot(&graph, "A");

        // Act
        let depth = max_depth(&snap, graph.id("A"));
        let paths = all_forward_paths(&snap, graph.id("A"));

        // Assert
        assert_eq!(depth, 3);
        assert_eq!(titles(&snap, &paths), vec![vec!["A", "B", "D"], vec!["A", "C"]]);
    }

    #[test]
    fn test_longest_path_after_moving_to_b() {
        // Arrange
        let graph = branching_story();
        let snap = snapshot(&graph, "A");
        let history = [graph.id("A"), graph.id("B")];

        // Act
        let path = longest_path(&snap, Some(graph.id("A")), &history);

        // Assert
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].node_id, Some(graph.id("A")));
        assert!(path[0].visited && !path[0].is_current);
        assert_eq!(path[1].node_id, Some(graph.id("B")));
        assert!(path[1].visited && path[1].is_current);
        assert_eq!(path[2].node_id, Some(graph.id("D")));
        assert!(!path[2].visited && !path[2].unreachable);
        assert!(path.iter().all(|entry| !entry.is_placeholder()));
    }

    #[test]
    fn test_longest_path_pads_short_branch_with_placeholders() {
        let graph = branching_story();
        let snap = snapshot(&graph, "A");
        let history = [graph.id("A"), graph.id("C")];

        let path = longest_path(&snap, Some(graph.id("A")), &history);

        assert_eq!(path.len(), 3);
        assert!(path[1].is_current);
        assert!(path[2].is_placeholder());
        assert!(path[2].unreachable);
        assert_eq!(path[2].title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_isolated_node_has_depth_one_and_no_placeholders() {
        let graph = StoryGraph::new().root("Lonely").dangling("Lonely");
        let snap = snapshot(&graph, "Lonely");

        let path = longest_path(&snap, Some(graph.id("Lonely")), &[graph.id("Lonely")]);

        assert_eq!(max_depth(&snap, graph.id("Lonely")), 1);
        assert_eq!(path.len(), 1);
        assert!(path[0].is_current);
    }

    #[test]
    fn test_empty_inputs_yield_empty_results() {
        let graph = branching_story();
        let snap = snapshot(&graph, "A");

        assert!(longest_path(&snap, None, &[graph.id("A")]).is_empty());
        assert!(longest_path(&snap, Some(graph.id("A")), &[]).is_empty());
        assert_eq!(max_depth(&GraphSnapshot::default(), graph.id("A")), 0);
        assert!(all_forward_paths(&GraphSnapshot::default(), graph.id("A")).is_empty());
    }

    #[test]
    fn test_back_edge_stops_branch_before_repeat() {
        let graph = StoryGraph::new().route("A", "B").route("B", "A");
        let snap = snapshot(&graph, "A");

        let paths = all_forward_paths(&snap, graph.id("A"));

        assert_eq!(titles(&snap, &paths), vec![vec!["A", "B"]]);
        assert_eq!(max_depth(&snap, graph.id("A")), 2);
    }

    #[test]
    fn test_self_loop_is_a_single_node_path() {
        let graph = StoryGraph::new().route("A", "A");
        let snap = snapshot(&graph, "A");

        assert_eq!(titles(&snap, &all_forward_paths(&snap, graph.id("A"))), vec![vec!["A"]]);
        assert_eq!(max_depth(&snap, graph.id("A")), 1);
    }

    #[test]
    fn test_shared_descendant_appears_on_sibling_branches() {
        let graph = StoryGraph::new()
            .route("A", "B")
            .route("A", "C")
            .route("B", "D")
            .route("C", "D");
        let snap = snapshot(&graph, "A");

        let paths = all_forward_paths(&snap, graph.id("A"));

        assert_eq!(
            titles(&snap, &paths),
            vec![vec!["A", "B", "D"], vec!["A", "C", "D"]]
        );
    }

    #[test]
    fn test_forward_part_stops_at_walked_node() {
        // Arrange: B leads back to A, which is already walked.
        let graph = StoryGraph::new().route("A", "B").route("B", "A");
        let snap = snapshot(&graph, "A");
        let history = [graph.id("A"), graph.id("B")];

        // Act
        let path = longest_path(&snap, Some(graph.id("A")), &history);

        // Assert
        assert_eq!(path.len(), 2);
        assert!(path.iter().all(|entry| entry.visited));
    }

    #[test]
    fn test_shorter_branch_wins_when_longest_runs_into_history() {
        // Arrange: from B the longer branch B -> A -> C -> E re-enters the
        // walked prefix at once, while B -> X stays ahead of it.
        let graph = StoryGraph::new()
            .root("A")
            .route("A", "B")
            .route("A", "C")
            .route("C", "E")
            .route("B", "A")
            .route("B", "X");
        let snap = snapshot(&graph, "A");
        let history = [graph.id("A"), graph.id("B")];

        // Act
        let path = longest_path(&snap, Some(graph.id("A")), &history);

        // Assert
        let ahead: Vec<_> = path.iter().filter(|entry| !entry.visited).collect();
        assert_eq!(ahead.len(), 1);
        assert_eq!(ahead[0].node_id, Some(graph.id("X")));
        assert!(!ahead[0].unreachable);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_longest_unwalked_cuts_before_choosing() {
        let (a, b, c, x) = (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        let forward = vec![vec![b, a, c], vec![b, x]];

        assert_eq!(longest_unwalked(&forward, &[a, b]), [x].as_slice());
        assert!(longest_unwalked(&[], &[a, b]).is_empty());
    }

    #[test]
    fn test_longest_prefers_first_on_ties() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let paths = vec![vec![a, b], vec![a, c]];

        assert_eq!(longest(&paths), Some([a, b].as_slice()));
        assert_eq!(longest(&[]), None);
    }

    fn graph_from_edges(count: usize, edges: &[(usize, usize)]) -> (Vec<NodeId>, GraphSnapshot) {
        let ids: Vec<NodeId> = (0..count).map(|_| NodeId::new()).collect();
        let nodes = ids.iter().enumerate().map(|(index, &id)| Node {
            id,
            title: format!("n{index}"),
            routes: edges
                .iter()
                .filter(|(from, _)| *from == index)
                .map(|&(_, to)| Route {
                    id: RouteId::new(),
                    title: String::new(),
                    from_node_id: id,
                    to_node_id: Some(ids[to]),
                })
                .collect(),
        });
        let snapshot = GraphSnapshot::new(Some(ids[0]), 1, nodes.collect::<Vec<_>>());
        (ids, snapshot)
    }

    fn brute_force_depth(index: usize, edges: &[(usize, usize)]) -> usize {
        1 + edges
            .iter()
            .filter(|(from, _)| *from == index)
            .map(|&(_, to)| brute_force_depth(to, edges))
            .max()
            .unwrap_or(0)
    }

    fn arb_graph(acyclic: bool) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1usize..7).prop_flat_map(move |count| {
            let edges = proptest::collection::vec((0..count, 0..count), 0..14).prop_map(
                move |edges| {
                    edges
                        .into_iter()
                        .filter(|(from, to)| !acyclic || from < to)
                        .collect::<Vec<_>>()
                },
            );
            (Just(count), edges)
        })
    }

    proptest! {
        #[test]
        fn max_depth_matches_longest_root_path_on_dags((count, edges) in arb_graph(true)) {
            let (ids, snap) = graph_from_edges(count, &edges);
            prop_assert_eq!(max_depth(&snap, ids[0]), brute_force_depth(0, &edges));
        }

        #[test]
        fn traversal_terminates_with_simple_paths_on_cyclic_graphs((count, edges) in arb_graph(false)) {
            let (ids, snap) = graph_from_edges(count, &edges);

            let paths = all_forward_paths(&snap, ids[0]);
            let depth = max_depth(&snap, ids[0]);

            prop_assert!(!paths.is_empty());
            prop_assert!(depth <= count);
            prop_assert_eq!(depth, paths.iter().map(Vec::len).max().unwrap_or(0));
            for path in &paths {
                prop_assert_eq!(path[0], ids[0]);
                let distinct: HashSet<NodeId> = path.iter().copied().collect();
                prop_assert_eq!(distinct.len(), path.len());
                for pair in path.windows(2) {
                    prop_assert!(snap.targets(pair[0]).contains(&pair[1]));
                }
            }
        }

        #[test]
        fn longest_path_is_idempotent((count, edges) in arb_graph(false)) {
            let (ids, snap) = graph_from_edges(count, &edges);
            let history = [ids[0]];

            let first = longest_path(&snap, Some(ids[0]), &history);
            let second = longest_path(&snap, Some(ids[0]), &history);

            prop_assert_eq!(first.len(), max_depth(&snap, ids[0]));
            prop_assert_eq!(first, second);
        }
    }
}
