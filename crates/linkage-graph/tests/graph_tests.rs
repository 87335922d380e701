// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use linkage_graph::{GraphError, GraphOp, ObjectGraph};

fn triangle() -> ObjectGraph {
    let mut g = ObjectGraph::new();
    for n in [1, 2, 3] {
        g.add_node(n).expect("node");
    }
    g.add_edge(10, 1, 2).expect("1->2");
    g.add_edge(11, 2, 3).expect("2->3");
    g.add_edge(12, 3, 1).expect("3->1");
    g
}

#[test]
fn adjacency_is_visible_from_both_ends() {
    let g = triangle();
    assert_eq!(g.successors(1).expect("succ"), vec![2]);
    assert_eq!(g.predecessors(1).expect("pred"), vec![3]);
    assert_eq!(g.endpoints(11).expect("edge"), (2, 3));
    g.store().verify().expect("audit");
}

#[test]
fn retargeting_moves_the_edge_between_incoming_sets() {
    let mut g = triangle();
    g.retarget_edge(10, 3).expect("retarget");
    assert_eq!(g.endpoints(10).expect("edge"), (1, 3));
    assert!(g.predecessors(2).expect("pred 2").is_empty());
    assert_eq!(g.predecessors(3).expect("pred 3"), vec![1, 2]);
    g.store().verify().expect("audit");
}

#[test]
fn removing_a_node_drops_incident_edges() {
    let mut g = triangle();
    g.add_edge(13, 1, 1).expect("self loop");
    g.remove_node(1).expect("remove");

    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
    assert!(!g.contains_edge(10) && !g.contains_edge(12) && !g.contains_edge(13));
    assert!(g.successors(3).expect("succ").is_empty());
    assert!(g.predecessors(2).expect("pred").is_empty());
    assert_eq!(g.successors(1), Err(GraphError::MissingNode(1)));
    g.store().verify().expect("audit");
}

#[test]
fn parallel_edges_are_listed_per_edge() {
    let mut g = triangle();
    g.add_edge(20, 1, 2).expect("parallel");
    assert_eq!(g.successors(1).expect("succ"), vec![2, 2]);
    g.remove_edge(10).expect("remove");
    assert_eq!(g.successors(1).expect("succ"), vec![2]);
}

#[test]
fn duplicate_and_missing_keys_are_rejected() {
    let mut g = triangle();
    assert_eq!(g.add_node(1), Err(GraphError::DuplicateNode(1)));
    assert_eq!(g.add_edge(10, 2, 3), Err(GraphError::DuplicateEdge(10)));
    assert_eq!(g.add_edge(30, 1, 9), Err(GraphError::MissingNode(9)));
    assert_eq!(g.remove_edge(99), Err(GraphError::MissingEdge(99)));
    assert_eq!(g.edge_count(), 3);
}

#[test]
fn ops_replay_to_the_same_link_state() {
    let ops: Vec<GraphOp> = serde_json::from_str(
        r#"[
            { "AddNode": { "id": 1 } },
            { "AddNode": { "id": 2 } },
            { "AddNode": { "id": 3 } },
            { "AddEdge": { "id": 10, "src": 1, "dst": 2 } },
            { "AddEdge": { "id": 11, "src": 2, "dst": 3 } },
            { "AddEdge": { "id": 12, "src": 3, "dst": 1 } }
        ]"#,
    )
    .expect("ops json");

    let mut replayed = ObjectGraph::new();
    for op in ops {
        replayed.apply_op(op).expect("apply");
    }
    assert_eq!(replayed.link_digest(), triangle().link_digest());

    let err = replayed
        .apply_op(GraphOp::RetargetEdge { id: 10, dst: 7 })
        .expect_err("missing node");
    assert_eq!(err.downcast_ref::<GraphError>(), Some(&GraphError::MissingNode(7)));
    assert!(err.to_string().contains("retarget edge 10"));
}
