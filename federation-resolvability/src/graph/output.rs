// GraphViz output for the resolvability graph, one cluster per subgraph.

use std::fmt::Write;
use std::sync::Arc;

use petgraph::dot::Config;
use petgraph::dot::Dot;
use petgraph::graph::EdgeIndex;
use petgraph::stable_graph::StableGraph;

use crate::graph::FEDERATED_GRAPH_ROOT_SOURCE;
use crate::graph::FederatedGraph;
use crate::graph::GraphEdge;
use crate::graph::GraphNode;

type StableInnerGraph = StableGraph<GraphNode, GraphEdge>;

fn label_edge(edge: &GraphEdge) -> String {
    format!("label=\"{}\"", edge)
}

fn label_node(node: &GraphNode) -> String {
    let mut attributes = format!("label=\"{}\"", node.type_name);
    if node.is_inaccessible {
        attributes.push_str(", style=\"dashed\"");
    }
    attributes
}

impl FederatedGraph {
    pub fn to_dot(&self) -> String {
        self.to_dot_clustered().unwrap_or_default()
    }

    fn to_dot_clustered(&self) -> Result<String, std::fmt::Error> {
        fn edge_within_cluster(
            graph: &StableInnerGraph,
            cluster_name: &Arc<str>,
            edge_index: EdgeIndex,
        ) -> bool {
            graph.edge_endpoints(edge_index).is_some_and(|(n1, n2)| {
                graph[n1].subgraph_name == *cluster_name && graph[n2].subgraph_name == *cluster_name
            })
        }

        fn edge_across_clusters(graph: &StableInnerGraph, edge_index: EdgeIndex) -> bool {
            graph
                .edge_endpoints(edge_index)
                .is_some_and(|(n1, n2)| graph[n1].subgraph_name != graph[n2].subgraph_name)
        }

        // Build a stable graph, so we can derive subgraph clusters with the same indices.
        let stable_graph = StableGraph::from(self.graph.clone());
        let cluster_dot_config = [
            Config::NodeNoLabel,
            Config::EdgeNoLabel,
            Config::GraphContentOnly,
        ];

        let mut dot_str = String::new();
        writeln!(dot_str, "digraph \"federated\" {{")?;

        for cluster_name in self.nodes_by_subgraph_name.keys() {
            let filtered_graph: StableInnerGraph = stable_graph.filter_map(
                |_i, n| (n.subgraph_name == *cluster_name).then(|| n.clone()),
                |i, e| edge_within_cluster(&stable_graph, cluster_name, i).then(|| e.clone()),
            );
            let s = Dot::with_attr_getters(
                &filtered_graph,
                &cluster_dot_config,
                &(|_, er| label_edge(er.weight())),
                &(|_, (_, node)| label_node(node)),
            )
            .to_string();

            writeln!(dot_str, r#"  subgraph "cluster_{}" {{"#, cluster_name)?;
            writeln!(dot_str, r#"    label = "Subgraph \"{}\"";"#, cluster_name)?;
            writeln!(dot_str, r#"    color = "black";"#)?;
            writeln!(dot_str, r#"    style = "";"#)?;
            dot_str.push_str(&s);
            writeln!(dot_str, "  }}")?;
        }

        // Root nodes
        for i in stable_graph.node_indices() {
            let node = &stable_graph[i];
            if &*node.subgraph_name == FEDERATED_GRAPH_ROOT_SOURCE {
                writeln!(dot_str, "  {} [{}]", i.index(), label_node(node))?;
            }
        }

        // Root and entity edges
        for i in stable_graph.edge_indices() {
            if edge_across_clusters(&stable_graph, i) {
                if let Some((n1, n2)) = stable_graph.edge_endpoints(i) {
                    writeln!(
                        dot_str,
                        "  {} -> {} [{}]",
                        n1.index(),
                        n2.index(),
                        label_edge(&stable_graph[i])
                    )?;
                }
            }
        }

        writeln!(dot_str, "}}")?;
        Ok(dot_str)
    }
}
