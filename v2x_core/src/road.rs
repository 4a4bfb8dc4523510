//! Road network: a directed graph of intersection nodes with geographic
//! positions, plus the pluggable shortest-path provider.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Intersection node key. Nodes are named after the streets they join.
pub type NodeId = String;

/// Geographic bounds of the simulated map (~2km x 2km of Lower Manhattan).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            lat_min: 40.7020,
            lat_max: 40.7170,
            lon_min: -74.0150,
            lon_max: -74.0010,
        }
    }
}

/// Immutable-per-generation directed graph of intersections.
///
/// Node positions are (lat, lon) points. Every street segment is inserted in
/// both directions. Iteration order is deterministic (BTreeMap) so seeded
/// world generation is reproducible.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    positions: BTreeMap<NodeId, Point2<f64>>,
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
}

// Financial District intersections (40.700-40.720, -74.020 to -74.000).
// N-S streets west to east: Greenwich, W Broadway, Church, Broadway;
// E-W cross streets south to north: Battery Pl through Murray St.
const INTERSECTIONS: &[(&str, f64, f64)] = &[
    ("greenwich_battery", 40.7028, -74.0135),
    ("greenwich_rector", 40.7065, -74.0133),
    ("greenwich_cortlandt", 40.7090, -74.0130),
    ("greenwich_fulton", 40.7107, -74.0120),
    ("greenwich_vesey", 40.7120, -74.0115),
    ("greenwich_barclay", 40.7135, -74.0108),
    ("greenwich_murray", 40.7152, -74.0100),
    ("wbway_rector", 40.7070, -74.0105),
    ("wbway_cortlandt", 40.7092, -74.0098),
    ("wbway_fulton", 40.7110, -74.0090),
    ("wbway_vesey", 40.7125, -74.0085),
    ("wbway_barclay", 40.7140, -74.0078),
    ("wbway_murray", 40.7155, -74.0070),
    ("church_rector", 40.7075, -74.0075),
    ("church_cortlandt", 40.7095, -74.0068),
    ("church_fulton", 40.7112, -74.0058),
    ("church_vesey", 40.7128, -74.0055),
    ("church_barclay", 40.7143, -74.0048),
    ("church_murray", 40.7158, -74.0042),
    ("bway_battery", 40.7035, -74.0130),
    ("bway_rector", 40.7080, -74.0060),
    ("bway_cortlandt", 40.7098, -74.0048),
    ("bway_fulton", 40.7115, -74.0040),
    ("bway_vesey", 40.7130, -74.0032),
    ("bway_barclay", 40.7145, -74.0028),
    ("bway_murray", 40.7160, -74.0020),
];

const NS_STREETS: &[&[&str]] = &[
    &[
        "greenwich_battery",
        "greenwich_rector",
        "greenwich_cortlandt",
        "greenwich_fulton",
        "greenwich_vesey",
        "greenwich_barclay",
        "greenwich_murray",
    ],
    &[
        "wbway_rector",
        "wbway_cortlandt",
        "wbway_fulton",
        "wbway_vesey",
        "wbway_barclay",
        "wbway_murray",
    ],
    &[
        "church_rector",
        "church_cortlandt",
        "church_fulton",
        "church_vesey",
        "church_barclay",
        "church_murray",
    ],
    &[
        "bway_battery",
        "bway_rector",
        "bway_cortlandt",
        "bway_fulton",
        "bway_vesey",
        "bway_barclay",
        "bway_murray",
    ],
];

const EW_STREETS: &[&[&str]] = &[
    &["greenwich_rector", "wbway_rector", "church_rector", "bway_rector"],
    &["greenwich_cortlandt", "wbway_cortlandt", "church_cortlandt", "bway_cortlandt"],
    &["greenwich_fulton", "wbway_fulton", "church_fulton", "bway_fulton"],
    &["greenwich_vesey", "wbway_vesey", "church_vesey", "bway_vesey"],
    &["greenwich_barclay", "wbway_barclay", "church_barclay", "bway_barclay"],
    &["greenwich_murray", "wbway_murray", "church_murray", "bway_murray"],
];

impl RoadNetwork {
    /// Builds the fixed Lower Manhattan street grid.
    pub fn lower_manhattan() -> Self {
        let mut net = Self {
            positions: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        };

        for &(id, lat, lon) in INTERSECTIONS {
            net.positions.insert(id.to_string(), Point2::new(lat, lon));
            net.adjacency.insert(id.to_string(), Vec::new());
        }

        for street in NS_STREETS.iter().chain(EW_STREETS.iter()) {
            for pair in street.windows(2) {
                net.add_street_segment(pair[0], pair[1]);
            }
        }

        net
    }

    /// Inserts a bidirectional street segment between two known nodes.
    fn add_street_segment(&mut self, a: &str, b: &str) {
        self.adjacency
            .get_mut(a)
            .expect("segment endpoint must be a known node")
            .push(b.to_string());
        self.adjacency
            .get_mut(b)
            .expect("segment endpoint must be a known node")
            .push(a.to_string());
    }

    /// Node ids in deterministic (sorted) order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.positions.keys().cloned().collect()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Geographic position of a node, if it exists.
    pub fn position(&self, id: &str) -> Option<Point2<f64>> {
        self.positions.get(id).copied()
    }

    /// Outgoing neighbors of a node.
    pub fn neighbors(&self, id: &str) -> &[NodeId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of street segments meeting at a node.
    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len()
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// All directed edges, in deterministic order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.adjacency
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.clone(), to.clone())))
            .collect()
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.neighbors(from).iter().any(|n| n == to)
    }

    /// Positions map for snapshot assembly.
    pub fn positions(&self) -> &BTreeMap<NodeId, Point2<f64>> {
        &self.positions
    }
}

/// Pluggable shortest-path service.
///
/// The simulation never walks the graph itself; routing is delegated here so
/// an external provider (weighted search, live traffic) can be swapped in.
pub trait PathProvider {
    /// Ordered node sequence from `start` to `end` inclusive, or `None` when
    /// no route exists or either endpoint is unknown.
    fn shortest_path(&self, net: &RoadNetwork, start: &str, end: &str) -> Option<Vec<NodeId>>;
}

/// Default provider: breadth-first search (all street segments weigh equal).
#[derive(Debug, Clone, Copy, Default)]
pub struct BfsPathProvider;

impl PathProvider for BfsPathProvider {
    fn shortest_path(&self, net: &RoadNetwork, start: &str, end: &str) -> Option<Vec<NodeId>> {
        if !net.contains_node(start) || !net.contains_node(end) {
            return None;
        }
        if start == end {
            return Some(vec![start.to_string()]);
        }

        let mut predecessor: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(start);
        predecessor.insert(start, start);

        while let Some(current) = queue.pop_front() {
            for next in net.neighbors(current) {
                if predecessor.contains_key(next.as_str()) {
                    continue;
                }
                predecessor.insert(next.as_str(), current);
                if next == end {
                    let mut path = vec![end.to_string()];
                    let mut cursor = current;
                    while cursor != start {
                        path.push(cursor.to_string());
                        cursor = predecessor[cursor];
                    }
                    path.push(start.to_string());
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next.as_str());
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_shape() {
        let net = RoadNetwork::lower_manhattan();
        assert_eq!(net.node_count(), 26);
        // Every segment is bidirectional.
        for (from, to) in net.edges() {
            assert!(net.contains_edge(&to, &from));
        }
    }

    #[test]
    fn test_neighbors_symmetric_degree() {
        let net = RoadNetwork::lower_manhattan();
        // A mid-grid intersection joins four segments.
        assert_eq!(net.degree("church_fulton"), 4);
        // Grid corners join fewer.
        assert_eq!(net.degree("greenwich_battery"), 1);
    }

    #[test]
    fn test_bfs_path_endpoints_and_edges() {
        let net = RoadNetwork::lower_manhattan();
        let path = BfsPathProvider
            .shortest_path(&net, "greenwich_battery", "bway_murray")
            .expect("grid is connected");

        assert_eq!(path.first().map(String::as_str), Some("greenwich_battery"));
        assert_eq!(path.last().map(String::as_str), Some("bway_murray"));
        for pair in path.windows(2) {
            assert!(net.contains_edge(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn test_bfs_path_trivial_and_unknown() {
        let net = RoadNetwork::lower_manhattan();
        assert_eq!(
            BfsPathProvider.shortest_path(&net, "church_vesey", "church_vesey"),
            Some(vec!["church_vesey".to_string()])
        );
        assert_eq!(BfsPathProvider.shortest_path(&net, "nowhere", "church_vesey"), None);
    }

    #[test]
    fn test_bfs_path_is_shortest_on_grid() {
        let net = RoadNetwork::lower_manhattan();
        // Adjacent nodes: two-node path.
        let path = BfsPathProvider
            .shortest_path(&net, "church_fulton", "church_vesey")
            .unwrap();
        assert_eq!(path.len(), 2);
    }
}
