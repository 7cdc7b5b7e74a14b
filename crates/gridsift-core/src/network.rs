//! The network graph and borrowed views over its equipment.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::{Graph, Undirected};

use crate::{
    Edge, EquipmentId, EquipmentKind, GridError, GridResult, Kilovolts, Node, Properties,
    Substation, TopologyKind, VoltageLevel,
};

/// The core equipment graph.
///
/// Elements are added once and never mutated afterwards; filters only read
/// the network. Insertion validates that every referenced voltage level,
/// substation and converter station already exists, so every terminal of a
/// stored element resolves.
#[derive(Debug, Default)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    nodes: HashMap<EquipmentId, NodeIndex>,
    edges: HashMap<EquipmentId, EdgeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Add a node element. Voltage levels must be added after their
    /// substation and attached equipment after its voltage level.
    pub fn add_node(&mut self, node: Node) -> GridResult<NodeIndex> {
        self.ensure_unique(node.id())?;

        if let Node::VoltageLevel(vl) = &node {
            if let Some(substation) = &vl.substation {
                self.expect_node(&vl.id, substation, EquipmentKind::Substation)?;
            }
        }
        for voltage_level in node.voltage_level_refs() {
            self.expect_node(node.id(), voltage_level, EquipmentKind::VoltageLevel)?;
        }

        let id = node.id().clone();
        let index = self.graph.add_node(node);
        self.nodes.insert(id, index);
        Ok(index)
    }

    /// Add a branch or HVDC line between two existing nodes.
    pub fn add_edge(&mut self, edge: Edge) -> GridResult<EdgeIndex> {
        self.ensure_unique(edge.id())?;

        let (from, to) = edge.endpoints();
        let (from, to) = match &edge {
            Edge::Line(_) | Edge::TwoWindingsTransformer(_) => (
                self.expect_node(edge.id(), from, EquipmentKind::VoltageLevel)?,
                self.expect_node(edge.id(), to, EquipmentKind::VoltageLevel)?,
            ),
            Edge::HvdcLine(_) => (
                self.expect_converter_station(edge.id(), from)?,
                self.expect_converter_station(edge.id(), to)?,
            ),
        };

        let id = edge.id().clone();
        let index = self.graph.add_edge(from, to, edge);
        self.edges.insert(id, index);
        Ok(index)
    }

    fn ensure_unique(&self, id: &EquipmentId) -> GridResult<()> {
        if self.contains(id.as_str()) {
            return Err(GridError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    fn expect_node(
        &self,
        owner: &EquipmentId,
        target: &EquipmentId,
        kind: EquipmentKind,
    ) -> GridResult<NodeIndex> {
        self.nodes
            .get(target)
            .copied()
            .filter(|index| self.graph[*index].kind() == kind)
            .ok_or_else(|| GridError::UnknownReference {
                owner: owner.to_string(),
                expected: match kind {
                    EquipmentKind::Substation => "substation",
                    _ => "voltage level",
                },
                target: target.to_string(),
            })
    }

    fn expect_converter_station(
        &self,
        owner: &EquipmentId,
        target: &EquipmentId,
    ) -> GridResult<NodeIndex> {
        self.nodes
            .get(target)
            .copied()
            .filter(|index| {
                matches!(
                    self.graph[*index],
                    Node::LccConverterStation(_) | Node::VscConverterStation(_)
                )
            })
            .ok_or_else(|| GridError::UnknownReference {
                owner: owner.to_string(),
                expected: "converter station",
                target: target.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id) || self.edges.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id).map(|index| &self.graph[*index])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id).map(|index| &self.graph[*index])
    }

    pub fn voltage_level(&self, id: &str) -> Option<&VoltageLevel> {
        match self.node(id) {
            Some(Node::VoltageLevel(vl)) => Some(vl),
            _ => None,
        }
    }

    pub fn substation(&self, id: &str) -> Option<&Substation> {
        match self.node(id) {
            Some(Node::Substation(s)) => Some(s),
            _ => None,
        }
    }

    /// Terminal view of a voltage level: the level itself and its substation.
    pub fn terminal(&self, voltage_level: &str) -> Option<Terminal<'_>> {
        let voltage_level = self.voltage_level(voltage_level)?;
        let substation = voltage_level
            .substation
            .as_ref()
            .and_then(|id| self.substation(id.as_str()));
        Some(Terminal {
            voltage_level,
            substation,
        })
    }

    /// Look up any equipment by id.
    pub fn identifiable(&self, id: &str) -> Option<Identifiable<'_>> {
        if let Some(node) = self.node(id) {
            return Some(Identifiable::node(self, node));
        }
        self.edge(id).map(|edge| Identifiable::edge(self, edge))
    }

    /// All equipment of one kind, in insertion order.
    pub fn identifiables(&self, kind: EquipmentKind) -> Vec<Identifiable<'_>> {
        match kind {
            EquipmentKind::Line | EquipmentKind::TwoWindingsTransformer | EquipmentKind::HvdcLine => {
                self.graph
                    .edge_weights()
                    .filter(|edge| edge.kind() == kind)
                    .map(|edge| Identifiable::edge(self, edge))
                    .collect()
            }
            _ => self
                .graph
                .node_weights()
                .filter(|node| node.kind() == kind)
                .map(|node| Identifiable::node(self, node))
                .collect(),
        }
    }

    /// Buses enumerated through their voltage levels.
    ///
    /// With a topology hint only voltage levels of that topology kind are
    /// visited.
    pub fn buses(&self, topology_hint: Option<TopologyKind>) -> Vec<Identifiable<'_>> {
        let mut by_voltage_level: HashMap<&EquipmentId, Vec<&Node>> = HashMap::new();
        for node in self.graph.node_weights() {
            if let Node::Bus(bus) = node {
                by_voltage_level
                    .entry(&bus.voltage_level)
                    .or_default()
                    .push(node);
            }
        }

        self.graph
            .node_weights()
            .filter_map(|node| match node {
                Node::VoltageLevel(vl)
                    if topology_hint.map_or(true, |hint| vl.topology_kind == hint) =>
                {
                    by_voltage_level.get(&vl.id)
                }
                _ => None,
            })
            .flatten()
            .map(|node| Identifiable::node(self, *node))
            .collect()
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for node in self.graph.node_weights() {
            *stats.counts.entry(node.kind()).or_default() += 1;
        }
        for edge in self.graph.edge_weights() {
            *stats.counts.entry(edge.kind()).or_default() += 1;
        }
        stats
    }
}

/// Count of equipment per kind.
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub counts: BTreeMap<EquipmentKind, usize>,
}

impl NetworkStats {
    pub fn count(&self, kind: EquipmentKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} equipment", self.total())?;
        for (kind, count) in &self.counts {
            write!(f, ", {} {}", count, kind)?;
        }
        Ok(())
    }
}

/// Connection point of an equipment: a voltage level and, when the level
/// belongs to one, its substation.
#[derive(Debug, Clone, Copy)]
pub struct Terminal<'a> {
    pub voltage_level: &'a VoltageLevel,
    pub substation: Option<&'a Substation>,
}

impl<'a> Terminal<'a> {
    pub fn nominal_v(&self) -> Kilovolts {
        self.voltage_level.nominal_v
    }

    pub fn country(&self) -> Option<&'a str> {
        self.substation.and_then(|s| s.country.as_deref())
    }
}

#[derive(Debug, Clone, Copy)]
enum Element<'a> {
    Node(&'a Node),
    Edge(&'a Edge),
}

/// Borrowed view of one equipment together with the network it lives in,
/// so that terminals, substations and countries can be resolved.
#[derive(Debug, Clone, Copy)]
pub struct Identifiable<'a> {
    network: &'a Network,
    element: Element<'a>,
}

impl<'a> Identifiable<'a> {
    fn node(network: &'a Network, node: &'a Node) -> Self {
        Self {
            network,
            element: Element::Node(node),
        }
    }

    fn edge(network: &'a Network, edge: &'a Edge) -> Self {
        Self {
            network,
            element: Element::Edge(edge),
        }
    }

    pub fn network(&self) -> &'a Network {
        self.network
    }

    pub fn as_node(&self) -> Option<&'a Node> {
        match self.element {
            Element::Node(node) => Some(node),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&'a Edge> {
        match self.element {
            Element::Edge(edge) => Some(edge),
            Element::Node(_) => None,
        }
    }

    pub fn id(&self) -> &'a EquipmentId {
        match self.element {
            Element::Node(node) => node.id(),
            Element::Edge(edge) => edge.id(),
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        match self.element {
            Element::Node(node) => node.name(),
            Element::Edge(edge) => edge.name(),
        }
    }

    pub fn name_or_id(&self) -> &'a str {
        self.name().unwrap_or_else(|| self.id().as_str())
    }

    pub fn kind(&self) -> EquipmentKind {
        match self.element {
            Element::Node(node) => node.kind(),
            Element::Edge(edge) => edge.kind(),
        }
    }

    pub fn properties(&self) -> &'a Properties {
        match self.element {
            Element::Node(node) => node.properties(),
            Element::Edge(edge) => edge.properties(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&'a str> {
        self.properties().get(key).map(String::as_str)
    }

    /// Terminals in order: terminal 1/2 for branches and HVDC lines (through
    /// the converter stations), legs 1/2/3 for three-winding transformers, the
    /// single terminal of injections and buses. Voltage levels and substations
    /// have none.
    pub fn terminals(&self) -> Vec<Terminal<'a>> {
        let network = self.network;
        match self.element {
            Element::Node(node) => node
                .voltage_level_refs()
                .into_iter()
                .filter_map(|vl| network.terminal(vl.as_str()))
                .collect(),
            Element::Edge(Edge::HvdcLine(hvdc)) => [&hvdc.converter_station1, &hvdc.converter_station2]
                .into_iter()
                .filter_map(|station| network.node(station.as_str()))
                .flat_map(|station| station.voltage_level_refs())
                .filter_map(|vl| network.terminal(vl.as_str()))
                .collect(),
            Element::Edge(edge) => {
                let (vl1, vl2) = edge.endpoints();
                [vl1, vl2]
                    .into_iter()
                    .filter_map(|vl| network.terminal(vl.as_str()))
                    .collect()
            }
        }
    }

    /// The voltage level locating this equipment: its own record for a
    /// voltage level, else the voltage level of its first terminal.
    pub fn voltage_level(&self) -> Option<&'a VoltageLevel> {
        match self.element {
            Element::Node(Node::VoltageLevel(vl)) => Some(vl),
            _ => self.terminals().first().map(|t| t.voltage_level),
        }
    }

    /// The substation locating this equipment: its own record for a
    /// substation, else the substation of its voltage level.
    pub fn substation(&self) -> Option<&'a Substation> {
        match self.element {
            Element::Node(Node::Substation(s)) => Some(s),
            _ => self
                .voltage_level()?
                .substation
                .as_ref()
                .and_then(|id| self.network.substation(id.as_str())),
        }
    }

    pub fn country(&self) -> Option<&'a str> {
        self.substation().and_then(|s| s.country.as_deref())
    }

    /// Nominal voltage: the HVDC line's own rating, else the locating
    /// voltage level's.
    pub fn nominal_v(&self) -> Option<Kilovolts> {
        match self.element {
            Element::Edge(Edge::HvdcLine(hvdc)) => Some(hvdc.nominal_v),
            _ => self.voltage_level().map(|vl| vl.nominal_v),
        }
    }
}
