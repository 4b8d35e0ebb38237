// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology graph model
//!
//! The resource-and-topology description exchanged between layers: nodes are
//! infrastructure or function elements, links are connections or service
//! chain hops. Every node of a mapped graph carries the domain label assigned
//! by the upstream placement step; the coordination core only partitions,
//! merges and re-stamps graphs, it never computes placement.
//!
//! Nodes live in a `BTreeMap` so domain detection and splitting produce a
//! deterministic order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Deployment status carried by every topology element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementStatus {
    /// Present in the description, not yet acted upon
    #[default]
    Initialized,
    /// Installed by a domain manager
    Deployed,
    /// Installation attempt failed
    Failed,
    /// Confirmed running by the owning domain
    Running,
    /// Stopped or torn down
    Stopped,
}

/// Kind of a topology node
///
/// Infrastructure nodes are the static substrate; function nodes are
/// dynamically installed elements that cleaning strips away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Infrastructure,
    Function,
}

/// A single topology node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id within the graph
    pub id: String,
    /// Owning domain label; `None` means the node is not addressable
    pub domain: Option<String>,
    pub kind: NodeKind,
    #[serde(default)]
    pub status: ElementStatus,
    /// Infrastructure node that is itself a virtualized view of another layer
    #[serde(default)]
    pub virtualized: bool,
}

impl Node {
    /// Create an infrastructure node owned by `domain`
    pub fn infrastructure(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: Some(domain.into()),
            kind: NodeKind::Infrastructure,
            status: ElementStatus::Initialized,
            virtualized: false,
        }
    }

    /// Create a function node placed into `domain`
    pub fn function(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: Some(domain.into()),
            kind: NodeKind::Function,
            status: ElementStatus::Initialized,
            virtualized: false,
        }
    }

    /// Mark the node as a virtualized infrastructure element
    pub fn virtualized(mut self) -> Self {
        self.virtualized = true;
        self
    }

    /// Set the initial status
    pub fn with_status(mut self, status: ElementStatus) -> Self {
        self.status = status;
        self
    }
}

/// A link between two nodes
///
/// `dynamic` links are service chain hops installed on demand; static links
/// belong to the substrate and survive cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub status: ElementStatus,
}

impl Link {
    /// Create a static substrate link
    pub fn between(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            dynamic: false,
            status: ElementStatus::Initialized,
        }
    }

    /// Create a dynamically installed service hop
    pub fn hop(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            dynamic: true,
            status: ElementStatus::Initialized,
        }
    }
}

/// Resource-annotated topology graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    /// Graph id; a mapped request's id doubles as its tracker key
    pub id: String,
    nodes: BTreeMap<String, Node>,
    links: Vec<Link>,
}

impl TopologyGraph {
    /// Create an empty graph with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    /// Insert or replace a node
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Insert or replace the link identified by its endpoint pair
    pub fn add_link(&mut self, link: Link) -> &mut Self {
        match self
            .links
            .iter_mut()
            .find(|l| l.src == link.src && l.dst == link.dst)
        {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
        self
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Iterate over all nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no elements at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// True if the graph carries no dynamically installed elements
    /// (a bare substrate, e.g. a cleanup-only request)
    pub fn is_bare(&self) -> bool {
        self.nodes.values().all(|n| n.kind != NodeKind::Function)
            && self.links.iter().all(|l| !l.dynamic)
    }

    /// True if any infrastructure node is a virtualized view
    pub fn is_virtualized(&self) -> bool {
        self.nodes.values().any(|n| n.virtualized)
    }

    /// Set of domain labels the graph touches, in lexical order
    pub fn detect_domains(&self) -> BTreeSet<String> {
        self.nodes
            .values()
            .filter_map(|n| n.domain.clone())
            .collect()
    }

    /// Partition the graph into one sub-graph per domain it touches
    ///
    /// Nodes without a domain label are not addressable and are dropped.
    /// A link lands in a part only when both endpoints belong to it; the
    /// parts come out in lexical domain order. An empty result means the
    /// graph had no addressable domain at all.
    pub fn split_by_domain(&self) -> Vec<(String, TopologyGraph)> {
        let mut parts: BTreeMap<String, TopologyGraph> = BTreeMap::new();
        for node in self.nodes.values() {
            let Some(domain) = &node.domain else { continue };
            parts
                .entry(domain.clone())
                .or_insert_with(|| TopologyGraph::new(format!("{}/{}", self.id, domain)))
                .add_node(node.clone());
        }
        for link in &self.links {
            for part in parts.values_mut() {
                if part.nodes.contains_key(&link.src) && part.nodes.contains_key(&link.dst) {
                    part.add_link(link.clone());
                }
            }
        }
        parts.into_iter().collect()
    }

    /// Merge `other` into this graph as an in-place patch
    ///
    /// Elements of `other` win on conflicts; elements only present here
    /// survive untouched.
    pub fn merge(&mut self, other: &TopologyGraph) {
        for node in other.nodes.values() {
            self.add_node(node.clone());
        }
        for link in &other.links {
            self.add_link(link.clone());
        }
    }

    /// Remove every element owned by `domain`, including links that lose
    /// an endpoint
    pub fn remove_domain(&mut self, domain: &str) {
        self.nodes
            .retain(|_, n| n.domain.as_deref() != Some(domain));
        let nodes = &self.nodes;
        self.links
            .retain(|l| nodes.contains_key(&l.src) && nodes.contains_key(&l.dst));
    }

    /// Strip only the dynamically installed elements of `domain`, leaving
    /// its static topology in place
    pub fn clean_domain(&mut self, domain: &str) {
        self.nodes.retain(|_, n| {
            n.domain.as_deref() != Some(domain) || n.kind != NodeKind::Function
        });
        let nodes = &self.nodes;
        self.links.retain(|l| {
            if !nodes.contains_key(&l.src) || !nodes.contains_key(&l.dst) {
                return false;
            }
            if !l.dynamic {
                return true;
            }
            let in_domain = |id: &str| {
                nodes
                    .get(id)
                    .map(|n| n.domain.as_deref() == Some(domain))
                    .unwrap_or(false)
            };
            !(in_domain(&l.src) || in_domain(&l.dst))
        });
    }

    /// Overwrite the status of elements already present here with the
    /// status they carry in `other`; structure is left untouched
    pub fn update_statuses_from(&mut self, other: &TopologyGraph) {
        for (id, node) in &other.nodes {
            if let Some(existing) = self.nodes.get_mut(id) {
                existing.status = node.status;
            }
        }
        for link in &other.links {
            if let Some(existing) = self
                .links
                .iter_mut()
                .find(|l| l.src == link.src && l.dst == link.dst)
            {
                existing.status = link.status;
            }
        }
    }

    /// Stamp every element with a uniform status
    pub fn set_status_all(&mut self, status: ElementStatus) {
        for node in self.nodes.values_mut() {
            node.status = status;
        }
        for link in &mut self.links {
            link.status = status;
        }
    }
}
