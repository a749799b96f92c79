//!
//! Generic labeled directed graph.
//!
//! Vertices are unique by equality and looked up by value; edges carry a
//! single `f64` weight. Storage is a petgraph `DiGraph` with an
//! `FnvHashMap` from vertex to node index on the side.
//!
//! The side map relies on vertex equality/hash staying stable while the
//! vertex is in the graph; callers that mutate a vertex in place (via
//! `get_vertex_mut`) must not change the parts equality is based on.
//!
use fnv::FnvHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("tried to add a vertex but an equal vertex was found in the graph")]
    VertexExists,
    #[error("vertex was not found in the graph")]
    VertexNotFound,
    #[error("tried to add an edge but one of its incident vertices was not found in the graph")]
    IncidentVertexNotFound,
    #[error("tried to add an edge but an equal edge was found in the graph")]
    EdgeExists,
    #[error("edge was not found in the graph")]
    EdgeNotFound,
    #[error("the induced relation has a cycle")]
    Cycle,
}

///
/// Directed graph with vertices unique by equality and weighted edges.
///
#[derive(Clone, Debug)]
pub struct LabeledDigraph<V: Eq + Hash + Clone> {
    graph: DiGraph<V, f64>,
    indices: FnvHashMap<V, NodeIndex>,
}

impl<V: Eq + Hash + Clone> LabeledDigraph<V> {
    pub fn new() -> LabeledDigraph<V> {
        LabeledDigraph {
            graph: DiGraph::new(),
            indices: FnvHashMap::default(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.graph.node_count()
    }
    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
    pub fn has_vertex(&self, vertex: &V) -> bool {
        self.indices.contains_key(vertex)
    }

    pub fn add_vertex(&mut self, vertex: V) -> Result<(), GraphError> {
        if self.indices.contains_key(&vertex) {
            return Err(GraphError::VertexExists);
        }
        let index = self.graph.add_node(vertex.clone());
        self.indices.insert(vertex, index);
        Ok(())
    }

    pub fn get_vertex(&self, vertex: &V) -> Option<&V> {
        self.indices
            .get(vertex)
            .map(|&index| self.graph.node_weight(index).unwrap())
    }

    pub fn get_vertex_mut(&mut self, vertex: &V) -> Option<&mut V> {
        match self.indices.get(vertex) {
            Some(&index) => self.graph.node_weight_mut(index),
            None => None,
        }
    }

    ///
    /// Remove a vertex and all its incident edges.
    ///
    pub fn remove_vertex(&mut self, vertex: &V) -> Result<(), GraphError> {
        let index = *self.indices.get(vertex).ok_or(GraphError::VertexNotFound)?;
        self.indices.remove(vertex);
        self.graph.remove_node(index);
        // petgraph swaps the last node into the freed slot
        if let Some(moved) = self.graph.node_weight(index) {
            self.indices.insert(moved.clone(), index);
        }
        Ok(())
    }

    pub fn add_edge(&mut self, from: &V, to: &V, weight: f64) -> Result<(), GraphError> {
        let (a, b) = match (self.indices.get(from), self.indices.get(to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => return Err(GraphError::IncidentVertexNotFound),
        };
        if self.graph.find_edge(a, b).is_some() {
            return Err(GraphError::EdgeExists);
        }
        self.graph.add_edge(a, b, weight);
        Ok(())
    }

    pub fn has_edge(&self, from: &V, to: &V) -> bool {
        match (self.indices.get(from), self.indices.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    pub fn remove_edge(&mut self, from: &V, to: &V) -> Result<(), GraphError> {
        let (a, b) = match (self.indices.get(from), self.indices.get(to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => return Err(GraphError::EdgeNotFound),
        };
        let edge = self.graph.find_edge(a, b).ok_or(GraphError::EdgeNotFound)?;
        self.graph.remove_edge(edge);
        Ok(())
    }

    pub fn get_weight(&self, from: &V, to: &V) -> Result<f64, GraphError> {
        let (a, b) = match (self.indices.get(from), self.indices.get(to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => return Err(GraphError::EdgeNotFound),
        };
        let edge = self.graph.find_edge(a, b).ok_or(GraphError::EdgeNotFound)?;
        Ok(*self.graph.edge_weight(edge).unwrap())
    }

    pub fn set_weight(&mut self, from: &V, to: &V, weight: f64) -> Result<(), GraphError> {
        let (a, b) = match (self.indices.get(from), self.indices.get(to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => return Err(GraphError::EdgeNotFound),
        };
        let edge = self.graph.find_edge(a, b).ok_or(GraphError::EdgeNotFound)?;
        *self.graph.edge_weight_mut(edge).unwrap() = weight;
        Ok(())
    }

    ///
    /// Outgoing `(target, weight)` pairs of a vertex, in edge insertion
    /// order.
    ///
    pub fn out_edges(&self, vertex: &V) -> Result<Vec<(&V, f64)>, GraphError> {
        let index = *self.indices.get(vertex).ok_or(GraphError::VertexNotFound)?;
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target(), *edge.weight()))
            .collect();
        edges.sort_by_key(|&(id, _, _)| id);
        Ok(edges
            .into_iter()
            .map(|(_, target, weight)| (self.graph.node_weight(target).unwrap(), weight))
            .collect())
    }

    ///
    /// Incoming `(source, weight)` pairs of a vertex, in edge insertion
    /// order.
    ///
    pub fn in_edges(&self, vertex: &V) -> Result<Vec<(&V, f64)>, GraphError> {
        let index = *self.indices.get(vertex).ok_or(GraphError::VertexNotFound)?;
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source(), *edge.weight()))
            .collect();
        edges.sort_by_key(|&(id, _, _)| id);
        Ok(edges
            .into_iter()
            .map(|(_, source, weight)| (self.graph.node_weight(source).unwrap(), weight))
            .collect())
    }

    ///
    /// Vertices in insertion order.
    ///
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.graph
            .node_indices()
            .map(move |index| self.graph.node_weight(index).unwrap())
    }

    ///
    /// The subgraph induced by `keep`: those vertices plus every edge
    /// whose endpoints are both kept.
    ///
    pub fn subgraph(&self, keep: &[V]) -> LabeledDigraph<V> {
        let mut sub = LabeledDigraph::new();
        for vertex in self.vertices() {
            if keep.contains(vertex) {
                sub.add_vertex(vertex.clone()).unwrap();
            }
        }
        for edge in self.graph.edge_references() {
            let from = self.graph.node_weight(edge.source()).unwrap();
            let to = self.graph.node_weight(edge.target()).unwrap();
            if sub.has_vertex(from) && sub.has_vertex(to) {
                sub.add_edge(from, to, *edge.weight()).unwrap();
            }
        }
        sub
    }

    ///
    /// Kahn's algorithm. For every edge (u -> v), u precedes v in the
    /// returned order; vertices of equal indegree come out in insertion
    /// order. Fails with `Cycle` iff the graph has one.
    ///
    pub fn topological_sort(&self) -> Result<Vec<V>, GraphError> {
        let mut indegree: FnvHashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|index| {
                (
                    index,
                    self.graph.edges_directed(index, Direction::Incoming).count(),
                )
            })
            .collect();
        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&index, _)| index.index())
            .collect();
        let mut order = Vec::with_capacity(self.num_vertices());
        while let Some(&smallest) = ready.iter().next() {
            ready.remove(&smallest);
            let index = NodeIndex::new(smallest);
            order.push(self.graph.node_weight(index).unwrap().clone());
            for edge in self.graph.edges_directed(index, Direction::Outgoing) {
                let target = edge.target();
                let degree = indegree.get_mut(&target).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(target.index());
                }
            }
        }
        if order.len() != self.num_vertices() {
            return Err(GraphError::Cycle);
        }
        Ok(order)
    }
}
