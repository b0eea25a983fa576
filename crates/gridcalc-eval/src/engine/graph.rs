use gridcalc_common::{CellAddr, GridBounds};
use gridcalc_parse::parser::ASTNode;
use rustc_hash::{FxHashMap, FxHashSet};

use super::vertex::{Vertex, VertexId};

/// Precedent/dependent relation between cells.
///
/// Vertices live in an arena indexed by [`VertexId`]; the two adjacency
/// maps always mirror each other: `b ∈ precedents[a]` iff `a ∈ dependents[b]`.
/// Edges are rebuilt per cell on every formula change. A vertex left with no
/// edges can be released and its slot is reused, so the arena holds at most
/// the cells that take part in some edge plus the cells of one edit.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    vertices: Vec<Option<Vertex>>,
    free: Vec<VertexId>,
    cell_to_vertex: FxHashMap<CellAddr, VertexId>,
    /// vertex -> cells its formula reads
    precedents: FxHashMap<VertexId, FxHashSet<VertexId>>,
    /// vertex -> formulas that read it
    dependents: FxHashMap<VertexId, FxHashSet<VertexId>>,
    bounds: GridBounds,
}

impl DependencyGraph {
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            vertices: Vec::new(),
            free: Vec::new(),
            cell_to_vertex: FxHashMap::default(),
            precedents: FxHashMap::default(),
            dependents: FxHashMap::default(),
            bounds,
        }
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /* ─────────────── vertices ─────────────── */

    /// Get or create the vertex for `addr`.
    pub fn vertex_for(&mut self, addr: CellAddr) -> VertexId {
        if let Some(&id) = self.cell_to_vertex.get(&addr) {
            return id;
        }
        let id = match self.free.pop() {
            Some(id) => {
                self.vertices[id.as_index()] = Some(Vertex { id, addr });
                id
            }
            None => {
                let id = VertexId::new(self.vertices.len() as u32);
                self.vertices.push(Some(Vertex { id, addr }));
                id
            }
        };
        self.cell_to_vertex.insert(addr, id);
        id
    }

    /// Drop the vertex of `addr` if no edge touches it. Returns whether a
    /// vertex was released.
    pub fn release_if_unused(&mut self, addr: CellAddr) -> bool {
        let Some(id) = self.vertex_id(addr) else {
            return false;
        };
        if self.precedents.contains_key(&id) || self.dependents.contains_key(&id) {
            return false;
        }
        self.cell_to_vertex.remove(&addr);
        self.vertices[id.as_index()] = None;
        self.free.push(id);
        true
    }

    /// Live vertices.
    pub fn vertex_count(&self) -> usize {
        self.cell_to_vertex.len()
    }

    pub fn vertex_id(&self, addr: CellAddr) -> Option<VertexId> {
        self.cell_to_vertex.get(&addr).copied()
    }

    pub fn addr_of(&self, id: VertexId) -> Option<CellAddr> {
        self.vertices.get(id.as_index())?.as_ref().map(|v| v.addr)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.vertices.iter().flatten()
    }

    /* ─────────────── edges ─────────────── */

    /// Cells an AST reads, deduplicated. Ranges expand to every contained
    /// in-bounds cell; references outside the grid contribute nothing.
    pub fn precedents_for_ast(ast: &ASTNode, bounds: GridBounds) -> Vec<CellAddr> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for reference in ast.get_dependencies() {
            for addr in reference.cells(bounds) {
                if seen.insert(addr) {
                    out.push(addr);
                }
            }
        }
        out
    }

    /// Replace the outgoing edges of `addr` with exactly `cells`.
    pub fn set_precedents(&mut self, addr: CellAddr, cells: &[CellAddr]) {
        let id = self.vertex_for(addr);
        let new: FxHashSet<VertexId> = cells.iter().map(|&c| self.vertex_for(c)).collect();
        let old = self.precedents.remove(&id).unwrap_or_default();

        let mut removed = 0usize;
        for gone in old.difference(&new) {
            if let Some(deps) = self.dependents.get_mut(gone) {
                deps.remove(&id);
                if deps.is_empty() {
                    self.dependents.remove(gone);
                }
            }
            removed += 1;
        }
        let mut added = 0usize;
        for fresh in new.difference(&old) {
            self.dependents.entry(*fresh).or_default().insert(id);
            added += 1;
        }

        tracing::debug!(cell = %addr, added, removed, "rebuilt precedent edges");
        if !new.is_empty() {
            self.precedents.insert(id, new);
        }
    }

    pub fn clear_precedents(&mut self, addr: CellAddr) {
        if self.cell_to_vertex.contains_key(&addr) {
            self.set_precedents(addr, &[]);
        }
    }

    /* ─────────────── queries ─────────────── */

    pub fn precedent_ids(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.precedents.get(&id).into_iter().flatten().copied()
    }

    pub fn dependent_ids(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.dependents.get(&id).into_iter().flatten().copied()
    }

    pub fn has_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.precedents.get(&from).is_some_and(|p| p.contains(&to))
    }

    /// Direct precedents of `addr`, sorted.
    pub fn precedents_of(&self, addr: CellAddr) -> Vec<CellAddr> {
        self.sorted_addrs(self.vertex_id(addr).map(|id| self.precedent_ids(id).collect()))
    }

    /// Direct dependents of `addr`, sorted.
    pub fn dependents_of(&self, addr: CellAddr) -> Vec<CellAddr> {
        self.sorted_addrs(self.vertex_id(addr).map(|id| self.dependent_ids(id).collect()))
    }

    fn sorted_addrs(&self, ids: Option<Vec<VertexId>>) -> Vec<CellAddr> {
        let mut out: Vec<CellAddr> = ids
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.addr_of(id))
            .collect();
        out.sort();
        out
    }

    /// `roots` plus everything that reads them, directly or indirectly.
    pub fn transitive_dependents(&self, roots: &[VertexId]) -> Vec<VertexId> {
        let mut seen: FxHashSet<VertexId> = FxHashSet::default();
        let mut stack: Vec<VertexId> = Vec::new();
        let mut out = Vec::new();
        for &root in roots {
            if seen.insert(root) {
                out.push(root);
                stack.push(root);
            }
        }
        while let Some(v) = stack.pop() {
            for dep in self.dependent_ids(v) {
                if seen.insert(dep) {
                    out.push(dep);
                    stack.push(dep);
                }
            }
        }
        out
    }

    pub fn edge_count(&self) -> usize {
        self.precedents.values().map(FxHashSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.free.clear();
        self.cell_to_vertex.clear();
        self.precedents.clear();
        self.dependents.clear();
    }
}
