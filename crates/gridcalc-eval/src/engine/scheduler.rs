use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::DependencyGraph;
use super::vertex::VertexId;

pub struct Scheduler<'a> {
    graph: &'a DependencyGraph,
}

/// Vertices whose in-set precedents are all in earlier layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub vertices: Vec<VertexId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub layers: Vec<Layer>,
    pub cycles: Vec<Vec<VertexId>>,
}

impl Schedule {
    /// Layers flattened into evaluation order.
    pub fn order(&self) -> Vec<VertexId> {
        self.layers
            .iter()
            .flat_map(|l| l.vertices.iter().copied())
            .collect()
    }
}

/// One DFS frame of the iterative Tarjan walk.
struct Frame {
    vertex: VertexId,
    succ: Vec<VertexId>,
    next: usize,
}

impl<'a> Scheduler<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Order `vertices` for evaluation. Edges leaving the set are ignored.
    pub fn create_schedule(&self, vertices: &[VertexId]) -> Schedule {
        let members: FxHashSet<VertexId> = vertices.iter().copied().collect();

        // 1. strongly connected components over the induced subgraph
        let sccs = self.tarjan_scc(vertices, &members);

        // 2. split off cycles
        let (cycles, acyclic) = self.separate_cycles(sccs);

        // 3. Kahn layering of what is left
        let layers = self.build_layers(&acyclic);

        Schedule { layers, cycles }
    }

    /// Tarjan's algorithm, following precedent edges inside `members`.
    pub fn tarjan_scc(
        &self,
        vertices: &[VertexId],
        members: &FxHashSet<VertexId>,
    ) -> Vec<Vec<VertexId>> {
        let mut roots: Vec<VertexId> = vertices.to_vec();
        roots.sort_unstable();
        roots.dedup();

        let mut index_counter = 0usize;
        let mut indices: FxHashMap<VertexId, usize> = FxHashMap::default();
        let mut lowlinks: FxHashMap<VertexId, usize> = FxHashMap::default();
        let mut on_stack: FxHashSet<VertexId> = FxHashSet::default();
        let mut stack: Vec<VertexId> = Vec::new();
        let mut sccs = Vec::new();

        for root in roots {
            if indices.contains_key(&root) {
                continue;
            }
            let mut call: Vec<Frame> = vec![self.enter(
                root,
                members,
                &mut index_counter,
                &mut indices,
                &mut lowlinks,
                &mut on_stack,
                &mut stack,
            )];

            while let Some(frame) = call.last_mut() {
                if frame.next < frame.succ.len() {
                    let w = frame.succ[frame.next];
                    frame.next += 1;
                    let v = frame.vertex;
                    if !indices.contains_key(&w) {
                        let child = self.enter(
                            w,
                            members,
                            &mut index_counter,
                            &mut indices,
                            &mut lowlinks,
                            &mut on_stack,
                            &mut stack,
                        );
                        call.push(child);
                    } else if on_stack.contains(&w) {
                        let low = lowlinks[&v].min(indices[&w]);
                        lowlinks.insert(v, low);
                    }
                    continue;
                }

                // all successors done
                let v = frame.vertex;
                call.pop();
                if let Some(parent) = call.last() {
                    let low = lowlinks[&parent.vertex].min(lowlinks[&v]);
                    lowlinks.insert(parent.vertex, low);
                }
                if lowlinks[&v] == indices[&v] {
                    let mut scc = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack.remove(&w);
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    scc.sort_unstable();
                    sccs.push(scc);
                }
            }
        }

        sccs
    }

    fn enter(
        &self,
        vertex: VertexId,
        members: &FxHashSet<VertexId>,
        index_counter: &mut usize,
        indices: &mut FxHashMap<VertexId, usize>,
        lowlinks: &mut FxHashMap<VertexId, usize>,
        on_stack: &mut FxHashSet<VertexId>,
        stack: &mut Vec<VertexId>,
    ) -> Frame {
        indices.insert(vertex, *index_counter);
        lowlinks.insert(vertex, *index_counter);
        *index_counter += 1;
        stack.push(vertex);
        on_stack.insert(vertex);

        let mut succ: Vec<VertexId> = self
            .graph
            .precedent_ids(vertex)
            .filter(|p| members.contains(p))
            .collect();
        succ.sort_unstable();
        Frame {
            vertex,
            succ,
            next: 0,
        }
    }

    fn separate_cycles(
        &self,
        sccs: Vec<Vec<VertexId>>,
    ) -> (Vec<Vec<VertexId>>, Vec<VertexId>) {
        let mut cycles = Vec::new();
        let mut acyclic = Vec::new();

        for scc in sccs {
            if scc.len() > 1 || (scc.len() == 1 && self.graph.has_edge(scc[0], scc[0])) {
                cycles.push(scc);
            } else {
                acyclic.extend(scc);
            }
        }

        (cycles, acyclic)
    }

    fn build_layers(&self, acyclic: &[VertexId]) -> Vec<Layer> {
        let set: FxHashSet<VertexId> = acyclic.iter().copied().collect();
        let mut in_degree: FxHashMap<VertexId, usize> = FxHashMap::default();
        for &v in acyclic {
            let n = self.graph.precedent_ids(v).filter(|p| set.contains(p)).count();
            in_degree.insert(v, n);
        }

        let mut current: Vec<VertexId> = acyclic
            .iter()
            .copied()
            .filter(|v| in_degree.get(v) == Some(&0))
            .collect();
        let mut layers = Vec::new();

        while !current.is_empty() {
            self.sort_by_position(&mut current);
            let mut next = Vec::new();
            for &v in &current {
                for dep in self.graph.dependent_ids(v) {
                    if let Some(d) = in_degree.get_mut(&dep) {
                        *d -= 1;
                        if *d == 0 {
                            next.push(dep);
                        }
                    }
                }
            }
            layers.push(Layer { vertices: current });
            current = next;
        }

        layers
    }

    fn sort_by_position(&self, vertices: &mut [VertexId]) {
        vertices.sort_by_key(|&v| (self.graph.addr_of(v), v));
    }
}
