//! Reader registry mapping schema paths to customizers.
//!
//! Readers are registered once at startup through a
//! [`ReaderRegistryBuilder`] and frozen into an immutable [`ReaderRegistry`]
//! that can be shared freely between concurrent reads.
//!
//! Siblings under one parent are ordered by explicit before/after
//! constraints first and by registration order second. The order is a
//! topological sort of the constraint graph, recomputed whenever a
//! constraint is added, so a cycle is reported at registration time.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::customizer::{ListReaderCustomizer, Reader, StructuralReaderCustomizer};
use crate::error::{ReaderError, Result};
use crate::path::SchemaPath;

/// Position of a new reader relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Read before the anchor.
    Before,
    /// Read after the anchor.
    After,
}

/// Groups the registrations of one plugin.
pub trait ReaderFactory {
    /// Register this plugin's readers.
    ///
    /// # Errors
    ///
    /// Propagates any registration error; startup must stop on it.
    fn init(&self, registry: &mut ReaderRegistryBuilder) -> Result<()>;
}

/// Registered readers under one parent and their ordering constraints.
#[derive(Debug, Default)]
struct Siblings {
    /// Members in registration order.
    members: Vec<SchemaPath>,
    /// `(a, b)`: `a` is read before `b`.
    edges: Vec<(SchemaPath, SchemaPath)>,
    /// Current resolved order.
    order: Vec<SchemaPath>,
}

impl Siblings {
    /// Recompute `order`, returning the members left on a cycle if any.
    fn resolve(&mut self) -> std::result::Result<(), Vec<SchemaPath>> {
        let position: HashMap<&SchemaPath, usize> = self
            .members
            .iter()
            .enumerate()
            .map(|(index, path)| (path, index))
            .collect();

        let n = self.members.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for (before, after) in &self.edges {
            if let (Some(&a), Some(&b)) = (position.get(before), position.get(after)) {
                successors[a].push(b);
                in_degree[b] += 1;
            }
        }

        // Pass one detects cycles; pass two orders by rank.
        let topo = kahn(&successors, in_degree.clone(), |index| index);
        if topo.len() < n {
            let emitted: Vec<bool> = (0..n).map(|i| topo.contains(&i)).collect();
            return Err((0..n)
                .filter(|&i| !emitted[i])
                .map(|i| self.members[i].clone())
                .collect());
        }

        // A node's rank is the earliest registration slot among itself and
        // everything that must follow it, so a reader placed before an
        // anchor takes the anchor's slot instead of sinking to the end.
        let mut rank: Vec<usize> = (0..n).collect();
        for &index in topo.iter().rev() {
            for &next in &successors[index] {
                rank[index] = rank[index].min(rank[next]);
            }
        }

        let order = kahn(&successors, in_degree, |index| (rank[index], index));
        self.order = order
            .into_iter()
            .map(|index| self.members[index].clone())
            .collect();
        Ok(())
    }
}

/// Kahn's algorithm, always emitting the ready node with the smallest priority.
fn kahn<P: Ord>(
    successors: &[Vec<usize>],
    mut in_degree: Vec<usize>,
    priority: impl Fn(usize) -> P,
) -> Vec<usize> {
    let mut ready: BinaryHeap<Reverse<(P, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse((priority(index), index)))
        .collect();

    let mut order = Vec::with_capacity(successors.len());
    while let Some(Reverse((_, index))) = ready.pop() {
        order.push(index);
        for &next in &successors[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((priority(next), next)));
            }
        }
    }
    order
}

/// Mutable registry used while plugins register their readers.
#[derive(Debug, Default)]
pub struct ReaderRegistryBuilder {
    readers: HashMap<SchemaPath, Reader>,
    siblings: HashMap<Option<SchemaPath>, Siblings>,
}

impl ReaderRegistryBuilder {
    /// Create a new empty registry builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader at `path`.
    ///
    /// # Errors
    ///
    /// `DuplicatePath` if a reader is already registered at `path`,
    /// `InvalidPath` if `path` carries a key.
    pub fn register(&mut self, path: SchemaPath, reader: Reader) -> Result<()> {
        self.check_new(&path)?;
        self.insert(path, reader);
        Ok(())
    }

    /// Register a reader at `path`, ordered relative to a registered sibling.
    ///
    /// # Errors
    ///
    /// `DuplicatePath`, `InvalidPath`, `UnknownAnchor` if `anchor` is not
    /// registered, `AnchorNotSibling` if it has a different parent,
    /// `OrderCycle` if the constraint closes a cycle.
    pub fn register_relative(
        &mut self,
        path: SchemaPath,
        reader: Reader,
        anchor: &SchemaPath,
        placement: Placement,
    ) -> Result<()> {
        self.check_new(&path)?;
        self.check_anchor(&path, anchor)?;
        self.insert(path.clone(), reader);

        if let Err(err) = self.constrain(&path, anchor, placement) {
            self.remove(&path);
            return Err(err);
        }
        Ok(())
    }

    /// Add an ordering constraint between two registered siblings.
    ///
    /// # Errors
    ///
    /// `UnregisteredPath` if `path` is not registered, `UnknownAnchor`,
    /// `AnchorNotSibling`, or `OrderCycle` if the constraint closes a cycle.
    pub fn add_order(
        &mut self,
        path: &SchemaPath,
        anchor: &SchemaPath,
        placement: Placement,
    ) -> Result<()> {
        if !self.readers.contains_key(path) {
            return Err(ReaderError::UnregisteredPath(path.clone()));
        }
        self.check_anchor(path, anchor)?;
        self.constrain(path, anchor, placement)
    }

    /// Register a [`ContainerCustomizer`](crate::ContainerCustomizer) at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn add_structural(&mut self, path: SchemaPath) -> Result<()> {
        self.register(path, Reader::container())
    }

    /// Register a custom structural customizer at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn add_structural_reader(
        &mut self,
        path: SchemaPath,
        customizer: impl StructuralReaderCustomizer,
    ) -> Result<()> {
        self.register(path, Reader::structural(customizer))
    }

    /// Register a list customizer at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn add_list(
        &mut self,
        path: SchemaPath,
        customizer: impl ListReaderCustomizer,
    ) -> Result<()> {
        self.register(path, Reader::list(customizer))
    }

    /// Run a factory's registrations.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error.
    pub fn add_factory(&mut self, factory: &dyn ReaderFactory) -> Result<()> {
        factory.init(self)
    }

    /// Whether a reader is registered at `path`.
    #[must_use]
    pub fn contains(&self, path: &SchemaPath) -> bool {
        self.readers.contains_key(path)
    }

    /// Ordered children of `path` registered so far.
    #[must_use]
    pub fn children_of(&self, path: &SchemaPath) -> &[SchemaPath] {
        self.siblings
            .get(&Some(path.schema()))
            .map(|s| s.order.as_slice())
            .unwrap_or_default()
    }

    /// Freeze the registrations into a shareable registry.
    ///
    /// # Errors
    ///
    /// `MissingParent` if a registered non-root path has no registered
    /// parent, since its subtree could never be read.
    pub fn build(self) -> Result<ReaderRegistry> {
        let mut paths: Vec<&SchemaPath> = self.readers.keys().collect();
        paths.sort();
        for path in paths {
            if let Some(parent) = path.parent() {
                if !self.readers.contains_key(&parent) {
                    return Err(ReaderError::MissingParent {
                        path: path.clone(),
                        parent,
                    });
                }
            }
        }

        let children = self
            .siblings
            .into_iter()
            .map(|(parent, siblings)| (parent, siblings.order))
            .collect();

        tracing::debug!(readers = self.readers.len(), "reader registry built");

        Ok(ReaderRegistry {
            readers: self.readers,
            children,
        })
    }

    fn check_new(&self, path: &SchemaPath) -> Result<()> {
        if path.is_keyed() {
            return Err(ReaderError::InvalidPath {
                path: path.to_string(),
                reason: "registration paths cannot carry keys".to_string(),
            });
        }
        if self.readers.contains_key(path) {
            return Err(ReaderError::DuplicatePath(path.clone()));
        }
        Ok(())
    }

    fn check_anchor(&self, path: &SchemaPath, anchor: &SchemaPath) -> Result<()> {
        if !self.readers.contains_key(anchor) {
            return Err(ReaderError::UnknownAnchor {
                path: path.clone(),
                anchor: anchor.clone(),
            });
        }
        if path.parent() != anchor.parent() {
            return Err(ReaderError::AnchorNotSibling {
                path: path.clone(),
                anchor: anchor.clone(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, path: SchemaPath, reader: Reader) {
        tracing::debug!(path = %path, structural = reader.is_structural(), "registered reader");

        let siblings = self.siblings.entry(path.parent()).or_default();
        siblings.members.push(path.clone());
        siblings.order.push(path.clone());
        self.readers.insert(path, reader);
    }

    fn remove(&mut self, path: &SchemaPath) {
        self.readers.remove(path);
        if let Some(siblings) = self.siblings.get_mut(&path.parent()) {
            siblings.members.retain(|member| member != path);
            siblings
                .edges
                .retain(|(before, after)| before != path && after != path);
            siblings.order.retain(|member| member != path);
        }
    }

    fn constrain(
        &mut self,
        path: &SchemaPath,
        anchor: &SchemaPath,
        placement: Placement,
    ) -> Result<()> {
        let parent = path.parent();
        let cycle = |members| ReaderError::OrderCycle {
            parent: parent.clone().unwrap_or_else(|| path.clone()),
            members,
        };

        if path == anchor {
            return Err(cycle(vec![path.clone()]));
        }

        let edge = match placement {
            Placement::Before => (path.clone(), anchor.clone()),
            Placement::After => (anchor.clone(), path.clone()),
        };

        let siblings = self.siblings.entry(parent.clone()).or_default();
        siblings.edges.push(edge);
        if let Err(members) = siblings.resolve() {
            siblings.edges.pop();
            return Err(cycle(members));
        }

        tracing::debug!(path = %path, anchor = %anchor, ?placement, "added ordering constraint");
        Ok(())
    }
}

/// Immutable registry of readers, shared by all reads.
#[derive(Debug)]
pub struct ReaderRegistry {
    readers: HashMap<SchemaPath, Reader>,
    children: HashMap<Option<SchemaPath>, Vec<SchemaPath>>,
}

impl ReaderRegistry {
    /// Reader registered for the node addressed by `path`.
    ///
    /// Keys in `path` are ignored.
    pub fn get(&self, path: &SchemaPath) -> Option<&Reader> {
        self.readers.get(&path.schema())
    }

    /// Whether a reader is registered for the node addressed by `path`.
    #[must_use]
    pub fn contains(&self, path: &SchemaPath) -> bool {
        self.readers.contains_key(&path.schema())
    }

    /// Registration paths of the children of `path`, in read order.
    ///
    /// Keys in `path` are ignored.
    #[must_use]
    pub fn children_of(&self, path: &SchemaPath) -> &[SchemaPath] {
        self.children
            .get(&Some(path.schema()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Registered root paths, in read order.
    #[must_use]
    pub fn roots(&self) -> &[SchemaPath] {
        self.children
            .get(&None)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All registered paths in pre-order.
    #[must_use]
    pub fn paths(&self) -> Vec<&SchemaPath> {
        let mut out = Vec::with_capacity(self.readers.len());
        let mut stack: Vec<&SchemaPath> = self.roots().iter().rev().collect();
        while let Some(path) = stack.pop() {
            out.push(path);
            stack.extend(self.children_of(path).iter().rev());
        }
        out
    }

    /// Number of registered readers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Whether no reader is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}
