//! Shape system: the hidden-class store behind every object.
//!
//! Objects with the same sequence of property definitions share a `Shape`.
//! A shape is an immutable node describing the ordered property layout
//! (key, slot index, attribute bits), the extensibility flag, and the
//! `ObjectKind` tag that selects the object's exotic behavior.
//!
//! Shapes form a transition tree: defining a property transitions to a
//! child shape that is created once, cached on the parent's transition
//! table, and shared by every object that independently acquires the same
//! property in the same order. Two objects with the same shape id are
//! therefore known in O(1) to have identical key sets, order, and
//! attributes.
//!
//! Shapes may be shared by execution contexts running on different native
//! threads, so the transition caches are `RwLock`-guarded and filled with
//! an insert-if-absent, at-most-one-winner protocol. Everything else on a
//! published shape is immutable.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::property::{PropertyFlags, PropertyKey};

/// Tag selecting the exotic kind strategy for objects with this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Ordinary,
    Array,
    MappedArguments,
    UnmappedArguments,
    Function,
    /// Boxed Boolean/Number/Symbol
    PrimitiveWrapper,
    /// Boxed String (exotic character indices)
    StringWrapper,
    ArrayBuffer,
    SharedArrayBuffer,
    TypedView,
    Map,
    Set,
    ModuleNamespace,
    Promise,
}

/// Unique identifier for a shape; equality of ids is equality of layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ShapeId(u32);

impl ShapeId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

static NEXT_SHAPE_ID: AtomicU32 = AtomicU32::new(1);

fn next_shape_id() -> ShapeId {
    ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Location and attributes of one property in a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRecord {
    /// Index into the object's flat slot array.
    pub slot: u32,
    pub flags: PropertyFlags,
}

type PropertyTable = IndexMap<PropertyKey, PropertyRecord, FxBuildHasher>;

/// Key under which a child shape is cached on its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TransitionKey {
    Add(PropertyKey, PropertyFlags),
    Replace(PropertyKey, PropertyFlags),
    Remove(PropertyKey),
    PreventExtensions,
}

/// An immutable property-layout node. See the module docs.
pub struct Shape {
    id: ShapeId,
    kind: ObjectKind,
    extensible: bool,
    /// Full ordered table, duplicated per node for O(1) lookup and
    /// insertion-ordered iteration without walking the transition tree.
    table: PropertyTable,
    slot_count: u32,
    /// Lazily filled cache of child shapes; this is the tree structure.
    transitions: RwLock<hashbrown::HashMap<TransitionKey, Arc<Shape>>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    pub fn property_count(&self) -> usize {
        self.table.len()
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// O(1) property lookup.
    pub fn lookup(&self, key: &PropertyKey) -> Option<PropertyRecord> {
        self.table.get(key).copied()
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.table.contains_key(key)
    }

    /// Properties in definition order.
    pub fn properties(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyRecord)> {
        self.table.iter()
    }

    /// Keys in definition order (not yet in enumeration order; the protocol
    /// layer applies index-first ordering).
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.table.keys()
    }

    /// Transition to the shape that additionally holds `key` with `flags`.
    ///
    /// The property must not be present yet; extensibility is the protocol
    /// layer's concern (bootstrap installs properties on non-extensible
    /// shapes, e.g. module namespaces).
    pub fn add_property(&self, key: PropertyKey, flags: PropertyFlags) -> Arc<Shape> {
        debug_assert!(!self.contains(&key), "property already present: {}", key);
        self.transition(TransitionKey::Add(key.clone(), flags), || {
            let mut table = self.table.clone();
            table.insert(
                key,
                PropertyRecord {
                    slot: self.slot_count,
                    flags,
                },
            );
            Shape {
                id: next_shape_id(),
                kind: self.kind,
                extensible: self.extensible,
                table,
                slot_count: self.slot_count + 1,
                transitions: RwLock::new(hashbrown::HashMap::new()),
            }
        })
    }

    /// Transition to the shape where `key` keeps its slot but carries
    /// different attribute bits. Returns `None` when the property is
    /// absent.
    pub fn replace_attributes(&self, key: &PropertyKey, flags: PropertyFlags) -> Option<Arc<Shape>> {
        let record = self.lookup(key)?;
        if record.flags == flags {
            return None;
        }
        Some(self.transition(TransitionKey::Replace(key.clone(), flags), || {
            let mut table = self.table.clone();
            table.insert(
                key.clone(),
                PropertyRecord {
                    slot: record.slot,
                    flags,
                },
            );
            Shape {
                id: next_shape_id(),
                kind: self.kind,
                extensible: self.extensible,
                table,
                slot_count: self.slot_count,
                transitions: RwLock::new(hashbrown::HashMap::new()),
            }
        }))
    }

    /// Transition to the shape without `key`. Returns the new shape and the
    /// freed slot index; slots above it shift down by one, and the caller
    /// must apply the same compaction to the object's slot array.
    pub fn remove_property(&self, key: &PropertyKey) -> Option<(Arc<Shape>, u32)> {
        let record = self.lookup(key)?;
        let removed_slot = record.slot;
        let child = self.transition(TransitionKey::Remove(key.clone()), || {
            let mut table = PropertyTable::default();
            for (k, r) in self.table.iter() {
                if k == key {
                    continue;
                }
                let slot = if r.slot > removed_slot {
                    r.slot - 1
                } else {
                    r.slot
                };
                table.insert(k.clone(), PropertyRecord { slot, ..*r });
            }
            Shape {
                id: next_shape_id(),
                kind: self.kind,
                extensible: self.extensible,
                table,
                slot_count: self.slot_count - 1,
                transitions: RwLock::new(hashbrown::HashMap::new()),
            }
        });
        Some((child, removed_slot))
    }

    /// Transition to the non-extensible twin of this shape. Returns `None`
    /// when already non-extensible.
    pub fn with_prevented_extensions(&self) -> Option<Arc<Shape>> {
        if !self.extensible {
            return None;
        }
        Some(self.transition(TransitionKey::PreventExtensions, || Shape {
            id: next_shape_id(),
            kind: self.kind,
            extensible: false,
            table: self.table.clone(),
            slot_count: self.slot_count,
            transitions: RwLock::new(hashbrown::HashMap::new()),
        }))
    }

    /// Cached transition lookup. Safe under concurrent readers and
    /// concurrent cache-fill writers: the write path re-checks under the
    /// exclusive lock, so exactly one creation wins and every caller
    /// observes the same child.
    fn transition(&self, key: TransitionKey, make: impl FnOnce() -> Shape) -> Arc<Shape> {
        if let Some(hit) = read_lock(&self.transitions).get(&key) {
            return hit.clone();
        }
        let mut transitions = write_lock(&self.transitions);
        if let Some(hit) = transitions.get(&key) {
            return hit.clone();
        }
        let created = Arc::new(make());
        transitions.insert(key, created.clone());
        created
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.id.0)
            .field("kind", &self.kind)
            .field("extensible", &self.extensible)
            .field("properties", &self.table.len())
            .finish()
    }
}

/// Mutable shape under construction.
///
/// This is the only mutable form a shape ever takes: bootstrap code for
/// built-in kinds declares the initial layout here, then `finish` publishes
/// an immutable root. Builders never escape to general code paths.
pub struct ShapeBuilder {
    kind: ObjectKind,
    extensible: bool,
    table: PropertyTable,
    slot_count: u32,
}

impl ShapeBuilder {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            extensible: true,
            table: PropertyTable::default(),
            slot_count: 0,
        }
    }

    /// Declare a property at the next slot.
    pub fn property(mut self, key: PropertyKey, flags: PropertyFlags) -> Self {
        debug_assert!(!self.table.contains_key(&key));
        self.table.insert(
            key,
            PropertyRecord {
                slot: self.slot_count,
                flags,
            },
        );
        self.slot_count += 1;
        self
    }

    pub fn extensible(mut self, extensible: bool) -> Self {
        self.extensible = extensible;
        self
    }

    /// Publish the immutable shape. The builder is consumed; the result is
    /// an ordinary root and participates in transition caching like any
    /// other shape.
    pub fn finish(self) -> Arc<Shape> {
        Arc::new(Shape {
            id: next_shape_id(),
            kind: self.kind,
            extensible: self.extensible,
            table: self.table,
            slot_count: self.slot_count,
            transitions: RwLock::new(hashbrown::HashMap::new()),
        })
    }
}

/// Process-wide store of root shapes, one per object kind.
///
/// A registry may be shared by several contexts (multi-context embeddings
/// share it through `Arc` so independently created objects converge on the
/// same shapes); `root` is safe under concurrent callers.
pub struct ShapeRegistry {
    roots: RwLock<hashbrown::HashMap<ObjectKind, Arc<Shape>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            roots: RwLock::new(hashbrown::HashMap::new()),
        }
    }

    /// The empty root shape for `kind`, created on first use.
    pub fn root(&self, kind: ObjectKind) -> Arc<Shape> {
        if let Some(hit) = read_lock(&self.roots).get(&kind) {
            return hit.clone();
        }
        let mut roots = write_lock(&self.roots);
        if let Some(hit) = roots.get(&kind) {
            return hit.clone();
        }
        let root = ShapeBuilder::new(kind).finish();
        roots.insert(kind, root.clone());
        root
    }

    /// Install a bootstrap-built root for `kind`, returning the existing
    /// root instead if one was already published (at-most-one-winner).
    pub fn install_root(&self, kind: ObjectKind, root: Arc<Shape>) -> Arc<Shape> {
        let mut roots = write_lock(&self.roots);
        roots.entry(kind).or_insert(root).clone()
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::from(s)
    }

    #[test]
    fn test_add_property_transitions_share() {
        let registry = ShapeRegistry::new();
        let root = registry.root(ObjectKind::Ordinary);

        let a1 = root.add_property(key("x"), PropertyFlags::default());
        let a2 = root.add_property(key("x"), PropertyFlags::default());
        assert_eq!(a1.id(), a2.id());
        assert!(Arc::ptr_eq(&a1, &a2));

        // Different attributes are a different transition
        let b = root.add_property(key("x"), PropertyFlags::read_only());
        assert_ne!(a1.id(), b.id());
    }

    #[test]
    fn test_same_history_converges() {
        let registry = ShapeRegistry::new();
        let root = registry.root(ObjectKind::Ordinary);

        let s1 = root
            .add_property(key("a"), PropertyFlags::default())
            .add_property(key("b"), PropertyFlags::default());
        let s2 = root
            .add_property(key("a"), PropertyFlags::default())
            .add_property(key("b"), PropertyFlags::default());
        assert_eq!(s1.id(), s2.id());

        // Different order diverges
        let s3 = root
            .add_property(key("b"), PropertyFlags::default())
            .add_property(key("a"), PropertyFlags::default());
        assert_ne!(s1.id(), s3.id());
    }

    #[test]
    fn test_slot_assignment() {
        let registry = ShapeRegistry::new();
        let shape = registry
            .root(ObjectKind::Ordinary)
            .add_property(key("a"), PropertyFlags::default())
            .add_property(key("b"), PropertyFlags::default());

        assert_eq!(shape.lookup(&key("a")).map(|r| r.slot), Some(0));
        assert_eq!(shape.lookup(&key("b")).map(|r| r.slot), Some(1));
        assert_eq!(shape.slot_count(), 2);
        assert!(shape.lookup(&key("c")).is_none());
    }

    #[test]
    fn test_remove_property_compacts_slots() {
        let registry = ShapeRegistry::new();
        let shape = registry
            .root(ObjectKind::Ordinary)
            .add_property(key("a"), PropertyFlags::default())
            .add_property(key("b"), PropertyFlags::default())
            .add_property(key("c"), PropertyFlags::default());

        let (removed, slot) = shape.remove_property(&key("b")).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(removed.lookup(&key("a")).map(|r| r.slot), Some(0));
        assert_eq!(removed.lookup(&key("c")).map(|r| r.slot), Some(1));
        assert_eq!(removed.slot_count(), 2);
        assert!(!removed.contains(&key("b")));
    }

    #[test]
    fn test_prevent_extensions_transition() {
        let registry = ShapeRegistry::new();
        let root = registry.root(ObjectKind::Ordinary);
        assert!(root.is_extensible());

        let sealed = root.with_prevented_extensions().unwrap();
        assert!(!sealed.is_extensible());
        // One-way: already sealed shapes report no further transition
        assert!(sealed.with_prevented_extensions().is_none());
        // Cached: the same child every time
        assert!(Arc::ptr_eq(&sealed, &root.with_prevented_extensions().unwrap()));
    }

    #[test]
    fn test_replace_attributes_keeps_slot() {
        let registry = ShapeRegistry::new();
        let shape = registry
            .root(ObjectKind::Ordinary)
            .add_property(key("x"), PropertyFlags::default());

        let frozen = shape
            .replace_attributes(&key("x"), PropertyFlags::frozen_data())
            .unwrap();
        assert_eq!(frozen.lookup(&key("x")).map(|r| r.slot), Some(0));
        assert_eq!(
            frozen.lookup(&key("x")).map(|r| r.flags),
            Some(PropertyFlags::frozen_data())
        );
        // No-op replacement reports no transition
        assert!(shape
            .replace_attributes(&key("x"), PropertyFlags::default())
            .is_none());
    }

    #[test]
    fn test_builder_roots() {
        let root = ShapeBuilder::new(ObjectKind::UnmappedArguments)
            .property(key("length"), PropertyFlags::hidden())
            .property(key("callee"), PropertyFlags::ACCESSOR)
            .finish();
        assert_eq!(root.property_count(), 2);
        assert_eq!(root.lookup(&key("callee")).map(|r| r.slot), Some(1));

        let registry = ShapeRegistry::new();
        let installed = registry.install_root(ObjectKind::UnmappedArguments, root.clone());
        assert!(Arc::ptr_eq(&root, &installed));
        // Second install loses to the first
        let other = ShapeBuilder::new(ObjectKind::UnmappedArguments).finish();
        let kept = registry.install_root(ObjectKind::UnmappedArguments, other);
        assert!(Arc::ptr_eq(&root, &kept));
    }

    #[test]
    fn test_concurrent_transition_single_winner() {
        let registry = ShapeRegistry::new();
        let root = registry.root(ObjectKind::Ordinary);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let root = root.clone();
                std::thread::spawn(move || {
                    root.add_property(PropertyKey::from("x"), PropertyFlags::default())
                        .id()
                })
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
