//! The ACPI namespace.
//!
//! A tree of [`NameSeg`]-keyed nodes rooted at `\`. The namespace is the sole
//! owner of every named object; everything else refers to objects by
//! [`AmlPath`]. Children are kept in a `BTreeMap`, so enumeration order is
//! deterministic.
//!
//! Name lookup follows the ACPI rules: a name with a `\` or `^` prefix, or
//! with more than one segment, denotes exactly one location. A bare
//! single-segment name is searched for in the current scope and then in
//! each enclosing scope up to the root.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

use crate::error::AmlError;
use crate::name::{AmlPath, NameSeg, NameString};
use crate::object::Object;

/// Scopes every namespace starts with.
const PREDEFINED_SCOPES: [NameSeg; 5] = [
    NameSeg::from_str("_GPE"),
    NameSeg::from_str("_PR"),
    NameSeg::from_str("_SB"),
    NameSeg::from_str("_SI"),
    NameSeg::from_str("_TZ"),
];

/// Aliases are followed at most this many times, so an alias cycle fails
/// lookup instead of looping.
const MAX_ALIAS_DEPTH: usize = 8;

/// How [`Namespace::find_object`] treats single-segment names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Apply the upward search rule.
    Search,
    /// Only look at the exact location the name denotes.
    NoSearch,
}

/// What a [`Namespace::walk`] callback wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Visit this node's children.
    Descend,
    /// Skip this node's children.
    Skip,
    /// End the walk.
    Stop,
}

struct Node {
    object: Object,
    children: BTreeMap<NameSeg, Node>,
}

impl Node {
    fn new(object: Object) -> Self {
        Self {
            object,
            children: BTreeMap::new(),
        }
    }
}

/// The object tree.
pub struct Namespace {
    root: Node,
}

impl Namespace {
    /// Creates a namespace holding `\` and the predefined scopes
    /// (`\_GPE`, `\_PR_`, `\_SB_`, `\_SI_`, `\_TZ_`).
    #[must_use]
    pub fn new() -> Self {
        let mut root = Node::new(Object::Scope);
        for seg in PREDEFINED_SCOPES {
            root.children.insert(seg, Node::new(Object::Scope));
        }
        Self { root }
    }

    fn node(&self, path: &AmlPath) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, seg| node.children.get(seg))
    }

    fn node_mut(&mut self, path: &AmlPath) -> Option<&mut Node> {
        path.segments()
            .iter()
            .try_fold(&mut self.root, |node, seg| node.children.get_mut(seg))
    }

    /// Adds `object` at `path`.
    ///
    /// The parent scope must already exist and the name must be free.
    pub fn insert(&mut self, path: &AmlPath, object: Object) -> Result<(), AmlError> {
        let (parent, seg) = match (path.parent(), path.last()) {
            (Some(parent), Some(seg)) => (parent, seg),
            _ => return Err(AmlError::ObjectAlreadyExists(format!("{path}"))),
        };
        let node = self
            .node_mut(&parent)
            .ok_or_else(|| AmlError::InvalidScope(format!("{parent}")))?;
        if node.children.contains_key(&seg) {
            return Err(AmlError::ObjectAlreadyExists(format!("{path}")));
        }
        node.children.insert(seg, Node::new(object));
        Ok(())
    }

    /// Removes the object at `path` together with everything beneath it.
    pub fn remove(&mut self, path: &AmlPath) -> Option<Object> {
        let parent = path.parent()?;
        let seg = path.last()?;
        self.node_mut(&parent)?
            .children
            .remove(&seg)
            .map(|node| node.object)
    }

    /// Returns the object stored exactly at `path`.
    #[must_use]
    pub fn get(&self, path: &AmlPath) -> Option<&Object> {
        self.node(path).map(|node| &node.object)
    }

    /// Returns the object stored exactly at `path`, mutably.
    pub fn get_mut(&mut self, path: &AmlPath) -> Option<&mut Object> {
        self.node_mut(path).map(|node| &mut node.object)
    }

    /// Returns `true` if an object exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &AmlPath) -> bool {
        self.node(path).is_some()
    }

    /// Follows aliases starting at `path` and returns the final location.
    pub fn resolve_alias(&self, path: &AmlPath) -> Result<AmlPath, AmlError> {
        let mut current = *path;
        for _ in 0..MAX_ALIAS_DEPTH {
            match self.get(&current) {
                Some(Object::Alias(target)) => current = *target,
                Some(_) => return Ok(current),
                None => return Err(AmlError::ObjectNotFound(format!("{current}"))),
            }
        }
        Err(AmlError::ObjectNotFound(format!("{path}")))
    }

    /// Resolves `name` relative to `scope` to the path of an existing object.
    ///
    /// Aliases are followed, so the returned path never names an alias.
    pub fn lookup(
        &self,
        scope: &AmlPath,
        name: &NameString,
        mode: LookupMode,
    ) -> Result<AmlPath, AmlError> {
        let found = if mode == LookupMode::Search && name.is_search_candidate() {
            let seg = name.segments[0];
            let mut base = *scope;
            loop {
                let candidate = base.join(seg)?;
                if self.contains(&candidate) {
                    break Some(candidate);
                }
                if base.pop().is_none() {
                    break None;
                }
            }
        } else {
            let path = name.resolve(scope)?;
            self.contains(&path).then_some(path)
        };

        match found {
            Some(path) => self.resolve_alias(&path),
            None => Err(AmlError::ObjectNotFound(format!("{name}"))),
        }
    }

    /// Finds the object `name` refers to from `scope`.
    ///
    /// Returns the object's absolute path (after following aliases) and a
    /// reference to it.
    pub fn find_object(
        &self,
        scope: &AmlPath,
        name: &NameString,
        mode: LookupMode,
    ) -> Result<(AmlPath, &Object), AmlError> {
        let path = self.lookup(scope, name, mode)?;
        let object = self
            .get(&path)
            .ok_or_else(|| AmlError::ObjectNotFound(format!("{name}")))?;
        Ok((path, object))
    }

    /// Returns the names of the direct children of `path`.
    #[must_use]
    pub fn children(&self, path: &AmlPath) -> Vec<NameSeg> {
        self.node(path)
            .map(|node| node.children.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Visits `start` and its descendants depth-first, parents before
    /// children, siblings in name order.
    ///
    /// The callback's [`WalkAction`] controls whether a node's children are
    /// visited. Returns `false` if the walk was stopped early.
    pub fn walk(
        &self,
        start: &AmlPath,
        mut visit: impl FnMut(&AmlPath, &Object) -> WalkAction,
    ) -> bool {
        match self.node(start) {
            Some(node) => Self::walk_node(*start, node, &mut visit),
            None => true,
        }
    }

    fn walk_node(
        path: AmlPath,
        node: &Node,
        visit: &mut impl FnMut(&AmlPath, &Object) -> WalkAction,
    ) -> bool {
        match visit(&path, &node.object) {
            WalkAction::Stop => return false,
            WalkAction::Skip => return true,
            WalkAction::Descend => {}
        }
        for (&seg, child) in &node.children {
            let Ok(child_path) = path.join(seg) else {
                continue;
            };
            if !Self::walk_node(child_path, child, visit) {
                return false;
            }
        }
        true
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_map();
        self.walk(&AmlPath::ROOT, |path, object| {
            list.entry(path, &object.object_type());
            WalkAction::Descend
        });
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NamePrefix;

    fn path(s: &str) -> AmlPath {
        AmlPath::parse_str(s).unwrap()
    }

    fn name(s: &str) -> NameString {
        NameString::parse_str(s).unwrap()
    }

    fn sample() -> Namespace {
        let mut ns = Namespace::new();
        ns.insert(&path("\\_SB.PCI0"), Object::Device).unwrap();
        ns.insert(&path("\\_SB.PCI0.LPCB"), Object::Device).unwrap();
        ns.insert(&path("\\_SB.PCI0.FOO"), Object::Integer(1)).unwrap();
        ns.insert(&path("\\FOO"), Object::Integer(2)).unwrap();
        ns
    }

    #[test]
    fn predefined_scopes_exist() {
        let ns = Namespace::new();
        for p in ["\\_SB", "\\_PR", "\\_GPE", "\\_SI", "\\_TZ"] {
            assert!(ns.contains(&path(p)), "{p}");
        }
    }

    #[test]
    fn upward_search_finds_nearest() {
        let ns = sample();
        let scope = path("\\_SB.PCI0.LPCB");
        let (found, object) = ns.find_object(&scope, &name("FOO"), LookupMode::Search).unwrap();
        assert_eq!(found, path("\\_SB.PCI0.FOO"));
        assert!(matches!(object, Object::Integer(1)));

        let (found, _) = ns.find_object(&path("\\_SB"), &name("FOO"), LookupMode::Search).unwrap();
        assert_eq!(found, path("\\FOO"));
    }

    #[test]
    fn no_search_mode_is_exact() {
        let ns = sample();
        let scope = path("\\_SB.PCI0.LPCB");
        assert!(matches!(
            ns.find_object(&scope, &name("FOO"), LookupMode::NoSearch),
            Err(AmlError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn multi_segment_names_are_not_searched() {
        let ns = sample();
        let scope = path("\\_SB.PCI0.LPCB");
        assert!(ns.find_object(&scope, &name("PCI0.FOO"), LookupMode::Search).is_err());
        assert!(ns.find_object(&path("\\_SB"), &name("PCI0.FOO"), LookupMode::Search).is_ok());
    }

    #[test]
    fn absolute_and_parent_resolution() {
        let ns = sample();
        let scope = path("\\_SB.PCI0.LPCB");
        let (p, _) = ns.find_object(&scope, &name("\\FOO"), LookupMode::Search).unwrap();
        assert_eq!(p, path("\\FOO"));
        let parent = NameString {
            prefix: NamePrefix::Parent(1),
            segments: alloc::vec![NameSeg::from_str("FOO")],
        };
        let (p, _) = ns.find_object(&scope, &parent, LookupMode::Search).unwrap();
        assert_eq!(p, path("\\_SB.PCI0.FOO"));
    }

    #[test]
    fn duplicate_and_orphan_inserts_fail() {
        let mut ns = sample();
        assert!(matches!(
            ns.insert(&path("\\FOO"), Object::Integer(3)),
            Err(AmlError::ObjectAlreadyExists(_))
        ));
        assert!(matches!(
            ns.insert(&path("\\NOPE.BAR"), Object::Integer(3)),
            Err(AmlError::InvalidScope(_))
        ));
    }

    #[test]
    fn remove_drops_subtree() {
        let mut ns = sample();
        assert!(ns.remove(&path("\\_SB.PCI0")).is_some());
        assert!(!ns.contains(&path("\\_SB.PCI0.LPCB")));
        assert!(ns.remove(&path("\\_SB.PCI0")).is_none());
    }

    #[test]
    fn aliases_are_followed() {
        let mut ns = sample();
        ns.insert(&path("\\BAR"), Object::Alias(path("\\_SB.PCI0.FOO"))).unwrap();
        let (p, object) = ns.find_object(&AmlPath::ROOT, &name("BAR"), LookupMode::Search).unwrap();
        assert_eq!(p, path("\\_SB.PCI0.FOO"));
        assert!(matches!(object, Object::Integer(1)));
    }

    #[test]
    fn walk_visits_parents_first_and_can_skip() {
        let ns = sample();
        let mut seen = Vec::new();
        ns.walk(&path("\\_SB"), |p, object| {
            seen.push(alloc::format!("{p}"));
            if matches!(object, Object::Device) && p.depth() == 3 {
                WalkAction::Skip
            } else {
                WalkAction::Descend
            }
        });
        assert_eq!(seen, ["\\_SB", "\\_SB.PCI0", "\\_SB.PCI0.FOO", "\\_SB.PCI0.LPCB"]);
    }
}
