use compact_str::CompactString;

use crate::tree::TreeId;

/// Identifier of a sketch in a [`SketchArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SketchId(u32);

/// Mutable metadata decorating a tree: a dotted `kind` tag, a display
/// name, and an ordered map of named child sketches.
///
/// Parsers publish named sub-regions here so analyzers and compilers can
/// retrieve them by key without re-scanning the document. A child sketch
/// may exist before the tree it will describe; it is bound later with
/// [`SketchArena::set_tree`].
#[derive(Debug, Clone)]
pub struct Sketch {
    kind: CompactString,
    name: CompactString,
    components: Vec<(CompactString, SketchId)>,
    parent: Option<SketchId>,
    tree: Option<TreeId>,
}

/// Arena storage for sketches; parent links are indices, so the component
/// graph carries no owning cycles.
#[derive(Debug, Clone, Default)]
pub struct SketchArena {
    items: Vec<Sketch>,
}

impl SketchArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: impl Into<CompactString>) -> SketchId {
        let id = SketchId(self.items.len() as u32);
        self.items.push(Sketch {
            kind: kind.into(),
            name: CompactString::default(),
            components: Vec::new(),
            parent: None,
            tree: None,
        });
        id
    }

    pub fn kind(&self, id: SketchId) -> &str {
        &self.items[id.0 as usize].kind
    }

    pub fn set_kind(&mut self, id: SketchId, kind: impl Into<CompactString>) {
        self.items[id.0 as usize].kind = kind.into();
    }

    pub fn name(&self, id: SketchId) -> &str {
        &self.items[id.0 as usize].name
    }

    pub fn set_name(&mut self, id: SketchId, name: impl Into<CompactString>) {
        self.items[id.0 as usize].name = name.into();
    }

    pub fn tree(&self, id: SketchId) -> Option<TreeId> {
        self.items[id.0 as usize].tree
    }

    pub fn set_tree(&mut self, id: SketchId, tree: TreeId) {
        self.items[id.0 as usize].tree = Some(tree);
    }

    pub fn parent(&self, id: SketchId) -> Option<SketchId> {
        self.items[id.0 as usize].parent
    }

    /// The component under `key`, created empty on first access.
    pub fn component(&mut self, id: SketchId, key: &str) -> SketchId {
        if let Some(existing) = self.find_component(id, key) {
            return existing;
        }
        let child = self.alloc(CompactString::default());
        self.items[child.0 as usize].parent = Some(id);
        self.items[id.0 as usize]
            .components
            .push((key.into(), child));
        child
    }

    /// The component under `key`, if it was ever created.
    pub fn find_component(&self, id: SketchId, key: &str) -> Option<SketchId> {
        self.items[id.0 as usize]
            .components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// The tree bound to the component under `key`.
    pub fn component_tree(&self, id: SketchId, key: &str) -> Option<TreeId> {
        self.find_component(id, key).and_then(|c| self.tree(c))
    }
}

/// Well-known component keys.
pub mod component {
    pub const OPEN: &str = "open";
    pub const CLOSE: &str = "close";
    pub const TYPE: &str = "type";
    pub const PARAMETER: &str = "parameter";
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const LEFT: &str = "left";
    pub const RIGHT: &str = "right";
    pub const SIGN: &str = "sign";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const BODY: &str = "body";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_is_created_once() {
        let mut sketches = SketchArena::new();
        let root = sketches.alloc("command");
        let a = sketches.component(root, component::TYPE);
        let b = sketches.component(root, component::TYPE);
        assert_eq!(a, b);
        assert_eq!(sketches.parent(a), Some(root));
        assert!(sketches.find_component(root, component::VALUE).is_none());
    }

    #[test]
    fn test_tree_binding() {
        let mut sketches = SketchArena::new();
        let root = sketches.alloc("command");
        let value = sketches.component(root, component::VALUE);
        assert_eq!(sketches.component_tree(root, component::VALUE), None);
        sketches.set_tree(value, TreeId::new(7));
        assert_eq!(
            sketches.component_tree(root, component::VALUE),
            Some(TreeId::new(7))
        );
    }
}
