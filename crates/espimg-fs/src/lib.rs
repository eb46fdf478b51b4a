//! The in-memory logical filesystem tree (C4, §4.4): directories and files
//! as arena-indexed nodes, avoiding the parent/child reference cycle a
//! pointer-based tree would require (§9).

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("a directory or file named {0:?} already exists in this directory")]
    DuplicateName(String),
    #[error("node is not a directory")]
    NotADirectory,
    #[error("node is not a file")]
    NotAFile,
    #[error("io error reading {path:?}: {source}")]
    HostIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

pub const ROOT_ID: NodeId = NodeId(0);

#[derive(Debug)]
pub struct DirNode {
    pub name: String,
    pub parent: NodeId,
    /// Child name (already case-normalized) to child node, kept as a
    /// `BTreeMap` so iteration order is always the canonical lexicographic
    /// order emission requires (§4.4) without a separate sort step.
    pub children: BTreeMap<String, NodeId>,
    /// Set by the FAT formatter during emission.
    pub start_cluster: Option<u32>,
}

#[derive(Debug)]
pub struct FileNode {
    pub name: String,
    pub parent: NodeId,
    pub data: Vec<u8>,
    pub start_cluster: Option<u32>,
}

impl FileNode {
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

#[derive(Debug)]
pub enum Node {
    Directory(DirNode),
    File(FileNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(d) => &d.name,
            Node::File(f) => &f.name,
        }
    }

    pub fn parent(&self) -> NodeId {
        match self {
            Node::Directory(d) => d.parent,
            Node::File(f) => f.parent,
        }
    }

    pub fn as_dir(&self) -> Option<&DirNode> {
        match self {
            Node::Directory(d) => Some(d),
            Node::File(_) => None,
        }
    }

    pub fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match self {
            Node::Directory(d) => Some(d),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(f) => Some(f),
            Node::Directory(_) => None,
        }
    }
}

/// An arena-backed directory tree. Every directory but the root has a
/// parent within the tree (§3 invariant); names are unique within a
/// directory after case normalization.
pub struct Tree {
    nodes: Vec<Node>,
    preserve_case: bool,
}

impl Tree {
    pub fn new(preserve_case: bool) -> Self {
        let root = Node::Directory(DirNode {
            name: String::new(),
            parent: ROOT_ID,
            children: BTreeMap::new(),
            start_cluster: None,
        });
        Self {
            nodes: vec![root],
            preserve_case,
        }
    }

    fn normalize(&self, name: &str) -> String {
        if self.preserve_case {
            name.to_string()
        } else {
            name.to_ascii_uppercase()
        }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    pub fn create_directory(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let normalized = self.normalize(name);
        let parent_dir = self
            .get(parent)
            .as_dir()
            .ok_or(FsError::NotADirectory)?;
        if parent_dir.children.contains_key(&normalized) {
            return Err(FsError::DuplicateName(normalized));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::Directory(DirNode {
            name: normalized.clone(),
            parent,
            children: BTreeMap::new(),
            start_cluster: None,
        }));

        self.get_mut(parent)
            .as_dir_mut()
            .expect("checked above")
            .children
            .insert(normalized, id);
        Ok(id)
    }

    pub fn create_file(&mut self, parent: NodeId, name: &str, data: Vec<u8>) -> Result<NodeId> {
        let normalized = self.normalize(name);
        let parent_dir = self
            .get(parent)
            .as_dir()
            .ok_or(FsError::NotADirectory)?;
        if parent_dir.children.contains_key(&normalized) {
            return Err(FsError::DuplicateName(normalized));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::File(FileNode {
            name: normalized.clone(),
            parent,
            data,
            start_cluster: None,
        }));

        self.get_mut(parent)
            .as_dir_mut()
            .expect("checked above")
            .children
            .insert(normalized, id);
        Ok(id)
    }

    pub fn set_start_cluster(&mut self, id: NodeId, cluster: u32) {
        match self.get_mut(id) {
            Node::Directory(d) => d.start_cluster = Some(cluster),
            Node::File(f) => f.start_cluster = Some(cluster),
        }
    }

    /// Aggregate content size: file bytes plus 512 bytes per directory, a
    /// lower bound used only for image sizing (§3).
    pub fn aggregate_size(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Directory(_) => 512,
                Node::File(f) => f.data.len() as u64,
            })
            .sum()
    }

    /// Depth-first traversal in stable (lexicographic) child order, parent
    /// visited before children. Used identically by the FAT-table walk and
    /// the directory/file emission walk (§4.6.3, §4.6.4) so cluster
    /// allocation and on-disk emission never disagree.
    pub fn walk(&self) -> Vec<NodeId> {
        fn visit(tree: &Tree, id: NodeId, order: &mut Vec<NodeId>) {
            order.push(id);
            if let Some(dir) = tree.get(id).as_dir() {
                for child in dir.children.values() {
                    visit(tree, *child, order);
                }
            }
        }
        let mut order = Vec::new();
        visit(self, self.root(), &mut order);
        order
    }

    /// Populates the tree from a host directory, depth-first, children
    /// visited in iterator order, using an explicit directory stack so the
    /// current parent is always known (§4.4, §9 — an iterator-based
    /// recursive traversal that loses parent context would misassign
    /// children; this walk never does).
    pub fn create_from_source(&mut self, host_path: &Path) -> Result<()> {
        self.copy_directory_contents(self.root(), host_path)
    }

    fn copy_directory_contents(&mut self, parent: NodeId, host_dir: &Path) -> Result<()> {
        let mut stack: Vec<(NodeId, std::path::PathBuf)> = vec![(parent, host_dir.to_path_buf())];
        while let Some((current_parent, dir_path)) = stack.pop() {
            let entries = std::fs::read_dir(&dir_path).map_err(|source| FsError::HostIo {
                path: dir_path.clone(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| FsError::HostIo {
                    path: dir_path.clone(),
                    source,
                })?;
                let path = entry.path();
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let file_type = entry.file_type().map_err(|source| FsError::HostIo {
                    path: path.clone(),
                    source,
                })?;
                if file_type.is_dir() {
                    let id = self.create_directory(current_parent, &name)?;
                    stack.push((id, path));
                } else if file_type.is_file() {
                    let data = std::fs::read(&path).map_err(|source| FsError::HostIo {
                        path: path.clone(),
                        source,
                    })?;
                    self.create_file(current_parent, &name, data)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_uppercased_by_default() {
        let mut tree = Tree::new(false);
        let efi = tree.create_directory(tree.root(), "efi").unwrap();
        assert_eq!(tree.get(efi).name(), "EFI");
    }

    #[test]
    fn preserve_case_keeps_lowercase() {
        let mut tree = Tree::new(true);
        let efi = tree.create_directory(tree.root(), "efi").unwrap();
        assert_eq!(tree.get(efi).name(), "efi");
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut tree = Tree::new(false);
        tree.create_directory(tree.root(), "EFI").unwrap();
        assert!(matches!(
            tree.create_directory(tree.root(), "efi"),
            Err(FsError::DuplicateName(_))
        ));
    }

    #[test]
    fn walk_visits_depth_first_in_lexicographic_order() {
        let mut tree = Tree::new(false);
        let a = tree.create_directory(tree.root(), "A").unwrap();
        let b = tree.create_directory(a, "B").unwrap();
        tree.create_file(b, "file.bin", vec![0x42]).unwrap();
        let order = tree.walk();
        let names: Vec<&str> = order.iter().map(|id| tree.get(*id).name()).collect();
        assert_eq!(names, vec!["", "A", "B", "FILE.BIN"]);
    }

    #[test]
    fn create_from_source_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("EFI/BOOT")).unwrap();
        std::fs::write(dir.path().join("EFI/BOOT/BOOTX64.EFI"), [0xDE, 0xAD, 0xBE, 0xEF])
            .unwrap();

        let mut tree = Tree::new(false);
        tree.create_from_source(dir.path()).unwrap();

        let root = tree.root();
        let efi_id = *tree.get(root).as_dir().unwrap().children.get("EFI").unwrap();
        let boot_id = *tree
            .get(efi_id)
            .as_dir()
            .unwrap()
            .children
            .get("BOOT")
            .unwrap();
        let file_id = *tree
            .get(boot_id)
            .as_dir()
            .unwrap()
            .children
            .get("BOOTX64.EFI")
            .unwrap();
        assert_eq!(tree.get(file_id).as_file().unwrap().data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
