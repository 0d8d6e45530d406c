//! In-memory [`VirtualFs`] implementation.
//!
//! Entries live in one flat `path -> node` map guarded by a lock. The
//! mtime clock is virtual: a counter bumped on every mutation, which keeps
//! `-nt`/`-ot` comparisons deterministic across replays.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::path::{file_name, join, normalize, parent};
use super::{FileKind, Metadata, VfsError, VirtualFs};

const SYMLINK_HOP_LIMIT: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mode: u32, mtime: u64 },
    Dir { mode: u32, mtime: u64 },
    Symlink { target: String, mtime: u64 },
}

impl Node {
    fn metadata(&self) -> Metadata {
        match self {
            Node::File { data, mode, mtime } => Metadata {
                kind: FileKind::File,
                mode: *mode,
                size: data.len() as u64,
                mtime: *mtime,
            },
            Node::Dir { mode, mtime } => Metadata {
                kind: FileKind::Dir,
                mode: *mode,
                size: 0,
                mtime: *mtime,
            },
            Node::Symlink { target, mtime } => Metadata {
                kind: FileKind::Symlink,
                mode: 0o777,
                size: target.len() as u64,
                mtime: *mtime,
            },
        }
    }
}

pub struct MemFs {
    nodes: RwLock<HashMap<String, Node>>,
    clock: AtomicU64,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::Dir { mode: 0o755, mtime: 0 });
        Self { nodes: RwLock::new(nodes), clock: AtomicU64::new(1) }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Seed a file at construction time, creating parents.
    pub fn seed_file(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        seed_parents(&mut nodes, &path, now);
        nodes.insert(path, Node::File { data: data.to_vec(), mode: 0o644, mtime: now });
    }

    /// Seed a directory at construction time, creating parents.
    pub fn seed_dir(&self, path: &str) {
        let path = normalize(path);
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        seed_parents(&mut nodes, &path, now);
        nodes.entry(path).or_insert(Node::Dir { mode: 0o755, mtime: now });
    }

    /// Follow symlinks in every component of `path`.
    fn resolve(&self, nodes: &HashMap<String, Node>, path: &str) -> Result<String, VfsError> {
        let mut hops = 0usize;
        let mut resolved = "/".to_string();
        let components: Vec<String> =
            path.split('/').filter(|c| !c.is_empty()).map(str::to_string).collect();
        let mut queue: Vec<String> = components.into_iter().rev().collect();

        while let Some(comp) = queue.pop() {
            match comp.as_str() {
                "." => continue,
                ".." => {
                    resolved = parent(&resolved);
                    continue;
                }
                _ => {}
            }
            let candidate = join(&resolved, &comp);
            match nodes.get(&candidate) {
                Some(Node::Symlink { target, .. }) => {
                    hops += 1;
                    if hops > SYMLINK_HOP_LIMIT {
                        return Err(VfsError::SymlinkLoop(path.to_string()));
                    }
                    if target.starts_with('/') {
                        resolved = "/".to_string();
                    }
                    for piece in target.split('/').filter(|c| !c.is_empty()).rev() {
                        queue.push(piece.to_string());
                    }
                }
                _ => resolved = candidate,
            }
        }
        Ok(resolved)
    }

    /// Resolve all but the last component; the final name is left as-is so
    /// link-aware operations can address the link itself.
    fn resolve_parent(
        &self,
        nodes: &HashMap<String, Node>,
        path: &str,
    ) -> Result<String, VfsError> {
        let dir = self.resolve(nodes, &parent(path))?;
        Ok(join(&dir, file_name(path)))
    }
}

fn seed_parents(nodes: &mut HashMap<String, Node>, path: &str, now: u64) {
    let mut dir = parent(path);
    let mut missing = Vec::new();
    while dir != "/" && !nodes.contains_key(&dir) {
        missing.push(dir.clone());
        dir = parent(&dir);
    }
    for d in missing.into_iter().rev() {
        nodes.insert(d, Node::Dir { mode: 0o755, mtime: now });
    }
}

fn has_children(nodes: &HashMap<String, Node>, dir: &str) -> bool {
    let prefix = if dir == "/" { "/".to_string() } else { format!("{dir}/") };
    nodes.keys().any(|k| k != dir && k.starts_with(&prefix))
}

#[async_trait]
impl VirtualFs for MemFs {
    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        match nodes.get(&real) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(VfsError::IsDirectory(path.to_string())),
            _ => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn write(&self, path: &str, data: &[u8], mode: Option<u32>) -> Result<(), VfsError> {
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        match nodes.get(&parent(&real)) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotDirectory(parent(&real))),
            None => return Err(VfsError::NotFound(parent(&real))),
        }
        let mode = match nodes.get(&real) {
            Some(Node::Dir { .. }) => return Err(VfsError::IsDirectory(path.to_string())),
            Some(Node::File { mode: old, .. }) => mode.unwrap_or(*old),
            _ => mode.unwrap_or(0o644),
        };
        nodes.insert(real, Node::File { data: data.to_vec(), mode, mtime: now });
        Ok(())
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        match nodes.get_mut(&real) {
            Some(Node::File { data: existing, mtime, .. }) => {
                existing.extend_from_slice(data);
                *mtime = now;
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(VfsError::IsDirectory(path.to_string())),
            Some(Node::Symlink { .. }) => Err(VfsError::NotFound(path.to_string())),
            None => {
                match nodes.get(&parent(&real)) {
                    Some(Node::Dir { .. }) => {}
                    Some(_) => return Err(VfsError::NotDirectory(parent(&real))),
                    None => return Err(VfsError::NotFound(parent(&real))),
                }
                nodes.insert(real, Node::File { data: data.to_vec(), mode: 0o644, mtime: now });
                Ok(())
            }
        }
    }

    async fn stat(&self, path: &str) -> Result<Metadata, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        nodes
            .get(&real)
            .map(Node::metadata)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    async fn lstat(&self, path: &str) -> Result<Metadata, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(path))?;
        nodes
            .get(&real)
            .map(Node::metadata)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        match nodes.get(&real) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotDirectory(path.to_string())),
            None => return Err(VfsError::NotFound(path.to_string())),
        }
        let prefix = if real == "/" { "/".to_string() } else { format!("{real}/") };
        let mut names: Vec<String> = nodes
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn mkdir(&self, path: &str, mode: u32, recursive: bool) -> Result<(), VfsError> {
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(path))?;
        if nodes.contains_key(&real) {
            if recursive && matches!(nodes.get(&real), Some(Node::Dir { .. })) {
                return Ok(());
            }
            return Err(VfsError::Exists(path.to_string()));
        }
        match nodes.get(&parent(&real)) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotDirectory(parent(&real))),
            None if recursive => seed_parents(&mut nodes, &real, now),
            None => return Err(VfsError::NotFound(parent(&real))),
        }
        nodes.insert(real, Node::Dir { mode, mtime: now });
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(path))?;
        if real == "/" {
            return Err(VfsError::Denied("/".to_string()));
        }
        match nodes.get(&real) {
            Some(Node::Dir { .. }) => {
                if has_children(&nodes, &real) {
                    return Err(VfsError::NotEmpty(path.to_string()));
                }
                nodes.remove(&real);
                Ok(())
            }
            Some(_) => Err(VfsError::NotDirectory(path.to_string())),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn unlink(&self, path: &str) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(path))?;
        match nodes.get(&real) {
            Some(Node::Dir { .. }) => Err(VfsError::IsDirectory(path.to_string())),
            Some(_) => {
                nodes.remove(&real);
                Ok(())
            }
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError> {
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        let src = self.resolve_parent(&nodes, &normalize(src))?;
        let dst = self.resolve_parent(&nodes, &normalize(dst))?;
        if !nodes.contains_key(&src) {
            return Err(VfsError::NotFound(src));
        }
        if src == dst {
            return Ok(());
        }
        // Moving a directory carries its whole subtree.
        let prefix = format!("{src}/");
        let moved: Vec<String> =
            nodes.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();
        for old in moved {
            let new = format!("{dst}{}", &old[src.len()..]);
            if let Some(node) = nodes.remove(&old) {
                nodes.insert(new, node);
            }
        }
        if let Some(mut node) = nodes.remove(&src) {
            match &mut node {
                Node::File { mtime, .. } | Node::Dir { mtime, .. } | Node::Symlink { mtime, .. } => {
                    *mtime = now
                }
            }
            nodes.insert(dst, node);
        }
        Ok(())
    }

    async fn chmod(&self, path: &str, new_mode: u32) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve(&nodes, &normalize(path))?;
        match nodes.get_mut(&real) {
            Some(Node::File { mode, .. }) | Some(Node::Dir { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            Some(Node::Symlink { .. }) => Ok(()),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError> {
        let now = self.tick();
        let mut nodes = self.nodes.write().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(link))?;
        if nodes.contains_key(&real) {
            return Err(VfsError::Exists(link.to_string()));
        }
        match nodes.get(&parent(&real)) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(VfsError::NotDirectory(parent(&real))),
            None => return Err(VfsError::NotFound(parent(&real))),
        }
        nodes.insert(real, Node::Symlink { target: target.to_string(), mtime: now });
        Ok(())
    }

    async fn readlink(&self, path: &str) -> Result<String, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        let real = self.resolve_parent(&nodes, &normalize(path))?;
        match nodes.get(&real) {
            Some(Node::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(VfsError::Invalid(path.to_string())),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    async fn canonicalize(&self, path: &str) -> Result<String, VfsError> {
        let nodes = self.nodes.read().expect("vfs lock");
        self.resolve(&nodes, &normalize(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_roundtrip() {
        let fs = MemFs::new();
        fs.seed_dir("/tmp");
        fs.write("/tmp/a.txt", b"hello", None).await.unwrap();
        assert_eq!(fs.read("/tmp/a.txt").await.unwrap(), b"hello");
        let meta = fs.stat("/tmp/a.txt").await.unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.size, 5);
    }

    #[tokio::test]
    async fn append_creates_when_missing() {
        let fs = MemFs::new();
        fs.append("/log", b"a").await.unwrap();
        fs.append("/log", b"b").await.unwrap();
        assert_eq!(fs.read("/log").await.unwrap(), b"ab");
    }

    #[tokio::test]
    async fn missing_parent_is_an_error() {
        let fs = MemFs::new();
        let err = fs.write("/no/such/file", b"x", None).await.unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[tokio::test]
    async fn readdir_lists_direct_children() {
        let fs = MemFs::new();
        fs.seed_file("/d/one", b"1");
        fs.seed_file("/d/two", b"2");
        fs.seed_file("/d/sub/three", b"3");
        assert_eq!(fs.readdir("/d").await.unwrap(), vec!["one", "sub", "two"]);
    }

    #[tokio::test]
    async fn rmdir_refuses_non_empty() {
        let fs = MemFs::new();
        fs.seed_file("/d/one", b"1");
        assert!(matches!(fs.rmdir("/d").await, Err(VfsError::NotEmpty(_))));
        fs.unlink("/d/one").await.unwrap();
        fs.rmdir("/d").await.unwrap();
        assert!(matches!(fs.stat("/d").await, Err(VfsError::NotFound(_))));
    }

    #[tokio::test]
    async fn symlinks_resolve_and_loop_protection_trips() {
        let fs = MemFs::new();
        fs.seed_file("/data/real.txt", b"content");
        fs.symlink("/data/real.txt", "/link").await.unwrap();
        assert_eq!(fs.read("/link").await.unwrap(), b"content");
        assert_eq!(fs.readlink("/link").await.unwrap(), "/data/real.txt");
        assert!(fs.lstat("/link").await.unwrap().is_symlink());
        assert!(fs.stat("/link").await.unwrap().is_file());

        fs.symlink("/b", "/a").await.unwrap();
        fs.symlink("/a", "/b").await.unwrap();
        assert!(matches!(fs.read("/a").await, Err(VfsError::SymlinkLoop(_))));
    }

    #[tokio::test]
    async fn rename_moves_subtrees() {
        let fs = MemFs::new();
        fs.seed_file("/old/a/b", b"x");
        fs.rename("/old", "/new").await.unwrap();
        assert_eq!(fs.read("/new/a/b").await.unwrap(), b"x");
        assert!(matches!(fs.stat("/old").await, Err(VfsError::NotFound(_))));
    }
}
