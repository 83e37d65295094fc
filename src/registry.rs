//! Resource registry
//!
//! Tracks every heap block and open file handle the interpreter creates so that
//! shutdown can release each of them exactly once. Resources are identified by
//! their own identity (the block's heap address, the file's descriptor), never
//! by a generated id. The registry owns a resource from the moment it is
//! tracked until it is released; callers only ever borrow it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Which list a resource lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Memory,
    File,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Memory => "memory",
            ResourceKind::File => "file",
        }
    }
}

/// Identity of a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    kind: ResourceKind,
    identity: usize,
}

impl Handle {
    pub fn new(kind: ResourceKind, identity: usize) -> Self {
        Self { kind, identity }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn identity(&self) -> usize {
        self.identity
    }
}

/// The handle was not tracked by the list it was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound(pub Handle);

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} resource {:#x} is not tracked",
            self.0.kind.as_str(),
            self.0.identity
        )
    }
}

impl std::error::Error for NotFound {}

/// Something the registry can track and later release
pub trait Release {
    /// Identity of this resource; must stay stable while it is tracked
    fn handle(&self) -> Handle;

    /// Give the resource back to the system (free, flush and close)
    fn release(self) -> io::Result<()>;
}

/// Outcome of a release-all pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub released: usize,
    pub failed: usize,
}

impl ReleaseReport {
    /// True when no release action reported a failure
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Unordered list of tracked resources of one kind
#[derive(Debug)]
pub struct ResourceList<T> {
    entries: Vec<T>,
}

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Release> ResourceList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.position(handle).is_some()
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.iter().map(Release::handle)
    }

    fn position(&self, handle: Handle) -> Option<usize> {
        self.entries.iter().position(|entry| entry.handle() == handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.iter().find(|entry| entry.handle() == handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries.iter_mut().find(|entry| entry.handle() == handle)
    }

    /// Take ownership of `resource` and return its handle
    pub fn track(&mut self, resource: T) -> Handle {
        let handle = resource.handle();
        self.entries.push(resource);
        handle
    }

    /// Remove the first resource matching `handle` and release it.
    ///
    /// Order of the remaining entries may change; membership does not.
    pub fn untrack(&mut self, handle: Handle) -> Result<(), NotFound> {
        let index = self.position(handle).ok_or(NotFound(handle))?;
        let resource = self.entries.swap_remove(index);
        if let Err(e) = resource.release() {
            warn!(kind = handle.kind.as_str(), error = %e, "release on untrack failed");
        }
        Ok(())
    }

    /// Put `new` in the slot held by `old`, releasing `old`.
    ///
    /// On a miss the list is untouched and `new` is handed back.
    pub fn replace(&mut self, old: Handle, new: T) -> Result<Handle, T> {
        let Some(index) = self.position(old) else {
            return Err(new);
        };
        let handle = new.handle();
        let previous = std::mem::replace(&mut self.entries[index], new);
        if let Err(e) = previous.release() {
            warn!(kind = old.kind.as_str(), error = %e, "release on replace failed");
        }
        Ok(handle)
    }

    /// Release every tracked resource and leave the list empty.
    ///
    /// A second call finds nothing to release.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        for resource in self.entries.drain(..) {
            let handle = resource.handle();
            match resource.release() {
                Ok(()) => report.released += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        kind = handle.kind.as_str(),
                        identity = handle.identity,
                        error = %e,
                        "failed to release resource"
                    );
                }
            }
        }
        report
    }
}

/// A tracked heap block
#[derive(Debug)]
pub struct Block {
    bytes: Box<[u8]>,
}

impl Block {
    /// Zeroed block of `len` bytes. Empty requests get one byte so every
    /// block has a distinct address.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len.max(1)].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Release for Block {
    fn handle(&self) -> Handle {
        Handle::new(ResourceKind::Memory, self.bytes.as_ptr() as usize)
    }

    fn release(self) -> io::Result<()> {
        drop(self.bytes);
        Ok(())
    }
}

/// A tracked file opened for appending
#[derive(Debug)]
pub struct TrackedFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TrackedFile {
    /// Open an existing file in append mode. The file is never created.
    pub fn open_append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for TrackedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Release for TrackedFile {
    fn handle(&self) -> Handle {
        Handle::new(ResourceKind::File, self.writer.get_ref().as_raw_fd() as usize)
    }

    fn release(self) -> io::Result<()> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        drop(file);
        Ok(())
    }
}

/// A resource of either kind, for the kind-agnostic entry points
#[derive(Debug)]
pub enum Resource {
    Memory(Block),
    File(TrackedFile),
}

/// Owner of both resource lists
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    memory: ResourceList<Block>,
    files: ResourceList<TrackedFile>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource to the list for its kind
    pub fn track(&mut self, resource: Resource) -> Handle {
        let handle = match resource {
            Resource::Memory(block) => self.memory.track(block),
            Resource::File(file) => self.files.track(file),
        };
        debug!(kind = handle.kind.as_str(), identity = handle.identity, "tracked");
        handle
    }

    /// Allocate a zeroed block and track it
    pub fn allocate(&mut self, len: usize) -> Handle {
        self.track(Resource::Memory(Block::zeroed(len)))
    }

    /// Open `path` for appending and track the handle
    pub fn open_append(&mut self, path: &Path) -> io::Result<Handle> {
        let file = TrackedFile::open_append(path)?;
        Ok(self.track(Resource::File(file)))
    }

    /// Remove and release the resource behind `handle`
    pub fn untrack(&mut self, handle: Handle) -> Result<(), NotFound> {
        match handle.kind {
            ResourceKind::Memory => self.memory.untrack(handle),
            ResourceKind::File => self.files.untrack(handle),
        }
    }

    /// Swap the resource behind `old` for `new` in place.
    ///
    /// Fails, handing `new` back, when `old` is not tracked or the kinds differ.
    pub fn replace(&mut self, old: Handle, new: Resource) -> Result<Handle, Resource> {
        match (old.kind, new) {
            (ResourceKind::Memory, Resource::Memory(block)) => {
                self.memory.replace(old, block).map_err(Resource::Memory)
            }
            (ResourceKind::File, Resource::File(file)) => {
                self.files.replace(old, file).map_err(Resource::File)
            }
            (_, new) => Err(new),
        }
    }

    /// Grow or shrink a tracked block, keeping its leading contents.
    ///
    /// The block moves, so the returned handle replaces `handle`.
    pub fn resize(&mut self, handle: Handle, len: usize) -> Result<Handle, NotFound> {
        let old = self.memory.get(handle).ok_or(NotFound(handle))?;
        let mut block = Block::zeroed(len);
        let keep = old.len().min(block.len());
        block.as_mut_slice()[..keep].copy_from_slice(&old.as_slice()[..keep]);
        self.memory
            .replace(handle, block)
            .map_err(|_| NotFound(handle))
    }

    pub fn block(&self, handle: Handle) -> Result<&Block, NotFound> {
        self.memory.get(handle).ok_or(NotFound(handle))
    }

    pub fn block_mut(&mut self, handle: Handle) -> Result<&mut Block, NotFound> {
        self.memory.get_mut(handle).ok_or(NotFound(handle))
    }

    pub fn file(&self, handle: Handle) -> Result<&TrackedFile, NotFound> {
        self.files.get(handle).ok_or(NotFound(handle))
    }

    pub fn file_mut(&mut self, handle: Handle) -> Result<&mut TrackedFile, NotFound> {
        self.files.get_mut(handle).ok_or(NotFound(handle))
    }

    /// Append the first `len` bytes of a tracked block to a tracked file
    pub fn append_block(&mut self, block: Handle, len: usize, file: Handle) -> io::Result<()> {
        let bytes = self
            .memory
            .get(block)
            .ok_or_else(|| io::Error::other(NotFound(block)))?;
        let file = self
            .files
            .get_mut(file)
            .ok_or_else(|| io::Error::other(NotFound(file)))?;
        file.write_all(&bytes.as_slice()[..len])
    }

    /// Number of resources currently tracked for `kind`
    pub fn tracked(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Memory => self.memory.len(),
            ResourceKind::File => self.files.len(),
        }
    }

    /// Release every resource of `kind`. Safe to call repeatedly.
    pub fn release_all(&mut self, kind: ResourceKind) -> ReleaseReport {
        let report = match kind {
            ResourceKind::Memory => self.memory.release_all(),
            ResourceKind::File => self.files.release_all(),
        };
        debug!(
            kind = kind.as_str(),
            released = report.released,
            failed = report.failed,
            "release_all"
        );
        report
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.release_all(ResourceKind::File);
        self.release_all(ResourceKind::Memory);
    }
}
