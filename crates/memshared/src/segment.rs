//! Named fixed-capacity shared-memory segments
//!
//! A segment is a file of exactly `capacity` bytes under `/dev/shm` (or the
//! configured directory), mapped writable into each attached process. The
//! file name is derived from the sync identity, so any process that knows the
//! name reaches the same bytes.
//!
//! The process that brings the file into existence is the *creator* and owns
//! eventual teardown; every other process is an *attacher* and must never
//! destroy the segment. Creation uses `O_EXCL`, so two processes racing to
//! create the same name resolve atomically: exactly one wins, the loser
//! attaches. The residual window is an attacher observing the file before the
//! creator has sized and initialized it, which surfaces as
//! [`ShareError::Uninitialized`].

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, warn};

use crate::error::{Result, ShareError};

const FILE_PREFIX: &str = "memshared-";

/// A named shared-memory segment mapped into this process.
pub struct Segment {
    name: String,
    path: PathBuf,
    capacity: usize,
    map: MmapMut,
    created: bool,
}

impl Segment {
    /// Attach to the segment called `name`, creating it when absent.
    ///
    /// On creation the segment gets exactly `capacity` bytes and `initial` is
    /// written at offset 0 before the call returns. On attach the existing
    /// capacity is adopted and `initial` is ignored.
    pub fn acquire(
        name: &str,
        capacity: usize,
        dir: Option<&Path>,
        initial: &[u8],
    ) -> Result<Self> {
        let path = segment_path(name, dir);

        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => Self::attach(name, path, capacity, file),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(&path)
                {
                    Ok(file) => Self::create(name, path, capacity, file, initial),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        // Lost the creation race; the winner owns teardown.
                        debug!("lost creation race for segment {name:?}, attaching");
                        let file = OpenOptions::new().read(true).write(true).open(&path)?;
                        Self::attach(name, path, capacity, file)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create(
        name: &str,
        path: PathBuf,
        capacity: usize,
        file: fs::File,
        initial: &[u8],
    ) -> Result<Self> {
        if initial.len() > capacity {
            return Err(ShareError::CapacityExceeded {
                needed: initial.len(),
                capacity,
            });
        }

        file.set_len(capacity as u64)?;
        let mut map = unsafe { MmapMut::map_mut(&file)? };
        map[..initial.len()].copy_from_slice(initial);
        debug!(
            "created segment {name:?} at {path:?} ({capacity} bytes, {} byte snapshot)",
            initial.len()
        );

        Ok(Self {
            name: name.to_string(),
            path,
            capacity,
            map,
            created: true,
        })
    }

    fn attach(name: &str, path: PathBuf, requested: usize, file: fs::File) -> Result<Self> {
        let capacity = file.metadata()?.len() as usize;
        if capacity == 0 {
            // The creator exists but has not sized the file yet.
            return Err(ShareError::Uninitialized {
                name: name.to_string(),
            });
        }
        if capacity != requested {
            warn!(
                "segment {name:?} already exists with capacity {capacity}, \
                 ignoring requested capacity {requested}"
            );
        }

        let map = unsafe { MmapMut::map_mut(&file)? };
        debug!("attached to segment {name:?} at {path:?} ({capacity} bytes)");

        Ok(Self {
            name: name.to_string(),
            path,
            capacity,
            map,
            created: false,
        })
    }

    /// The raw segment bytes, stale tail included.
    pub fn bytes(&self) -> &[u8] {
        &self.map[..]
    }

    /// Replace the snapshot at offset 0.
    ///
    /// Bytes past `snapshot.len()` keep whatever an earlier write left there;
    /// the snapshot format is self-terminating, so decoders never read them.
    pub fn write(&mut self, snapshot: &[u8]) -> Result<()> {
        if snapshot.len() > self.capacity {
            return Err(ShareError::CapacityExceeded {
                needed: snapshot.len(),
                capacity: self.capacity,
            });
        }
        self.map[..snapshot.len()].copy_from_slice(snapshot);
        Ok(())
    }

    /// Whether this process created the segment and owns teardown.
    pub fn is_creator(&self) -> bool {
        self.created
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Release the local mapping without affecting other attachers.
    pub fn close(self) {
        debug!("closing segment {:?}", self.name);
        // Dropping the mapping unmaps; the backing file stays.
    }

    /// Physically remove the segment. Creator only, and only once.
    ///
    /// Processes still attached keep valid mappings (unlink semantics), but
    /// the name is gone: a later acquire creates a brand-new segment. Waiting
    /// for attachers to release first is the caller's responsibility.
    pub fn destroy(self) -> Result<()> {
        if !self.created {
            return Err(ShareError::NotCreator { name: self.name });
        }
        let path = self.path.clone();
        let name = self.name.clone();
        drop(self);
        fs::remove_file(&path)?;
        debug!("destroyed segment {name:?} at {path:?}");
        Ok(())
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("created", &self.created)
            .finish()
    }
}

fn segment_path(name: &str, dir: Option<&Path>) -> PathBuf {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => default_dir(),
    };
    dir.join(format!("{FILE_PREFIX}{name}"))
}

fn default_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}
