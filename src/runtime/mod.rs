pub mod containerd;
pub mod content;
pub mod platform;

use anyhow::Result;
use chrono::{DateTime, Utc};

pub use containerd::ContainerdClient;
pub use platform::Platform;

/// Descriptor of the content an image name points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub media_type: String,
    pub digest: String,
    pub size: i64,
}

/// An image record as kept by the runtime's image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub target: Target,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub size: i64,
    pub inodes: i64,
}

/// Image metadata capability of a container runtime.
pub trait ImageStore {
    /// Lists images matching any of `filters`, in store order. An empty
    /// filter list matches every image.
    fn list(&self, filters: &[String]) -> Result<Vec<Image>>;

    /// Returns the uncompressed layer digests (diff IDs) of `image`'s root
    /// filesystem, bottom layer first.
    fn root_fs(&self, image: &Image) -> Result<Vec<String>>;
}

/// Snapshot accounting capability of a container runtime.
pub trait SnapshotService {
    fn usage(&self, snapshotter: &str, key: &str) -> Result<Usage>;
}

impl<T: ImageStore + ?Sized> ImageStore for &T {
    fn list(&self, filters: &[String]) -> Result<Vec<Image>> {
        (**self).list(filters)
    }

    fn root_fs(&self, image: &Image) -> Result<Vec<String>> {
        (**self).root_fs(image)
    }
}

impl<T: SnapshotService + ?Sized> SnapshotService for &T {
    fn usage(&self, snapshotter: &str, key: &str) -> Result<Usage> {
        (**self).usage(snapshotter, key)
    }
}
