//! Unpacked image size resolution.
//!
//! An image's unpacked size is the usage of the snapshot keyed by the chain
//! ID of its root filesystem. Failures are not fatal: they are collected in
//! [`SizeErrors`] so a listing can still print every row and report once.

use anyhow::{Context, Result};
use log::debug;

use crate::identity::chain_id;
use crate::runtime::{Image, ImageStore, SnapshotService};

pub fn unpacked_image_size<C>(client: &C, snapshotter: &str, image: &Image) -> Result<i64>
where
    C: ImageStore + SnapshotService + ?Sized,
{
    let diff_ids = client.root_fs(image)?;
    let chain = chain_id(&diff_ids).with_context(|| format!("image {}", image.name))?;
    let usage = client.usage(snapshotter, &chain)?;
    Ok(usage.size)
}

/// Size resolution failures collected over one listing.
#[derive(Debug, Default)]
pub struct SizeErrors {
    failures: Vec<(String, anyhow::Error)>,
}

impl SizeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the size of `image`, recording a failure and returning 0 when
    /// it cannot be resolved.
    pub fn resolve<C>(&mut self, client: &C, snapshotter: &str, image: &Image) -> i64
    where
        C: ImageStore + SnapshotService + ?Sized,
    {
        match unpacked_image_size(client, snapshotter, image) {
            Ok(size) => size,
            Err(e) => {
                debug!("Failed to compute size of {}: {:#}", image.name, e);
                self.failures.push((image.name.clone(), e));
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Names of the images whose size could not be computed, in listing order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(name, _)| name.as_str())
    }

    /// The single warning to report for this listing, if anything failed.
    pub fn warning(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!(
            "failed to compute image(s) size: {}",
            self.images().collect::<Vec<_>>().join(", ")
        ))
    }
}
