//! Walks image content from a target descriptor down to its root filesystem.
//!
//! A target is either a manifest or an index (OCI index / docker manifest
//! list). Indexes are resolved to the first manifest for the wanted
//! [`Platform`], the manifest's config blob carries `rootfs.diff_ids`.

use anyhow::{anyhow, bail, Context, Result};
use log::trace;
use oci_spec::image::{ImageConfiguration, ImageIndex, ImageManifest};

use super::{Platform, Target};

pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

const MAX_INDEX_DEPTH: usize = 4;

/// Resolves `target` to the diff IDs of its root filesystem, reading blobs
/// by digest through `read_blob`.
pub fn resolve_root_fs<F>(target: &Target, platform: &Platform, read_blob: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    let manifest = resolve_manifest(target, platform, &read_blob)?;
    let config_digest = manifest.config().digest().to_string();
    let blob = read_blob(&config_digest)?;
    let config = ImageConfiguration::from_reader(blob.as_slice())
        .with_context(|| format!("Failed to parse image config {}", config_digest))?;
    Ok(config.rootfs().diff_ids().clone())
}

fn resolve_manifest<F>(target: &Target, platform: &Platform, read_blob: &F) -> Result<ImageManifest>
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    let mut media_type = target.media_type.clone();
    let mut digest = target.digest.clone();

    for _ in 0..MAX_INDEX_DEPTH {
        trace!("Resolving {} ({})", digest, media_type);
        let blob = read_blob(&digest)?;
        match media_type.as_str() {
            OCI_INDEX | DOCKER_MANIFEST_LIST => {
                let index = ImageIndex::from_reader(blob.as_slice())
                    .with_context(|| format!("Failed to parse image index {}", digest))?;
                let descriptor = index
                    .manifests()
                    .iter()
                    .find(|descriptor| platform.matches(descriptor))
                    .ok_or_else(|| {
                        anyhow!("no manifest for platform {} in index {}", platform, digest)
                    })?;
                media_type = descriptor.media_type().to_string();
                digest = descriptor.digest().to_string();
            }
            OCI_MANIFEST | DOCKER_MANIFEST => {
                return ImageManifest::from_reader(blob.as_slice())
                    .with_context(|| format!("Failed to parse image manifest {}", digest));
            }
            other => bail!("unsupported media type {} for {}", other, digest),
        }
    }

    bail!("image index nesting deeper than {} levels", MAX_INDEX_DEPTH)
}
