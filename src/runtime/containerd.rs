//! containerd implementation of the runtime capabilities.
//!
//! [`ContainerdClient`] talks to the containerd gRPC API over its unix socket.
//! The client owns a current-thread tokio runtime and blocks on every call,
//! so callers stay synchronous. All calls share one channel and carry the
//! configured namespace; dropping the client closes the connection.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use containerd_client::services::v1::content_client::ContentClient;
use containerd_client::services::v1::images_client::ImagesClient;
use containerd_client::services::v1::snapshots::snapshots_client::SnapshotsClient;
use containerd_client::services::v1::snapshots::UsageRequest;
use containerd_client::services::v1::{ListImagesRequest, ReadContentRequest};
use log::{debug, trace};
use std::future::Future;
use tokio::runtime::Runtime;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;
use tonic::Request;

use super::content::resolve_root_fs;
use super::{Image, ImageStore, Platform, SnapshotService, Target, Usage};

const NAMESPACE_HEADER: &str = "containerd-namespace";

pub struct ContainerdClient {
    runtime: Runtime,
    channel: Channel,
    namespace: AsciiMetadataValue,
    platform: Platform,
}

impl ContainerdClient {
    /// Connects to the containerd socket at `address` (`unix://` prefix optional).
    pub fn connect(address: &str, namespace: &str) -> Result<Self> {
        let namespace_value = namespace
            .parse::<AsciiMetadataValue>()
            .with_context(|| format!("Invalid containerd namespace: {:?}", namespace))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create async runtime")?;

        let socket = address.strip_prefix("unix://").unwrap_or(address);
        debug!("Connecting to containerd at {} (namespace {})", socket, namespace);
        let channel = runtime
            .block_on(containerd_client::connect(socket))
            .with_context(|| format!("Failed to connect to containerd at {}", socket))?;

        Ok(Self {
            runtime,
            channel,
            namespace: namespace_value,
            platform: Platform::host(),
        })
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert(NAMESPACE_HEADER, self.namespace.clone());
        request
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn read_blob(&self, digest: &str) -> Result<Vec<u8>> {
        trace!("Reading blob {}", digest);
        let request = self.request(ReadContentRequest {
            digest: digest.to_string(),
            offset: 0,
            size: 0,
        });
        let mut client = ContentClient::new(self.channel.clone());

        self.block_on(async move {
            let mut stream = client.read(request).await?.into_inner();
            let mut data = Vec::new();
            while let Some(chunk) = stream.message().await? {
                data.extend_from_slice(&chunk.data);
            }
            Ok::<_, tonic::Status>(data)
        })
        .with_context(|| format!("Failed to read blob {}", digest))
    }
}

impl ImageStore for ContainerdClient {
    fn list(&self, filters: &[String]) -> Result<Vec<Image>> {
        debug!("Listing images with filters {:?}", filters);
        let request = self.request(ListImagesRequest {
            filters: filters.to_vec(),
        });
        let mut client = ImagesClient::new(self.channel.clone());
        let response = self
            .block_on(client.list(request))
            .context("Failed to list images")?;

        response
            .into_inner()
            .images
            .into_iter()
            .map(from_proto_image)
            .collect()
    }

    fn root_fs(&self, image: &Image) -> Result<Vec<String>> {
        resolve_root_fs(&image.target, &self.platform, |digest| self.read_blob(digest))
            .with_context(|| format!("Failed to read root filesystem of {}", image.name))
    }
}

impl SnapshotService for ContainerdClient {
    fn usage(&self, snapshotter: &str, key: &str) -> Result<Usage> {
        let request = self.request(UsageRequest {
            snapshotter: snapshotter.to_string(),
            key: key.to_string(),
        });
        let mut client = SnapshotsClient::new(self.channel.clone());
        let response = self
            .block_on(client.usage(request))
            .with_context(|| format!("Failed to get usage of snapshot {} ({})", key, snapshotter))?
            .into_inner();

        Ok(Usage {
            size: response.size,
            inodes: response.inodes,
        })
    }
}

fn from_proto_image(image: containerd_client::services::v1::Image) -> Result<Image> {
    let target = image
        .target
        .ok_or_else(|| anyhow!("image {} has no target descriptor", image.name))?;

    let created_at = image.created_at.and_then(|ts| {
        DateTime::<Utc>::from_timestamp(ts.seconds, u32::try_from(ts.nanos).unwrap_or(0))
    });

    Ok(Image {
        name: image.name,
        target: Target {
            media_type: target.media_type,
            digest: target.digest,
            size: target.size,
        },
        created_at,
    })
}
