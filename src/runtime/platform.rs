use oci_spec::image::Descriptor;
use std::fmt;

/// Operating system and CPU architecture in OCI spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

impl Platform {
    pub fn new(os: &str, architecture: &str) -> Self {
        Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
        }
    }

    /// The platform this binary was built for.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let architecture = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "powerpc64" => "ppc64le",
            "loongarch64" => "loong64",
            other => other,
        };
        Self::new(os, architecture)
    }

    /// Index entries without a platform match every platform.
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        match descriptor.platform() {
            Some(platform) => {
                platform.os().to_string() == self.os
                    && platform.architecture().to_string() == self.architecture
            }
            None => true,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(os: &str, arch: &str) -> Descriptor {
        serde_json::from_value(serde_json::json!({
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:4c8d7d248fb9a13ed4b0e1b5e4b6ee4f0b5c2b5bbbcd1e1a0c3e0ad5d9f3f5a1",
            "size": 100,
            "platform": { "os": os, "architecture": arch }
        }))
        .unwrap()
    }

    #[test]
    fn test_platform_matches_descriptor() {
        let linux_amd64 = Platform::new("linux", "amd64");
        assert!(linux_amd64.matches(&descriptor("linux", "amd64")));
        assert!(!linux_amd64.matches(&descriptor("linux", "arm64")));
        assert!(!linux_amd64.matches(&descriptor("windows", "amd64")));
    }

    #[test]
    fn test_descriptor_without_platform_matches() {
        let descriptor: Descriptor = serde_json::from_value(serde_json::json!({
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:4c8d7d248fb9a13ed4b0e1b5e4b6ee4f0b5c2b5bbbcd1e1a0c3e0ad5d9f3f5a1",
            "size": 100
        }))
        .unwrap();
        assert!(Platform::new("linux", "s390x").matches(&descriptor));
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::new("linux", "arm64").to_string(), "linux/arm64");
    }
}
