//! Docker-style image references.
//!
//! Parses `[domain/]path[:tag][@digest]` strings into a [`Reference`] and
//! normalizes them the way the docker CLI and containerd do:
//! - a missing domain means `docker.io`,
//! - single-segment `docker.io` repositories live under `library/`,
//! - a reference with neither tag nor digest is tagged `latest`.
//!
//! [`Reference::familiar_name`] goes the other way and strips what
//! normalization added, which is what users expect to see in listings.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fmt;
use thiserror::Error;

const DEFAULT_DOMAIN: &str = "docker.io";
const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";
const DEFAULT_TAG: &str = "latest";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

lazy_static! {
    static ref PATH_COMPONENT: Regex =
        Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|[-]+)[a-z0-9]+)*$").unwrap();
    static ref DOMAIN: Regex = Regex::new(
        r"^(?:(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*|\[[a-fA-F0-9:]+\])(?::[0-9]+)?$",
    )
    .unwrap();
    static ref TAG: Regex = Regex::new(r"^[\w][\w.-]{0,127}$").unwrap();
    static ref DIGEST: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}$")
            .unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-f0-9]{64}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("invalid reference format: {0:?}")]
    InvalidFormat(String),
    #[error("invalid reference format: repository name must be lowercase")]
    NameNotLowercase,
    #[error("repository name must not be more than 255 characters")]
    NameTooLong,
    #[error("invalid digest format: {0:?}")]
    InvalidDigest(String),
    #[error("invalid repository name ({0}), cannot specify 64-byte hexadecimal strings")]
    Identifier(String),
}

/// A fully qualified image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    /// Parses and normalizes `reference` without adding a default tag.
    pub fn parse_normalized(reference: &str) -> Result<Self, ReferenceError> {
        if IDENTIFIER.is_match(reference) {
            return Err(ReferenceError::Identifier(reference.to_string()));
        }

        let (remainder, digest) = match reference.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest)?;
                (name, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // The tag separator is the last ':' after the last '/', anything
        // earlier belongs to a registry port.
        let last_slash = remainder.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match remainder[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&remainder[..split], Some(&remainder[split + 1..]))
            }
            None => (remainder, None),
        };

        if let Some(tag) = tag {
            if !TAG.is_match(tag) {
                return Err(ReferenceError::InvalidFormat(reference.to_string()));
            }
        }

        let (domain, path) = split_docker_domain(name);
        validate_domain(&domain, reference)?;
        validate_path(&path, reference)?;

        if domain.len() + 1 + path.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ReferenceError::NameTooLong);
        }

        Ok(Self {
            domain,
            path,
            tag: tag.map(str::to_string),
            digest,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// `domain/path` without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    /// The short name a user would type, e.g. `alpine` for
    /// `docker.io/library/alpine`.
    pub fn familiar_name(&self) -> String {
        if self.domain != DEFAULT_DOMAIN {
            return self.name();
        }
        match self.path.strip_prefix(OFFICIAL_REPO_PREFIX) {
            Some(short) if !short.contains('/') => short.to_string(),
            _ => self.path.clone(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Capability to turn user input and stored image names into references.
pub trait ReferenceParser {
    /// Parses `reference` into its canonical form: `latest` is added when
    /// neither tag nor digest is given, and a tag is dropped when a digest
    /// pins the reference.
    fn parse_docker_ref(&self, reference: &str) -> Result<Reference, ReferenceError>;

    /// Splits a stored image name into its familiar repository and tag.
    /// Unparsable names yield two empty strings.
    fn parse_repo_tag(&self, image_name: &str) -> (String, String) {
        match self.parse_docker_ref(image_name) {
            Ok(reference) => (
                reference.familiar_name(),
                reference.tag().unwrap_or_default().to_string(),
            ),
            Err(e) => {
                debug!("unparsable image name {:?}: {}", image_name, e);
                (String::new(), String::new())
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DockerReferenceParser;

impl ReferenceParser for DockerReferenceParser {
    fn parse_docker_ref(&self, reference: &str) -> Result<Reference, ReferenceError> {
        let mut parsed = Reference::parse_normalized(reference)?;
        match (parsed.tag.is_some(), parsed.digest.is_some()) {
            (true, true) => parsed.tag = None,
            (false, false) => parsed.tag = Some(DEFAULT_TAG.to_string()),
            _ => {}
        }
        Ok(parsed)
    }
}

fn split_docker_domain(name: &str) -> (String, String) {
    let (mut domain, mut path) = match name.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == "localhost"
                || first.to_lowercase() != first =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (DEFAULT_DOMAIN.to_string(), name.to_string()),
    };

    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !path.contains('/') {
        path = format!("{}{}", OFFICIAL_REPO_PREFIX, path);
    }
    (domain, path)
}

fn validate_domain(domain: &str, reference: &str) -> Result<(), ReferenceError> {
    if DOMAIN.is_match(domain) {
        Ok(())
    } else {
        Err(ReferenceError::InvalidFormat(reference.to_string()))
    }
}

fn validate_path(path: &str, reference: &str) -> Result<(), ReferenceError> {
    for component in path.split('/') {
        if PATH_COMPONENT.is_match(component) {
            continue;
        }
        if PATH_COMPONENT.is_match(&component.to_lowercase()) {
            return Err(ReferenceError::NameNotLowercase);
        }
        return Err(ReferenceError::InvalidFormat(reference.to_string()));
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), ReferenceError> {
    if !DIGEST.is_match(digest) {
        return Err(ReferenceError::InvalidDigest(digest.to_string()));
    }
    let (algorithm, hex) = digest.split_once(':').unwrap_or_default();
    let expected = match algorithm {
        "sha256" => Some(64),
        "sha384" => Some(96),
        "sha512" => Some(128),
        _ => None,
    };
    match expected {
        Some(len) if hex.len() != len || !is_lower_hex(hex) => {
            Err(ReferenceError::InvalidDigest(digest.to_string()))
        }
        _ => Ok(()),
    }
}

fn is_lower_hex(hex: &str) -> bool {
    hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
