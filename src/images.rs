//! The `images` command: list stored images as a table.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{debug, warn};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

use crate::human::{human_size, time_since};
use crate::identity::display_digest;
use crate::reference::ReferenceParser;
use crate::runtime::{Image, ImageStore, SnapshotService};
use crate::size::SizeErrors;
use crate::table::TabWriter;

const MIN_CELL_WIDTH: usize = 4;
const CELL_PADDING: usize = 4;

#[derive(Debug, Error)]
pub enum ImagesError {
    #[error("cannot have more than one argument")]
    InvalidArgument,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone)]
pub struct ImagesOptions {
    pub quiet: bool,
    pub no_trunc: bool,
    pub format: Format,
    pub snapshotter: String,
}

/// One listing row, as rendered in table and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "ID")]
    pub image_id: String,
    #[serde(rename = "CreatedSince")]
    pub created_since: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
    #[serde(rename = "Size")]
    pub size: String,
}

/// Validates the positional arguments and turns them into store filters.
///
/// At most one image reference is accepted. It is normalized before use,
/// so `alpine` selects `docker.io/library/alpine:latest`.
pub fn image_filters(args: &[String], parser: &dyn ReferenceParser) -> Result<Vec<String>> {
    match args {
        [] => Ok(Vec::new()),
        [reference] => {
            let canonical = parser.parse_docker_ref(reference)?;
            Ok(vec![format!("name=={}", canonical)])
        }
        _ => Err(ImagesError::InvalidArgument.into()),
    }
}

/// Runs the `images` command.
///
/// Arguments are validated before `connect` is called, so usage errors
/// never reach the runtime.
pub fn images_action<C, F, W>(
    args: &[String],
    options: &ImagesOptions,
    parser: &dyn ReferenceParser,
    connect: F,
    out: W,
) -> Result<()>
where
    C: ImageStore + SnapshotService,
    F: FnOnce() -> Result<C>,
    W: Write,
{
    let filters = image_filters(args, parser)?;
    let client = connect()?;

    // TODO: accept `--filter` expressions in addition to the reference argument.
    let images = client.list(&filters)?;
    debug!("Found {} images", images.len());

    let errors = print_images(out, &client, &images, options, parser, Utc::now())?;
    if let Some(warning) = errors.warning() {
        warn!("{}", warning);
    }
    Ok(())
}

/// Writes `images` to `out` in listing order and returns the size
/// resolution failures, leaving it to the caller to report them.
pub fn print_images<C, W>(
    out: W,
    client: &C,
    images: &[Image],
    options: &ImagesOptions,
    parser: &dyn ReferenceParser,
    now: DateTime<Utc>,
) -> Result<SizeErrors>
where
    C: ImageStore + SnapshotService + ?Sized,
    W: Write,
{
    let mut errors = SizeErrors::new();
    let mut w = TabWriter::new(out)
        .min_width(MIN_CELL_WIDTH)
        .padding(CELL_PADDING);

    if options.quiet {
        for image in images {
            writeln!(w, "{}", display_digest(&image.target.digest, options.no_trunc))?;
        }
        w.flush()?;
        return Ok(errors);
    }

    if options.format == Format::Table {
        writeln!(w, "REPOSITORY\tTAG\tIMAGE ID\tCREATED\tSIZE")?;
    }

    for image in images {
        let size = errors.resolve(client, &options.snapshotter, image);
        let row = display_row(image, size, options.no_trunc, parser, now);
        match options.format {
            Format::Table => writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                row.repository, row.tag, row.image_id, row.created_since, row.size
            )?,
            Format::Json => writeln!(w, "{}", serde_json::to_string(&row)?)?,
        }
    }

    w.flush()?;
    Ok(errors)
}

pub fn display_row(
    image: &Image,
    size: i64,
    no_trunc: bool,
    parser: &dyn ReferenceParser,
    now: DateTime<Utc>,
) -> DisplayRow {
    let (repository, tag) = parser.parse_repo_tag(&image.name);
    let (created_since, created_at) = match image.created_at {
        Some(created) => (time_since(created, now), created.to_rfc3339()),
        None => ("N/A".to_string(), String::new()),
    };

    DisplayRow {
        repository,
        tag,
        image_id: display_digest(&image.target.digest, no_trunc).to_string(),
        created_since,
        created_at,
        size: human_size(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::DockerReferenceParser;
    use crate::runtime::{Target, Usage};
    use anyhow::anyhow;
    use chrono::Duration;

    const DIGEST: &str = "sha256:abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789";
    const LAYER: &str = "sha256:a3ed95caeb02ffe68cdd9fd84406680ae93d633cb16422d00e8a7c22955b46d4";

    struct StaticRuntime;

    impl ImageStore for StaticRuntime {
        fn list(&self, _filters: &[String]) -> Result<Vec<Image>> {
            Ok(Vec::new())
        }

        fn root_fs(&self, image: &Image) -> Result<Vec<String>> {
            if image.name.contains("broken") {
                Err(anyhow!("no config"))
            } else {
                Ok(vec![LAYER.to_string()])
            }
        }
    }

    impl SnapshotService for StaticRuntime {
        fn usage(&self, _snapshotter: &str, _key: &str) -> Result<Usage> {
            Ok(Usage {
                size: 1024,
                inodes: 1,
            })
        }
    }

    fn options(quiet: bool, no_trunc: bool) -> ImagesOptions {
        ImagesOptions {
            quiet,
            no_trunc,
            format: Format::Table,
            snapshotter: "overlayfs".to_string(),
        }
    }

    fn image(name: &str, created_at: DateTime<Utc>) -> Image {
        Image {
            name: name.to_string(),
            target: Target {
                media_type: "application/vnd.oci.image.index.v1+json".to_string(),
                digest: DIGEST.to_string(),
                size: 1,
            },
            created_at: Some(created_at),
        }
    }

    fn render(images: &[Image], options: &ImagesOptions, now: DateTime<Utc>) -> (String, SizeErrors) {
        let mut out = Vec::new();
        let errors = print_images(
            &mut out,
            &StaticRuntime,
            images,
            options,
            &DockerReferenceParser,
            now,
        )
        .unwrap();
        (String::from_utf8(out).unwrap(), errors)
    }

    #[test]
    fn test_image_filters() {
        let parser = DockerReferenceParser;
        assert!(image_filters(&[], &parser).unwrap().is_empty());
        assert_eq!(
            image_filters(&["alpine".to_string()], &parser).unwrap(),
            vec!["name==docker.io/library/alpine:latest".to_string()]
        );

        let err = image_filters(&["a".to_string(), "b".to_string()], &parser).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImagesError>(),
            Some(ImagesError::InvalidArgument)
        ));

        let err = image_filters(&["Alpine".to_string()], &parser).unwrap_err();
        assert!(err
            .downcast_ref::<crate::reference::ReferenceError>()
            .is_some());
    }

    #[test]
    fn test_standard_listing() {
        let now = Utc::now();
        let images = [image("docker.io/library/alpine:latest", now - Duration::hours(2))];
        let (out, errors) = render(&images, &options(false, false), now);

        assert!(errors.is_empty());
        assert_eq!(
            out,
            "REPOSITORY    TAG       IMAGE ID        CREATED        SIZE\n\
             alpine        latest    abcdef012345    2 hours ago    1.0 KiB\n"
        );
    }

    #[test]
    fn test_quiet_listing() {
        let now = Utc::now();
        let images = [image("docker.io/library/alpine:latest", now - Duration::hours(2))];
        let (out, _) = render(&images, &options(true, false), now);
        assert_eq!(out, "abcdef012345\n");

        let (out, _) = render(&images, &options(true, true), now);
        assert_eq!(out, format!("{}\n", DIGEST));
    }

    #[test]
    fn test_rows_keep_listing_order() {
        let now = Utc::now();
        let images = [
            image("docker.io/library/nginx:1.25", now - Duration::days(3)),
            image("docker.io/library/alpine:3.20", now - Duration::minutes(5)),
            image("ghcr.io/acme/tool:v1", now - Duration::seconds(30)),
        ];
        let (out, _) = render(&images, &options(false, true), now);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("REPOSITORY"));
        assert!(lines[1].starts_with("nginx ") && lines[1].contains("3 days ago"));
        assert!(lines[2].starts_with("alpine ") && lines[2].contains("5 minutes ago"));
        assert!(lines[3].starts_with("ghcr.io/acme/tool ") && lines[3].contains(DIGEST));
    }

    #[test]
    fn test_size_failures_still_print_rows() {
        let now = Utc::now();
        let images = [
            image("docker.io/library/broken:1", now),
            image("docker.io/library/alpine:latest", now),
            image("docker.io/library/broken:2", now),
        ];
        let (out, errors) = render(&images, &options(false, false), now);

        assert_eq!(out.lines().count(), 4);
        assert_eq!(errors.len(), 2);
        assert!(out.lines().nth(1).unwrap().ends_with("0.0 B"));
        assert!(errors.warning().is_some());
    }

    #[test]
    fn test_json_listing() {
        let now = Utc::now();
        let mut opts = options(false, false);
        opts.format = Format::Json;
        let images = [image("docker.io/library/alpine:latest", now - Duration::hours(2))];
        let (out, _) = render(&images, &opts, now);

        let row: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(row["Repository"], "alpine");
        assert_eq!(row["Tag"], "latest");
        assert_eq!(row["ID"], "abcdef012345");
        assert_eq!(row["CreatedSince"], "2 hours ago");
        assert_eq!(row["Size"], "1.0 KiB");
    }

    #[test]
    fn test_missing_creation_time() {
        let mut img = image("docker.io/library/alpine:latest", Utc::now());
        img.created_at = None;
        let row = display_row(&img, 0, false, &DockerReferenceParser, Utc::now());
        assert_eq!(row.created_since, "N/A");
        assert_eq!(row.created_at, "");
    }
}
