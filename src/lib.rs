pub mod cli;
pub mod completion;
pub mod human;
pub mod identity;
pub mod images;
pub mod reference;
pub mod runtime;
pub mod size;
pub mod table;

// Re-exports for easy access
pub use images::{images_action, print_images, Format, ImagesError, ImagesOptions};
pub use reference::{DockerReferenceParser, Reference, ReferenceError, ReferenceParser};
pub use runtime::{ContainerdClient, Image, ImageStore, SnapshotService, Usage};
pub use size::SizeErrors;
