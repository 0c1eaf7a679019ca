use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::images::{Format, ImagesOptions};

pub const DEFAULT_ADDRESS: &str = "/run/containerd/containerd.sock";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_SNAPSHOTTER: &str = "overlayfs";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace)"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Runtime connection settings shared by every subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    #[arg(
        short,
        long,
        global = true,
        env = "CONTAINERD_ADDRESS",
        default_value = DEFAULT_ADDRESS,
        help = "containerd address"
    )]
    pub address: String,

    #[arg(
        short,
        long,
        global = true,
        env = "CONTAINERD_NAMESPACE",
        default_value = DEFAULT_NAMESPACE,
        help = "containerd namespace"
    )]
    pub namespace: String,

    #[arg(
        long,
        global = true,
        env = "CONTAINERD_SNAPSHOTTER",
        default_value = DEFAULT_SNAPSHOTTER,
        help = "containerd snapshotter"
    )]
    pub snapshotter: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List images
    Images(ImagesArgs),

    /// Print a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },

    #[command(name = "__complete", hide = true)]
    Complete {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ImagesArgs {
    #[arg(short, long, help = "Only show numeric IDs")]
    pub quiet: bool,

    #[arg(long, help = "Don't truncate output")]
    pub no_trunc: bool,

    #[arg(long, value_enum, default_value_t = Format::Table, help = "Output format")]
    pub format: Format,

    #[arg(value_name = "IMAGE", help = "Only list images matching this reference")]
    pub images: Vec<String>,
}

impl ImagesArgs {
    pub fn options(&self, global: &GlobalOptions) -> ImagesOptions {
        ImagesOptions {
            quiet: self.quiet,
            no_trunc: self.no_trunc,
            format: self.format,
            snapshotter: global.snapshotter.clone(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
}
