use anyhow::Result;
use clap::{CommandFactory, Parser};
use env_logger::Env;
use log::{debug, LevelFilter};
use std::io;

use imgctl::cli::{Cli, Commands, GlobalOptions, Shell};
use imgctl::{completion, images_action, ContainerdClient, DockerReferenceParser, ImageStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity level
    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_env(Env::default())
        .filter_level(log_level)
        .init();

    debug!("Address: {}", cli.global.address);
    debug!("Namespace: {}", cli.global.namespace);
    debug!("Snapshotter: {}", cli.global.snapshotter);

    let global = &cli.global;
    match &cli.command {
        Commands::Images(args) => images_action(
            &args.images,
            &args.options(global),
            &DockerReferenceParser,
            || connect(global),
            io::stdout().lock(),
        ),
        Commands::Completion { shell } => match shell {
            Shell::Bash => {
                print!("{}", completion::bash_script(env!("CARGO_BIN_NAME")));
                Ok(())
            }
        },
        Commands::Complete { words } => completion::complete(
            &Cli::command(),
            words,
            || connect(global)?.list(&[]),
            io::stdout().lock(),
        ),
    }
}

fn connect(global: &GlobalOptions) -> Result<ContainerdClient> {
    ContainerdClient::connect(&global.address, &global.namespace)
}
