use clap::{Parser, Subcommand};

use crate::{
    generate::GenerateSubcommands,
    optimize::{OptimizeArgs, OptimizeFileArgs},
};

mod file_utils;
mod generate;
mod optimize;
mod parsers;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimizes the schedule described by the flags and prints it as JSON
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Optimizes JSON requests read from a file or a folder
    OptimizeFile {
        #[command(flatten)]
        args: OptimizeFileArgs,
    },
    #[command(visible_alias = "g")]
    Generate {
        #[command(subcommand)]
        commands: GenerateSubcommands,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Optimize { args } => optimize::run(args)?,
        Commands::OptimizeFile { args } => optimize::run_file(args)?,
        Commands::Generate { commands } => generate::run(commands)?,
    }

    Ok(())
}
