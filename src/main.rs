use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::error;

use rusty_fat16::config::ShellConfig;
use rusty_fat16::shell::{Command, Shell};

const USAGE: &str = "usage: rusty-fat16 [IMAGE] [PARTITION-INDEX]";

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        eprintln!("rusty-fat16: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut config = ShellConfig::load();
    rusty_fat16::logging::init(config.level_filter());

    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            return Ok(());
        }
        config.image_path = Some(PathBuf::from(arg));
    }
    if let Some(index) = args.next() {
        let index = index
            .parse::<usize>()
            .with_context(|| format!("invalid partition index '{index}'"))?;
        config.partition_index = Some(index);
    }

    let Some(image_path) = config.image_path.clone() else {
        bail!("no image given and none configured\n{USAGE}");
    };

    let nav = rusty_fat16::fs::open_image(&image_path, config.partition_index)
        .with_context(|| format!("cannot mount {}", image_path.display()))?;

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    if interactive {
        println!(
            "rusty-fat16 {} - {} ('help' for commands)",
            env!("APP_VERSION"),
            image_path.display()
        );
    }

    let mut shell = Shell::new(nav, io::stdout().lock(), config);
    if interactive {
        shell.execute(&Command::Info)?;
    }
    shell.run(stdin.lock(), interactive)
}
