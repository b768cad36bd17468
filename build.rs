// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("filesdb")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Conary Contributors")
        .about("Sync pacman files databases and rewrite them as uncompressed cpio")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .default_value("/etc/pacman.conf")
                .help("Path to the pacman configuration file"),
        )
        .arg(
            Arg::new("cachedir")
                .long("cachedir")
                .value_name("DIR")
                .default_value("/var/cache/filesdb")
                .help("Directory holding the synced files databases"),
        )
        .arg(
            Arg::new("dbpath")
                .short('b')
                .long("dbpath")
                .value_name("DIR")
                .default_value("/var/lib/pacman/")
                .help("pacman database directory"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .default_value("/")
                .help("Filesystem root"),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .value_name("ARCH")
                .help("Architecture substituted for $arch (default: this machine's)"),
        )
        .arg(
            Arg::new("no_progress")
                .long("no-progress")
                .action(ArgAction::SetTrue)
                .help("Never draw progress bars, even on a terminal"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .subcommand(
            Command::new("sync")
                .about("Download and transcode files databases (default)")
                .arg(
                    Arg::new("repo")
                        .long("repo")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Only sync these repositories (repeatable)"),
                ),
        )
        .subcommand(
            Command::new("repos")
                .about("Show configured repositories and the URLs that would be fetched"),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(Arg::new("shell").required(true).help("Shell type")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("filesdb.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
