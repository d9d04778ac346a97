use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

/// Project command, executed in the order given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// Run the incremental build.
    Build,
    /// Remove every declared output of the current task set.
    Clean,
    /// Delete the whole build directory and forget all signatures.
    Distclean,
    /// Download the configured library archives.
    Resolve,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Build => "build",
            Command::Clean => "clean",
            Command::Distclean => "distclean",
            Command::Resolve => "resolve",
        };
        f.write_str(name)
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "build" => Ok(Command::Build),
            "clean" => Ok(Command::Clean),
            "distclean" => Ok(Command::Distclean),
            "resolve" => Ok(Command::Resolve),
            other => Err(format!(
                "invalid command: {other} (expected build, clean, distclean or resolve)"
            )),
        }
    }
}
