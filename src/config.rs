use clap::Parser;
use std::path::PathBuf;

/// An LC-3 instruction set virtual machine.
#[derive(Debug, Parser)]
#[command(name = "lc3-vm", version, about)]
struct Cli {
    /// Program image(s) to load, in order. Later images overwrite earlier
    /// ones where their address ranges overlap.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Run the interactive single-step debugger instead of free-running.
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, PartialEq)]
pub struct Config {
    pub images: Vec<PathBuf>,
    pub debug: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            images: cli.images,
            debug: cli.debug,
        }
    }
}

impl Config {
    /// Parses `std::env::args_os()`, exiting the process with a usage
    /// message (exit code 2) if no image file is given.
    pub fn parse() -> Config {
        Cli::parse().into()
    }

    #[cfg(test)]
    fn try_parse_from<I, T>(args: I) -> Result<Config, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Cli::try_parse_from(args).map(Config::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_valid_arguments() {
        let config = Config::try_parse_from(["lc3-vm", "filename"]).unwrap();

        assert_eq!(config.images, vec![PathBuf::from("filename")]);
        assert!(!config.debug);
    }

    #[test]
    fn config_not_enough_arguments() {
        assert!(Config::try_parse_from(["lc3-vm"]).is_err());
    }

    #[test]
    fn config_with_debug() {
        let config = Config::try_parse_from(["lc3-vm", "filename", "--debug"]).unwrap();

        assert_eq!(config.images, vec![PathBuf::from("filename")]);
        assert!(config.debug);
    }

    #[test]
    fn config_with_debug_first() {
        let config = Config::try_parse_from(["lc3-vm", "--debug", "filename"]).unwrap();

        assert_eq!(config.images, vec![PathBuf::from("filename")]);
        assert!(config.debug);
    }

    #[test]
    fn config_with_multiple_images() {
        let config = Config::try_parse_from(["lc3-vm", "first.obj", "second.obj"]).unwrap();

        assert_eq!(
            config.images,
            vec![PathBuf::from("first.obj"), PathBuf::from("second.obj")]
        );
    }
}
