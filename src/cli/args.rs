//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Pass-through
//!
//! Flags vershelf does not know are forwarded to the build engine, as is
//! everything after `--`. [`split_passthrough`] separates them before clap
//! sees the command line:
//!
//! ```text
//! vershelf docs build/html -c docs -W --keep-going -- -j auto
//!          ^^^^^^^^^^^^^^^ ^^^^^^^ ^^^^^^^^^^^^^^^    ^^^^^^^
//!          positional      known   forwarded          forwarded
//! ```
//!
//! A forwarded flag that takes a separate value must be written in attached
//! form (`-j4`, `--jobs=4`) or placed after `--`.

use clap::Parser;
use std::path::PathBuf;

/// Build documentation for every matching branch and tag of a repository
#[derive(Parser, Debug)]
#[command(name = "vershelf")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
Unrecognized options and everything after `--` are passed to the build engine.

EXAMPLES:
    # Build every version of docs/ into build/html/<version>
    vershelf docs build/html

    # Show which versions would be built, without building
    vershelf docs build/html --dump-metadata

    # Forward warnings-as-errors to every build
    vershelf docs build/html -W")]
pub struct Cli {
    /// Documentation source directory
    pub sourcedir: PathBuf,

    /// Output root; each version is built below it
    pub outputdir: PathBuf,

    /// Build only these files
    pub filenames: Vec<String>,

    /// Directory containing vershelf.toml (default: SOURCEDIR)
    #[arg(short = 'c', long = "confdir", value_name = "PATH")]
    pub confdir: Option<PathBuf>,

    /// Build without a configuration file (not supported)
    #[arg(short = 'C', long = "no-config")]
    pub noconfig: bool,

    /// Override a configuration setting
    #[arg(short = 'D', long = "define", value_name = "SETTING=VALUE")]
    pub define: Vec<String>,

    /// Print the metadata table as JSON and exit without building
    #[arg(long)]
    pub dump_metadata: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Arguments for the build engine
    #[arg(skip)]
    pub passthrough: Vec<String>,
}

impl Cli {
    /// Parse the process command line.
    pub fn parse_args() -> Self {
        Self::parse_with_passthrough(std::env::args())
    }

    /// Parse `args` (program name first), exiting on usage errors.
    pub fn parse_with_passthrough<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (known, passthrough) = split_passthrough(args);
        let mut cli = Self::parse_from(known);
        cli.passthrough = passthrough;
        cli
    }

    /// Parse `args` (program name first), returning usage errors.
    pub fn try_parse_with_passthrough<I, S>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (known, passthrough) = split_passthrough(args);
        let mut cli = Self::try_parse_from(known)?;
        cli.passthrough = passthrough;
        Ok(cli)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    /// Known flag without a value
    Switch,
    /// Known flag whose value is the next token
    Valued,
    /// Known flag with its value attached
    Attached,
    /// Not ours
    Foreign,
}

const SHORT_SWITCHES: &[char] = &['C', 'q', 'h', 'V'];
const SHORT_VALUED: &[char] = &['c', 'D'];
const LONG_SWITCHES: &[&str] = &["no-config", "dump-metadata", "debug", "quiet", "help", "version"];
const LONG_VALUED: &[&str] = &["confdir", "define"];

fn classify(arg: &str) -> FlagKind {
    if let Some(long) = arg.strip_prefix("--") {
        let (name, value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        if LONG_VALUED.contains(&name) {
            return if value { FlagKind::Attached } else { FlagKind::Valued };
        }
        if LONG_SWITCHES.contains(&name) && !value {
            return FlagKind::Switch;
        }
        return FlagKind::Foreign;
    }

    let mut chars = arg.chars().skip(1);
    let (Some(flag), rest) = (chars.next(), chars.next()) else {
        return FlagKind::Foreign;
    };
    if SHORT_VALUED.contains(&flag) {
        if rest.is_some() {
            FlagKind::Attached
        } else {
            FlagKind::Valued
        }
    } else if SHORT_SWITCHES.contains(&flag) && rest.is_none() {
        FlagKind::Switch
    } else {
        FlagKind::Foreign
    }
}

/// Split a command line into vershelf's own arguments and those forwarded
/// to the build engine.
///
/// The first element (program name) always stays with vershelf.
pub fn split_passthrough<I, S>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut known: Vec<String> = args.next().into_iter().collect();
    let mut forwarded = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            forwarded.extend(args.by_ref());
            break;
        }
        if !arg.starts_with('-') || arg == "-" {
            known.push(arg);
            continue;
        }
        match classify(&arg) {
            FlagKind::Switch | FlagKind::Attached => known.push(arg),
            FlagKind::Valued => {
                known.push(arg);
                if let Some(value) = args.next() {
                    known.push(value);
                }
            }
            FlagKind::Foreign => forwarded.push(arg),
        }
    }

    (known, forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(args: &[&str]) -> (Vec<String>, Vec<String>) {
        split_passthrough(args.iter().copied())
    }

    mod passthrough {
        use super::*;

        #[test]
        fn keeps_known_flags() {
            let (known, forwarded) = split(&[
                "vershelf", "docs", "out", "-c", "conf", "-D", "a=b", "--dump-metadata", "-q",
            ]);
            assert_eq!(
                known,
                vec!["vershelf", "docs", "out", "-c", "conf", "-D", "a=b", "--dump-metadata", "-q"]
            );
            assert!(forwarded.is_empty());
        }

        #[test]
        fn forwards_unknown_flags() {
            let (known, forwarded) = split(&["vershelf", "-W", "docs", "--keep-going", "out", "-j4"]);
            assert_eq!(known, vec!["vershelf", "docs", "out"]);
            assert_eq!(forwarded, vec!["-W", "--keep-going", "-j4"]);
        }

        #[test]
        fn forwards_everything_after_double_dash() {
            let (known, forwarded) = split(&["vershelf", "docs", "out", "--", "-c", "x", "--debug"]);
            assert_eq!(known, vec!["vershelf", "docs", "out"]);
            assert_eq!(forwarded, vec!["-c", "x", "--debug"]);
        }

        #[test]
        fn attached_values() {
            let (known, forwarded) = split(&["vershelf", "-cconf", "-Dx=1", "--define=y=2", "docs", "out"]);
            assert_eq!(known, vec!["vershelf", "-cconf", "-Dx=1", "--define=y=2", "docs", "out"]);
            assert!(forwarded.is_empty());
        }

        #[test]
        fn combined_short_switches_are_foreign() {
            let (_, forwarded) = split(&["vershelf", "-qW", "docs", "out"]);
            assert_eq!(forwarded, vec!["-qW"]);
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn positional_and_flags() {
            let cli = Cli::try_parse_with_passthrough([
                "vershelf", "docs", "build/html", "index.rst", "-c", "conf", "-D", "a=b", "-D",
                "c=d", "-W",
            ])
            .unwrap();
            assert_eq!(cli.sourcedir, PathBuf::from("docs"));
            assert_eq!(cli.outputdir, PathBuf::from("build/html"));
            assert_eq!(cli.filenames, vec!["index.rst"]);
            assert_eq!(cli.confdir, Some(PathBuf::from("conf")));
            assert_eq!(cli.define, vec!["a=b", "c=d"]);
            assert_eq!(cli.passthrough, vec!["-W"]);
            assert!(!cli.noconfig);
            assert!(!cli.dump_metadata);
        }

        #[test]
        fn switches() {
            let cli = Cli::try_parse_with_passthrough([
                "vershelf", "docs", "out", "-C", "--dump-metadata", "--debug",
            ])
            .unwrap();
            assert!(cli.noconfig);
            assert!(cli.dump_metadata);
            assert!(cli.debug);
            assert!(!cli.quiet);
        }

        #[test]
        fn missing_outputdir_is_error() {
            assert!(Cli::try_parse_with_passthrough(["vershelf", "docs"]).is_err());
        }
    }
}
