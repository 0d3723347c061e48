//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use coursesync_core::DEFAULT_WORKERS;

/// Mirror course content from a learning platform into a local directory.
///
/// Coursesync walks each course's content tree, downloads documents,
/// attachments, and embedded files, and keeps re-running passes until the
/// mirror converges. Only content modified since the last pass is fetched
/// again.
#[derive(Parser, Debug)]
#[command(name = "coursesync")]
#[command(author, version, about)]
pub struct Args {
    /// Platform origin, e.g. https://campus.example.edu
    #[arg(long)]
    pub base_url: String,

    /// Course id to mirror (repeat for several courses)
    #[arg(long = "course", required = true)]
    pub courses: Vec<String>,

    /// Directory the mirror is written into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// API access token (falls back to the COURSESYNC_TOKEN environment variable)
    #[arg(long)]
    pub token: Option<String>,

    /// Only fetch content modified after this instant (RFC 3339)
    #[arg(long)]
    pub since: Option<String>,

    /// Maximum concurrent writes (1-64)
    #[arg(short = 'c', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: u8,

    /// Abandon the end-of-pass join after this many seconds (0 waits forever)
    #[arg(long, default_value_t = 0)]
    pub join_timeout: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 5] = [
        "coursesync",
        "--base-url",
        "https://campus.example.edu",
        "--course",
        "_c1_1",
    ];

    #[test]
    fn test_cli_default_args_parse_successfully() {
        let args = Args::try_parse_from(REQUIRED).unwrap();
        assert_eq!(args.base_url, "https://campus.example.edu");
        assert_eq!(args.courses, ["_c1_1"]);
        assert_eq!(args.output, PathBuf::from("."));
        assert_eq!(args.concurrency, 8); // DEFAULT_WORKERS
        assert_eq!(args.join_timeout, 0);
        assert!(args.token.is_none());
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_course_flag_repeats() {
        let mut argv: Vec<&str> = REQUIRED.to_vec();
        argv.extend(["--course", "_c2_1"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.courses, ["_c1_1", "_c2_1"]);
    }

    #[test]
    fn test_cli_requires_base_url_and_course() {
        assert!(Args::try_parse_from(["coursesync"]).is_err());
        assert!(
            Args::try_parse_from(["coursesync", "--base-url", "https://campus.example.edu"])
                .is_err()
        );
    }

    #[test]
    fn test_cli_concurrency_range_enforced() {
        let mut argv: Vec<&str> = REQUIRED.to_vec();
        argv.extend(["-c", "64"]);
        assert_eq!(Args::try_parse_from(argv).unwrap().concurrency, 64);

        let mut argv: Vec<&str> = REQUIRED.to_vec();
        argv.extend(["-c", "0"]);
        assert!(Args::try_parse_from(argv).is_err());

        let mut argv: Vec<&str> = REQUIRED.to_vec();
        argv.extend(["-c", "65"]);
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let mut argv: Vec<&str> = REQUIRED.to_vec();
        argv.push("-vv");
        assert_eq!(Args::try_parse_from(argv).unwrap().verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["coursesync", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
