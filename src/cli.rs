use std::path::PathBuf;

use clap::Parser;

/// Annotate a screenshot: draw, type, crop, then copy, save or share.
#[derive(Debug, Parser)]
#[command(name = "snapmark", version)]
pub struct Cli {
    /// Image to open (png, jpg, ...)
    pub image: PathBuf,

    /// Read preferences from this file instead of the platform default
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (RUST_LOG is honoured)
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_and_flags() {
        let cli = Cli::parse_from(["snapmark", "shot.png", "--debug", "--config", "c.json"]);
        assert_eq!(cli.image, PathBuf::from("shot.png"));
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn image_is_required() {
        assert!(Cli::try_parse_from(["snapmark"]).is_err());
    }
}
