use std::path::PathBuf;

use clap::Parser;

/// Environment variable holding the default destination project.
pub const DEST_ENV: &str = "CP_LINK_DEST";

/// Copy this package's published files into another project's node_modules.
///
/// Run from inside the library. The package.json closest to the working
/// directory decides the package name and which files are copied; they land in
/// `<DESTINATION>/node_modules/<name>`. With `--watch`, the package is rebuilt
/// and copied again whenever a file changes.
#[derive(Parser, Debug)]
#[command(name = "cp-link", version, about, long_about = None)]
pub struct Cli {
    /// Project that receives the package. `~` expands to the home directory.
    #[arg(env = DEST_ENV)]
    pub destination: Option<PathBuf>,

    /// Rebuild and copy on every change. Watches DIR, or the working directory.
    #[arg(
        short,
        long,
        value_name = "DIR",
        num_args = 0..=1,
        require_equals = true
    )]
    pub watch: Option<Option<PathBuf>>,

    /// Build command run before copying [default: npm run build].
    #[arg(short, long, value_name = "CMD")]
    pub build: Option<String>,

    /// Copy without building first.
    #[arg(long, conflicts_with = "build")]
    pub skip_build: bool,

    /// Quiet period in milliseconds after the last change before rebuilding [default: 100].
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Print debug output.
    #[arg(short, long)]
    pub verbose: bool,
}
