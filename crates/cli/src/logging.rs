// Diagnostics go to stderr so stdout stays clean for --json output.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `-v` raises the default `warn` level.
pub fn init(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
