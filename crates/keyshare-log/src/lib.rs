// ABOUTME: Shared logging setup for keyshare binaries
// ABOUTME: init() installs plain stderr logging with a RUST_LOG override

use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(default_filter())
        .init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

#[cfg(test)]
mod tests {
    #[test]
    fn exports_init() {
        let _ = super::init as fn();
    }

    #[test]
    fn test_default_filter_enables_info() {
        let filter = super::default_filter();
        assert!(filter.to_string().contains("info"));
    }
}
