use env_logger::Env;

/// Filter used when `RUST_LOG` is unset. `LOG_LEVEL=debug` turns on debug
/// output; anything else keeps the default.
pub fn default_filter(log_level: Option<&str>) -> &'static str {
    match log_level {
        Some(level) if level.eq_ignore_ascii_case("debug") => "debug",
        _ => "info",
    }
}

pub fn init() {
    let log_level = std::env::var("LOG_LEVEL").ok();
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter(log_level.as_deref())))
        .format_timestamp_secs()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_alias() {
        assert_eq!(default_filter(None), "info");
        assert_eq!(default_filter(Some("debug")), "debug");
        assert_eq!(default_filter(Some("DEBUG")), "debug");
        assert_eq!(default_filter(Some("trace")), "info");
    }
}
