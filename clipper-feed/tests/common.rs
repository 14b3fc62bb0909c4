use std::sync::OnceLock;

use clipper_common::observability::{LogConfig, init_logging};

static INIT: OnceLock<()> = OnceLock::new();

pub fn init_test_tracing() {
    INIT.get_or_init(|| {
        let config = LogConfig {
            app_name: "clipper-tests",
            log_dir: Some(std::env::temp_dir().join("clipper-tests")),
            emit_stderr: true,
            default_filter: "debug",
            ..LogConfig::default()
        };
        let _ = init_logging(config);
    });
}
