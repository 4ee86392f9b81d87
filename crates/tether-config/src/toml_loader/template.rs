//! Default TOML config template with inline documentation comments.

pub(crate) fn default_config_toml() -> String {
    r##"# Tether Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[delivery]
# "inline": response callbacks run on the engine thread that answered
# "thread": response callbacks run on a dedicated delivery thread
# mode = "inline"

[ui]
# queue_warn_depth = 64      # 1-65536

[engine]
# worker_threads = 4         # 1-64
# testnet = false
# stop_timeout_ms = 2000     # 0-30000

[locale]
# preferred = "en-US"

[logging]
# level = "info"             # trace, debug, info, warn, error
"##
    .to_string()
}
