use std::io::Write;

use env_logger::{Env, WriteStyle};

/// `[VPHYS | LEVEL] msg`, default level info, `RUST_LOG` overrides.
pub(crate) fn try_init() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[VPHYS | {}] {}", record.level(), record.args()))
        .write_style(WriteStyle::Auto)
        .try_init()
}
