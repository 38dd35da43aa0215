use std::io::Write;

use chrono::Local;
use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};

/// Installs the stderr logger.
///
/// Every line is prefixed with a local RFC 3339 timestamp and the level.
/// `RUST_LOG`, when set, is applied on top of `level`.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let mut builder = Builder::new();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            Local::now().to_rfc3339(),
            record.level(),
            record.args()
        )
    });

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.try_init()
}
