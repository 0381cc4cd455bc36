use std::env::{self, VarError};

use anyhow::{anyhow, bail, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "VSFS_LOG";

/// Logger a stderr; stdout queda libre para el reporte.
/// El filtro sale de VSFS_LOG (por defecto sólo warnings).
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

/// Lee una variable booleana del entorno (1/0, true/false, yes/no, on/off).
pub fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => parse_bool(key, value.trim()),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => bail!("{key} contains non-UTF-8 bytes"),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    const TRUE: [&str; 4] = ["1", "true", "yes", "on"];
    const FALSE: [&str; 4] = ["0", "false", "no", "off"];

    if TRUE.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Ok(true)
    } else if FALSE.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Ok(false)
    } else {
        bail!("invalid {key}={value:?}; expected one of: 1,0,true,false,yes,no,on,off")
    }
}
