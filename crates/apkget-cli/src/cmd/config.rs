//! `--config-dir`

use anyhow::Result;

use apkget_core::apkget_home;

pub fn print_config_dir() -> Result<()> {
    println!("{}", apkget_home().display());
    Ok(())
}
