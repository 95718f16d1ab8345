use anyhow::{Context, Result};
use tokio::io::{stdin, stdout, BufReader};

use decoder::runtime::{boot, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = boot::boot().context("Failed to load configuration")?;
    run::run(&config, BufReader::new(stdin()), stdout()).await?;
    Ok(())
}
