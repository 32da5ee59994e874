use std::time::Duration;

use sqline::{Config, Connection, Result};

pub async fn main() -> Result<()> {
    // SQLINE_HOST / SQLINE_PORT, falling back to localhost:5657
    let conn = Connection::connect_env().await?;
    conn.close().await?;

    let config = Config::default().with_read_timeout(Duration::from_secs(5));
    let conn = Connection::connect_with(&config).await?;
    conn.close().await?;

    Ok(())
}
