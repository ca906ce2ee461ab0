//! Cleanup command
//!
//! Placeholder: objects created by `kubestress load` are left in place.

use tracing::info;

use crate::Result;

/// Run the cleanup command
pub async fn run() -> Result<()> {
    info!("cleanup is not implemented, created nodes, pods and service accounts are left in place");
    Ok(())
}
