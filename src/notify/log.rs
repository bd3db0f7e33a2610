use async_trait::async_trait;
use tracing::info;

use crate::notify::{Notice, NotificationEmitter, NotificationFailure};

/// Writes notices to the service log. Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn emit(&self, notice: &Notice) -> Result<(), NotificationFailure> {
        info!(
            vehicle_id = %notice.vehicle_id,
            kind = notice.kind,
            tracking_code = %notice.tracking_code,
            message = %notice.message,
            "vehicle notification"
        );
        Ok(())
    }
}
