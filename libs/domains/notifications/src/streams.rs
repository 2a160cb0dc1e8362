//! Queue definition for confirmation jobs.

use stream_worker::StreamDef;

/// The `notifications` stream, drained by the `notification_workers` group.
pub struct NotificationStream;

impl StreamDef for NotificationStream {
    const STREAM_NAME: &'static str = "notifications";

    const CONSUMER_GROUP: &'static str = "notification_workers";
}
