//! A job together with its stream metadata.

use crate::registry::StreamJob;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct StreamEvent<J: StreamJob> {
    /// Entry id, `<ms>-<seq>`
    pub id: String,

    /// Job-type tag stored alongside the payload
    pub name: String,

    pub job: J,

    /// Enqueue time recovered from the entry id
    pub timestamp: DateTime<Utc>,
}

impl<J: StreamJob> StreamEvent<J> {
    pub fn new(id: impl Into<String>, name: impl Into<String>, job: J) -> Self {
        let id = id.into();
        let timestamp = parse_timestamp(&id);
        Self {
            id,
            name: name.into(),
            job,
            timestamp,
        }
    }

    pub fn job_id(&self) -> String {
        self.job.job_id()
    }

    /// Time spent in the queue so far.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.timestamp
    }
}

fn parse_timestamp(id: &str) -> DateTime<Utc> {
    id.split('-')
        .next()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Serialize, Deserialize, Debug)]
    struct Ping {
        id: String,
    }

    impl StreamJob for Ping {
        fn job_id(&self) -> String {
            self.id.clone()
        }
        fn name(&self) -> &'static str {
            "PING"
        }
    }

    #[test]
    fn test_timestamp_from_id() {
        let event = StreamEvent::new("1700000000123-4", "PING", Ping { id: "p1".into() });
        assert_eq!(event.timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(event.job_id(), "p1");
        assert_eq!(event.name, "PING");
    }

    #[test]
    fn test_unparseable_id_falls_back_to_now() {
        let event = StreamEvent::new("not-an-id", "PING", Ping { id: "p1".into() });
        assert!(event.age().num_seconds() < 5);
    }
}
