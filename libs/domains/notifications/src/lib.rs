//! Patient confirmation notifications.
//!
//! ```text
//! registration ──► NotificationService ──► Redis stream "notifications"
//!                                                 │
//!                         StreamWorker ◄──────────┘
//!                              │
//!                    NotificationProcessor ──► JobHandlers
//!                                                ├─ EmailChannel ──► SMTP
//!                                                └─ SmsChannel  (not yet available)
//! ```
//!
//! ```rust,ignore
//! use domain_notifications::{ConfirmationRequest, NotificationService, NotificationStream};
//! use stream_worker::StreamProducer;
//!
//! let producer = StreamProducer::from_stream_def::<NotificationStream>(redis);
//! let service = NotificationService::new(producer);
//! service.dispatch_confirmation(&request).await?;
//! ```

pub mod channels;
pub mod error;
pub mod models;
pub mod processor;
pub mod providers;
pub mod service;
pub mod streams;
pub mod templates;

pub use channels::{
    ConfirmationMailer, EmailChannel, SmsChannel, SmsNotImplementedError, UnavailableSmsChannel,
};
pub use error::{NotificationError, NotificationResult};
pub use models::{
    ConfirmationRequest, EmailPayload, JobType, NotificationChannel, NotificationJob, SmsPayload,
};
pub use processor::{JobHandlers, JobHandlersBuilder, NotificationProcessor};
pub use providers::{EmailContent, EmailProvider, SentEmail, SmtpConfig, SmtpProvider};
pub use service::NotificationService;
pub use streams::NotificationStream;
