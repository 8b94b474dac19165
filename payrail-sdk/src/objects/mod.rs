pub mod events;
pub mod requests;

pub use events::{EventStatus, NotificationEvent, NotificationKind, PaymentEvent, RefundEvent};
pub use requests::{PaymentRequest, RefundRequest};
