//! Server action layer
//!
//! Each action resolves the caller's active connection, invokes one driver
//! capability and reports `{success, error?}`. Session and connection
//! failures are returned as errors; business-rule violations come back as
//! a failed [`ActionResult`]. A fatal provider error additionally tears the
//! stored connection down.

mod context;
mod mail;
mod session;

pub use context::ActionContext;
pub use mail::{ActionResult, ListRequest, MailActions};
pub use session::{INBOX_PATH, RevalidationLog, Revalidator, SessionProvider, StaticSession};
