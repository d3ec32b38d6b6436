//! Collaborator traits defined in `estate-core` and implemented by the host
//! application or by other estate crates.

pub mod clock;
pub mod collaborators;
pub mod navigator;
pub mod notifier;
pub mod reporter;
pub mod session_api;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use collaborators::Collaborators;
pub use navigator::{Navigator, redirect_url};
pub use notifier::Notifier;
pub use reporter::{ErrorReporter, TracingErrorReporter};
pub use session_api::SessionApi;
pub use storage::KeyValueStore;
