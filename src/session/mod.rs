pub mod handlers;
pub mod registry;
pub mod router;

pub use registry::SessionRegistry;
pub use router::{Action, Page, Scratch, SessionState, SessionUser};
