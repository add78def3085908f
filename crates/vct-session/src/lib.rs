mod controller;
mod conversation;
mod projector;
mod session;
mod suggestions;
mod view;

pub use controller::{RequestController, SessionEvent, SessionSnapshot};
pub use conversation::Conversation;
pub use projector::ResultProjector;
pub use session::{PendingTicket, Session, Settlement, SubmitRejection};
pub use suggestions::{PREDEFINED_PROMPTS, suggestion, suggestions};
pub use view::ViewSelector;
