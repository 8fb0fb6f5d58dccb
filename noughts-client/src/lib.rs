//! Client session layer for the noughts game server.
//!
//! A [`SessionHandle`] owns one TCP connection: a background task reads and
//! decodes server lines, and an [`EventDispatcher`] hands each decoded event to
//! whichever listener is currently attached to the session's
//! [`ListenerRegistry`]. Screens attach a [`LobbySession`] or a [`GameSession`]
//! as they come and go.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use noughts_client::{Event, EventListener, SessionHandle};
//!
//! struct Printer;
//!
//! impl EventListener for Printer {
//!     fn on_event(&self, event: Event) {
//!         println!("{:?}", event);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (session, dispatcher) = SessionHandle::connect("127.0.0.1:5555").await?;
//!     let printer = Arc::new(Printer);
//!     session.set_listener(&printer);
//!     dispatcher.run().await;
//!     Ok(())
//! }
//! ```

mod dispatcher;
mod error;
pub mod game;
mod lobby;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod registry;
mod session;
mod traits;
mod transport;

pub use dispatcher::EventDispatcher;
pub use error::{ClientError, ClientResult};
pub use game::{GameSession, MatchOutcome, MatchPhase, MoveRejected};
pub use lobby::LobbySession;
pub use registry::ListenerRegistry;
pub use session::SessionHandle;
pub use traits::{CommandSink, EventListener, GameLaunch, Presenter};
pub use transport::SessionState;

// Re-export protocol types for convenience
pub use noughts_protocol::*;
