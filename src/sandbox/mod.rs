/*!
 * Sandbox
 * Host side of the isolation boundary: page, bus, and the controller
 */

pub mod bus;
pub mod callbacks;
pub mod config;
pub mod controller;
pub mod page;

pub use bus::{BoundaryOutbox, MessageBus};
pub use callbacks::SandboxCallbacks;
pub use config::{SandboxConfig, SandboxOptions};
pub use controller::Sandbox;
pub use page::{Container, ContainerRef, Page};
