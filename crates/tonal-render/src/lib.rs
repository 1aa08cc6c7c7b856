//! Tonal Render: drives an external compositor from adjustment values.
//!
//! Owns the async side of an editing session: the coalescing render
//! scheduler, the timer-driven history debounce, and the fixed order in
//! which adjustments reach the compositor. Pixel work itself happens behind
//! the [`Compositor`] trait.

pub mod compositor;
pub mod config;
pub mod error;
pub mod history;
pub mod plan;
pub mod renderer;
pub mod scheduler;
pub mod session;

pub use compositor::{BasicAdjustments, Compositor};
pub use config::EngineConfig;
pub use error::{CompositorError, RenderError};
pub use history::DebouncedHistory;
pub use plan::{LutCache, RenderPlan, RenderStep};
pub use renderer::{CompositorRenderer, RenderFn, RenderTarget};
pub use scheduler::{RenderScheduler, RenderStats};
pub use session::EditSession;
