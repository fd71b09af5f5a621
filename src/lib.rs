//! Draft synchronization engine for the construction-site admin console.
//!
//! Tab field values are shadowed in a per-project [`draft::DraftStore`] while the
//! user moves between tabs. Loaders fetch server truth first and only fill the
//! gaps from drafts. The final save pushes everything back in a fixed order.

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod draft;
pub mod events;
pub mod fields;
pub mod form;
pub mod notify;
pub mod overlay;
pub mod persist;
pub mod save;
pub mod tab;

pub use api::{ApiError, HttpSiteApi, SiteApi, SiteId};
pub use config::ConsoleConfig;
pub use controller::TabController;
pub use draft::{ContextKey, DraftStore, KeyResolver};
pub use events::{EventBus, LifecycleEvent};
pub use fields::FieldMap;
pub use form::{FormBinding, MemoryForm};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use overlay::{OverlayLoader, OverlaySet, ReloadOutcome};
pub use persist::{SaveContext, TabSaver};
pub use save::{FinalSaveOrchestrator, SaveError, SaveOutcome, SaveStage};
pub use tab::Tab;
