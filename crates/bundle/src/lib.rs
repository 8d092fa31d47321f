//! Incrementally reloaded, dependency-ordered bundles of script and style
//! sources.
//!
//! A [`Bundle`] tracks every source reachable from its entry points. Each
//! [`reload`](Bundle::reload) re-checks tracked sources against storage,
//! discovers newly declared dependencies, and publishes a new [`Snapshot`]
//! with dependencies ordered before their dependents. [`Live`] adds
//! subscribers that are told exactly what changed after every cycle.
//!
//! ```no_run
//! use livepkg_bundle::{Broadcaster, Bundle, Live, Loader};
//! use livepkg_extract::Extractor;
//! use livepkg_storage::backend::LocalBackend;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> livepkg_storage::error::Result<()> {
//! let backend = Arc::new(LocalBackend::new("site", "./site")?);
//! let bundle = Bundle::new(Loader::new(backend, Extractor::default()), ["/ui/main.js"]);
//! let live = Arc::new(Live::new(bundle, Broadcaster::new(64)));
//! let mut changes = live.subscribe();
//! live.spawn_monitor(Duration::from_millis(500));
//! while let Some(frame) = changes.recv().await {
//!     println!("{frame:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod broadcast;
mod change;
pub mod error;
mod include;
mod live;
mod load;
mod reload;
mod snapshot;
mod sort;
mod source;

pub use crate::broadcast::{Broadcaster, Delivery, Frame, Subscription};
pub use crate::change::Change;
pub use crate::include::Include;
pub use crate::live::Live;
pub use crate::load::{Loaded, Loader};
pub use crate::reload::{Bundle, Reloaded};
pub use crate::snapshot::{Info, Publisher, Snapshot};
pub use crate::sort::{Sorted, sort};
pub use crate::source::{Identity, Source, Transform};
