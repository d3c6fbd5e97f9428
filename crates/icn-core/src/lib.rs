//! Core congestion-control components for a pull-based, name-addressed
//! packet network (interest/content/NACK) running over a single-threaded
//! discrete-event simulation.
//!
//! Key components:
//! - [`clock`] — monotonic simulated time and a scheduler facade over a closed timer-event set
//! - [`packet`] — interest/content/NACK packet representation and sojourn tags
//! - [`face`] — bi-directional link endpoint wrapping a per-face [`shaper`]
//! - [`shaper`] — per-face interest pacing and AQM (DropTail/PIE/CoDel)
//! - [`strategy`] — congestion-aware forwarding strategy over a FIB entry
//! - [`consumer`] — rate-feedback consumer with producer-rate feedback
//! - [`config`] — TOML-based configuration for all of the above

pub mod clock;
pub mod config;
pub mod consumer;
pub mod error;
pub mod face;
pub mod packet;
pub mod shaper;
pub mod strategy;

pub use clock::{Scheduler, Time};
pub use config::{AqmModeInput as AqmMode, ShaperConfig};
pub use error::{AqmKind, DropReason};
pub use packet::{NackCode, Packet, PacketKind};
pub use shaper::Shaper;

/// Installs a default `tracing` subscriber (env-filter based) if no subscriber
/// is already set. Safe to call multiple times — subsequent calls are no-ops.
/// Controlled by `RUST_LOG` (e.g. `RUST_LOG=icn_core=debug`).
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            tracing::info!("icn-core: tracing subscriber already set");
            return;
        }
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_target(true)
            .compact()
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::info!("icn-core initialized");
        }
    });
}
