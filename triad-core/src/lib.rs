//! Triad Core: quarter liquidity tracking, SMT/PSP divergence and replay.
//!
//! This crate contains the whole engine:
//! - Boundary calendar (New York trading-day buckets at six scales)
//! - Per-instrument state advanced one 15m candle at a time
//! - Divergence engine over three instruments (SMT, PSP, targets, true opens)
//! - Pure diffs between consecutive ticks
//! - Single-threaded replay loop driving pluggable strategies

pub mod asset;
pub mod calendar;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod replay;
pub mod triad;

pub use asset::Asset;
pub use config::TriadConfig;
pub use domain::Candle;
pub use error::{CoreError, Result};
pub use replay::{fronttest, FnStrategy, Strategy, TickContext, TriadFeed};
pub use triad::{Snapshot, Triad};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine state and derived views are Send + Sync, so
    /// independent replays can each own a triad on their own thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Candle>();
        require_sync::<Candle>();
        require_send::<Asset>();
        require_sync::<Asset>();
        require_send::<Triad>();
        require_sync::<Triad>();
        require_send::<Snapshot>();
        require_sync::<Snapshot>();
        require_send::<triad::Target>();
        require_sync::<triad::Target>();
        require_send::<triad::TrueOpens>();
        require_sync::<triad::TrueOpens>();
        require_send::<diff::DivergenceDiff>();
        require_sync::<diff::DivergenceDiff>();
        require_send::<diff::TargetDiff>();
        require_sync::<diff::TargetDiff>();
        require_send::<replay::TickState>();
        require_sync::<replay::TickState>();
        require_send::<TriadConfig>();
        require_sync::<TriadConfig>();
        require_send::<CoreError>();
        require_sync::<CoreError>();
    }

    /// Architecture contract: strategies only ever see shared views.
    ///
    /// `TickContext` holds `&Triad`, so neither callback can advance or mutate
    /// the engine. If the context ever grows a `&mut`, this stops compiling.
    #[test]
    fn strategies_cannot_mutate_the_triad() {
        fn _reads_only<'a>(ctx: &TickContext<'a>) -> &'a Triad {
            ctx.triad
        }
    }
}
