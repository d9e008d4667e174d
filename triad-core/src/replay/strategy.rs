//! The strategy contract of the replay loop.

use super::TickContext;
use chrono::{DateTime, Utc};
use std::marker::PhantomData;

/// A trading strategy driven tick by tick.
///
/// Trades are opaque to the engine. A strategy keeps no state of its own: all
/// it knows is the tick context and the active trades handed back to it.
pub trait Strategy {
    type Trade;

    /// Key of this strategy's closed trades in the replay result.
    fn name(&self) -> &str;

    /// Trades to open on this tick.
    fn open_trades(&self, ctx: &TickContext<'_>) -> Vec<Self::Trade>;

    /// Manages open trades. Returns `(still_active, closed)`. Once the cursor
    /// has reached `stop`, the replay ends after this call and anything still
    /// active is discarded.
    fn handle_trades(
        &self,
        stop: DateTime<Utc>,
        active: Vec<Self::Trade>,
        ctx: &TickContext<'_>,
    ) -> (Vec<Self::Trade>, Vec<Self::Trade>);
}

/// Adapts an `(opener, handler)` closure pair into a [`Strategy`].
pub struct FnStrategy<T, O, H> {
    name: String,
    opener: O,
    handler: H,
    _trade: PhantomData<fn() -> T>,
}

impl<T, O, H> FnStrategy<T, O, H>
where
    O: Fn(&TickContext<'_>) -> Vec<T>,
    H: Fn(DateTime<Utc>, Vec<T>, &TickContext<'_>) -> (Vec<T>, Vec<T>),
{
    pub fn new(name: impl Into<String>, opener: O, handler: H) -> Self {
        Self {
            name: name.into(),
            opener,
            handler,
            _trade: PhantomData,
        }
    }
}

impl<T, O, H> Strategy for FnStrategy<T, O, H>
where
    O: Fn(&TickContext<'_>) -> Vec<T>,
    H: Fn(DateTime<Utc>, Vec<T>, &TickContext<'_>) -> (Vec<T>, Vec<T>),
{
    type Trade = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn open_trades(&self, ctx: &TickContext<'_>) -> Vec<T> {
        (self.opener)(ctx)
    }

    fn handle_trades(&self, stop: DateTime<Utc>, active: Vec<T>, ctx: &TickContext<'_>) -> (Vec<T>, Vec<T>) {
        (self.handler)(stop, active, ctx)
    }
}
