//! Three lazy candle feeds pulled in lockstep.

use crate::domain::Candle;
use crate::error::{CoreError, Result};

/// Zips one ascending feed per instrument. Running dry is an error, not the
/// end of a replay.
pub struct TriadFeed<I> {
    symbols: [String; 3],
    feeds: [I; 3],
    served: usize,
}

impl<I> TriadFeed<I>
where
    I: Iterator<Item = Candle>,
{
    pub fn new(symbols: [&str; 3], feeds: [I; 3]) -> Self {
        Self {
            symbols: symbols.map(str::to_string),
            feeds,
            served: 0,
        }
    }

    /// Triples handed out so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Next candle of each instrument. Timestamps are checked by the triad.
    pub fn next_triple(&mut self) -> Result<[Candle; 3]> {
        let triple = [self.pull(0)?, self.pull(1)?, self.pull(2)?];
        self.served += 1;
        Ok(triple)
    }

    fn pull(&mut self, k: usize) -> Result<Candle> {
        self.feeds[k].next().ok_or_else(|| CoreError::FeedExhausted {
            symbol: self.symbols[k].clone(),
            served: self.served,
        })
    }
}
