//! Domain types shared by every layer.

pub mod candle;

pub use candle::{
    base_step, on_grid, percent_from_current, Candle, CandleColor, BASE_RESOLUTION_MINUTES,
    MINUTE_FORMAT,
};
