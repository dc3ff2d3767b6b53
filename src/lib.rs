pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use datasource::{DefiLlamaPriceSource, MockPriceSource, PriceSource, PriceSourceError};
pub use domain::{
    ChainId, Decimal, EventKind, NumericError, PositionContext, PositionEvent, PositionHistory,
    Timestamp, Token, TokenId,
};
pub use engine::{EngineError, ProfitEngine, ProfitPoint, ProfitSeries};
pub use error::AppError;
