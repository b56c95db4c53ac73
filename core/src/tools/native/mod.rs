pub mod gpu;

pub use gpu::{BestValueTool, MarketPricesTool, TechnicalSpecsTool};
