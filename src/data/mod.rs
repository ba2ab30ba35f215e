//! Price, spread and pair data handling

pub mod fetcher;
pub mod pairs;
pub mod prices;
pub mod spread;
pub mod table;
pub mod tradable;

pub use fetcher::MarketDataFetcher;
pub use pairs::{find_hedge_ratio, load_pairs, CointegratedPair, PairKey};
pub use prices::PriceTable;
pub use spread::{calculate_spreads, SpreadTable};
pub use table::TimeTable;
pub use tradable::{filter_tradable_pairs, select_tradable};
