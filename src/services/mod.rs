pub mod coinmarketcap;
pub mod telegram;
