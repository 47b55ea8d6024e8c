// Domain-specific error types
pub mod errors;

// Feature vectors fed into predictors
pub mod features;

// Forecast, decision and backtest value objects
pub mod forecast;

// Currency pair and forecast horizon
pub mod horizon;
pub mod pair;

// Price bars and the economic calendar
pub mod market;

// Port interfaces to external collaborators
pub mod ports;

// News sentiment records and aggregates
pub mod sentiment;
