pub mod advisor;
pub mod backtest;
pub mod features;
pub mod fusion;
pub mod policy;
pub mod predictor;
pub mod sentiment;
