//! HTTP API handlers for krishi-ai

pub mod diseases;
pub mod health;
pub mod history;
pub mod predict;

pub use diseases::disease_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use predict::predict_routes;
