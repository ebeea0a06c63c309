pub mod agent;

pub use agent::{AgentFeatures, BeliefStateAgent, BeliefView, RecoveryPolicy, TrackingMetrics};
