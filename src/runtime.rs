use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::sync::Once;

static INIT: Once = Once::new();

/// Graph optimization applied when a backbone session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    Full,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::Full => GraphOptimizationLevel::Level3,
        }
    }
}

/// ONNX Runtime settings for backbone sessions. Thread counts of zero let
/// the runtime decide.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

/// Initializes the process-wide ONNX Runtime environment exactly once.
pub fn ensure_initialized() -> OrtResult<()> {
    INIT.call_once(|| {
        ort::init()
            .with_name(env!("CARGO_PKG_NAME"))
            .commit()
            .expect("Failed to initialize ONNX Runtime environment");
    });
    Ok(())
}

pub fn create_session_builder(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    ensure_initialized()?;
    let mut builder = Session::builder()?
        .with_optimization_level(config.optimization_level.into())?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_optimization_level_mapping() {
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::Disable),
            GraphOptimizationLevel::Disable
        ));
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::Full),
            GraphOptimizationLevel::Level3
        ));
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::default()),
            GraphOptimizationLevel::Level3
        ));
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: OptimizationLevel::Basic,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }
}
