//! The module capability: something that configures a [`RenderPipeline`].

use crate::engine::RenderPipeline;
use crate::error::RenderError;

/// A pluggable unit of templates, partials and styles.
///
/// Given a pipeline, a module returns it configured: typically by loading a
/// parent module and merging one or more [`bootprint_core::ConfigLayer`]s.
/// Any `Fn(RenderPipeline) -> Result<RenderPipeline, RenderError>` is a module.
pub trait Module: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }

    fn build(&self, pipeline: RenderPipeline) -> Result<RenderPipeline, RenderError>;
}

impl<F> Module for F
where
    F: Fn(RenderPipeline) -> Result<RenderPipeline, RenderError> + Send + Sync,
{
    fn build(&self, pipeline: RenderPipeline) -> Result<RenderPipeline, RenderError> {
        self(pipeline)
    }
}
