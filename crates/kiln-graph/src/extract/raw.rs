use super::{SourceUnit, Transform, TransformContext, TransformError, TransformOutput};

/// Passthrough for content without references (images, fonts, JSON data).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTransform;

impl Transform for RawTransform {
    fn transform(
        &self,
        unit: &SourceUnit<'_>,
        _ctx: &TransformContext<'_>,
    ) -> Result<TransformOutput, TransformError> {
        Ok(TransformOutput {
            code: unit.content.to_vec(),
            ..TransformOutput::default()
        })
    }
}
