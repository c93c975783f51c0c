use async_trait::async_trait;
use rolldown::BundlerOptions;
use rolldown_common::{BundlerTransformOptions, DecoratorOptions};

use super::{BuildContext, TargetPlugin};

/// Legacy TypeScript decorators with `design:*` metadata, for frameworks
/// such as TypeORM or InversifyJS.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecoratorsPlugin;

#[async_trait]
impl TargetPlugin for DecoratorsPlugin {
    fn name(&self) -> &'static str {
        "fob-electron:decorators"
    }

    fn options(&self, options: &mut BundlerOptions, _ctx: &BuildContext) {
        let transform = options
            .transform
            .get_or_insert_with(BundlerTransformOptions::default);
        transform.decorator = Some(DecoratorOptions {
            legacy: Some(true),
            emit_decorator_metadata: Some(true),
        });
    }
}
