use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use regex::{Captures, Regex};
use rolldown_plugin::__inner::SharedPluginable;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};

use super::util::is_script_id;
use super::{BuildContext, TargetPlugin};

/// CommonJS replacements for `import.meta` properties Node does not provide there.
fn cjs_replacement(property: &str) -> Option<&'static str> {
    match property {
        "url" => Some(r#"require("url").pathToFileURL(__filename).href"#),
        "filename" => Some("__filename"),
        "dirname" => Some("__dirname"),
        _ => None,
    }
}

/// Rewrite `import.meta.{url,filename,dirname}` for CommonJS output.
pub fn rewrite_import_meta(code: &str) -> Option<String> {
    if !code.contains("import.meta.") {
        return None;
    }
    let re = Regex::new(r"\bimport\.meta\.(url|filename|dirname)\b").ok()?;
    if !re.is_match(code) {
        return None;
    }

    let rewritten = re.replace_all(code, |caps: &Captures<'_>| {
        cjs_replacement(&caps[1]).unwrap_or_default().to_string()
    });
    Some(rewritten.into_owned())
}

/// Makes `import.meta` usable in CommonJS Node bundles.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportMetaPlugin;

#[async_trait]
impl TargetPlugin for ImportMetaPlugin {
    fn name(&self) -> &'static str {
        "fob-electron:import-meta"
    }

    fn engine_plugin(&self, ctx: &BuildContext) -> Option<SharedPluginable> {
        if ctx.is_es() {
            return None;
        }
        Some(Arc::new(ImportMetaTransform))
    }
}

#[derive(Debug)]
struct ImportMetaTransform;

impl Plugin for ImportMetaTransform {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:import-meta")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let rewritten = is_script_id(args.id)
            .then(|| rewrite_import_meta(args.code))
            .flatten();

        async move {
            Ok(rewritten.map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
