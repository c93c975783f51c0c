//! CommonJS globals for ES module chunks.
//!
//! Dependencies bundled into an ESM chunk may still use `__dirname`,
//! `__filename` or `require`. When a chunk mentions any of them, a shim is
//! placed right after its last static import.

use async_trait::async_trait;
use regex::Regex;

use super::{Enforce, RenderContext, TargetPlugin};
use crate::engine::ChunkFile;
use crate::error::Result;

const CJS_SHIM: &str = "
// -- CommonJS Shims --
import __cjs_url__ from 'node:url';
import __cjs_path__ from 'node:path';
import __cjs_mod__ from 'node:module';
const __filename = __cjs_url__.fileURLToPath(import.meta.url);
const __dirname = __cjs_path__.dirname(__filename);
const require = __cjs_mod__.createRequire(import.meta.url);
";

const CJS_SHIM_IMPORT_META_PATHS: &str = "
// -- CommonJS Shims --
import __cjs_mod__ from 'node:module';
const __filename = import.meta.filename;
const __dirname = import.meta.dirname;
const require = __cjs_mod__.createRequire(import.meta.url);
";

const CJS_SYNTAX: &str = r"__filename|__dirname|require\(|require\.resolve\(";

const STATIC_IMPORT: &str = r#"(?m)(?:^|[\s;])import\s*(?:[\s"']*[\p{L}\p{M}\w\t\n\r $*,/{}@.]+from\s*)?(?:"\s*[^"\s][^"]*"|'\s*[^'\s][^']*')[\s;]*"#;

/// Shim text for the runtime. Node 20.11+ (Electron 30+) has
/// `import.meta.filename` and `import.meta.dirname`.
pub fn cjs_shim(import_meta_paths: bool) -> &'static str {
    if import_meta_paths {
        CJS_SHIM_IMPORT_META_PATHS
    } else {
        CJS_SHIM
    }
}

/// End offset of the last static import statement in `code`.
fn last_static_import_end(code: &str) -> Option<usize> {
    let re = Regex::new(STATIC_IMPORT).ok()?;
    re.find_iter(code).last().map(|m| m.end())
}

/// Insert `shim` into `code` if it uses CommonJS globals and is not shimmed yet.
pub fn insert_shim(code: &str, shim: &str) -> Option<String> {
    if code.contains(shim) {
        return None;
    }
    let uses_cjs = Regex::new(CJS_SYNTAX).ok()?.is_match(code);
    if !uses_cjs {
        return None;
    }

    let at = last_static_import_end(code).unwrap_or(0);
    let mut shimmed = String::with_capacity(code.len() + shim.len());
    shimmed.push_str(&code[..at]);
    shimmed.push_str(shim);
    shimmed.push_str(&code[at..]);
    Some(shimmed)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EsmShimPlugin;

#[async_trait]
impl TargetPlugin for EsmShimPlugin {
    fn name(&self) -> &'static str {
        "fob-electron:esm-shim"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Post
    }

    fn render_chunk(&self, chunk: &mut ChunkFile, ctx: &RenderContext<'_>) -> Result<()> {
        if !ctx.build.is_es() {
            return Ok(());
        }
        let shim = cjs_shim(ctx.build.preset.facts.supports_import_meta_paths());
        if let Some(code) = insert_shim(&chunk.code, shim) {
            chunk.code = code;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::BuildContext;
    use crate::presets::test_support::context;
    use crate::target::TargetKind;
    use fob_electron_config::TargetConfig;
    use rustc_hash::FxHashMap;
    use tempfile::TempDir;

    #[test]
    fn shim_goes_after_the_last_static_import() {
        let code = "import { app } from 'electron';\nimport path from \"node:path\";\nconsole.log(__dirname);\n";
        let shimmed = insert_shim(code, cjs_shim(true)).unwrap();
        insta::assert_snapshot!(shimmed, @r#"
        import { app } from 'electron';
        import path from "node:path";

        // -- CommonJS Shims --
        import __cjs_mod__ from 'node:module';
        const __filename = import.meta.filename;
        const __dirname = import.meta.dirname;
        const require = __cjs_mod__.createRequire(import.meta.url);
        console.log(__dirname);
        "#);
    }

    #[test]
    fn shim_goes_first_without_imports() {
        let code = "const x = require('fs');\n";
        let shimmed = insert_shim(code, cjs_shim(false)).unwrap();
        assert!(shimmed.starts_with("\n// -- CommonJS Shims --\nimport __cjs_url__ from 'node:url';"));
        assert!(shimmed.ends_with("const x = require('fs');\n"));
    }

    #[test]
    fn not_inserted_twice() {
        let code = "import a from 'a';\nrequire('x');\n";
        let once = insert_shim(code, cjs_shim(true)).unwrap();
        assert!(insert_shim(&once, cjs_shim(true)).is_none());
    }

    #[test]
    fn not_inserted_without_cjs_globals() {
        assert!(insert_shim("import a from 'a';\nexport default a;\n", cjs_shim(true)).is_none());
    }

    #[test]
    fn dynamic_imports_do_not_count_as_static() {
        let code = "import a from 'a';\nconst b = await import('b');\nrequire('c');\n";
        let shimmed = insert_shim(code, cjs_shim(true)).unwrap();
        let shim_at = shimmed.find("// -- CommonJS Shims --").unwrap();
        assert!(shim_at < shimmed.find("await import").unwrap());
    }

    #[test]
    fn cjs_chunks_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let preset = context(TargetKind::Main, dir.path(), Some(31), false);
        let build = BuildContext::new(&TargetConfig::default(), &preset);
        let entries = FxHashMap::default();
        let mut chunk = ChunkFile {
            file_name: "index.js".into(),
            code: "console.log(__dirname)".into(),
            ..Default::default()
        };
        EsmShimPlugin
            .render_chunk(&mut chunk, &RenderContext::new(&build, &entries))
            .unwrap();
        assert_eq!(chunk.code, "console.log(__dirname)");
    }
}
