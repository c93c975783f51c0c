//! HTML entries of the renderer.
//!
//! An HTML input contributes its `<script type="module" src>` tags as
//! script entries. After bundling the page is emitted next to the output
//! with each tag pointing at the chunk built from it.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugins::util::to_relative_path;
use crate::presets::path_string;

static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b([^>]*)>").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b([a-z][a-z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});

/// A module script referenced by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlScript {
    /// `src` as written in the page.
    pub src: String,
    /// Absolute path of the script.
    pub path: PathBuf,
}

/// A page taking part in a renderer build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlEntry {
    /// Absolute path of the source page.
    pub path: PathBuf,
    /// Output file name relative to the output directory, e.g. `index.html`.
    pub file_name: String,
    pub source: String,
    pub scripts: Vec<HtmlScript>,
}

impl HtmlEntry {
    /// Read `path` and collect its module scripts.
    ///
    /// Absolute `src` values are resolved against `root`, relative ones
    /// against the page's directory. Remote scripts are left alone.
    pub fn load(path: &Path, root: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or(root);

        let scripts = module_script_sources(&source)
            .into_iter()
            .filter(|src| !is_remote(src))
            .map(|src| {
                let resolved = match src.strip_prefix('/') {
                    Some(rooted) => root.join(rooted),
                    None => dir.join(&src),
                };
                HtmlScript {
                    path: path_clean::clean(resolved),
                    src,
                }
            })
            .collect();

        let file_name = path
            .strip_prefix(root)
            .map(path_string)
            .unwrap_or_else(|_| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "index.html".to_string())
            });

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            source,
            scripts,
        })
    }

    /// The page with every module script pointing at its output chunk.
    ///
    /// `chunk_for` maps a script's absolute path to the chunk file name.
    pub fn render(&self, base: &str, chunk_for: impl Fn(&Path) -> Option<String>) -> String {
        let replacements: Vec<(String, String)> = self
            .scripts
            .iter()
            .filter_map(|script| {
                let chunk = chunk_for(&script.path)?;
                Some((script.src.clone(), chunk_url(base, &self.file_name, &chunk)))
            })
            .collect();
        rewrite_script_sources(&self.source, &replacements)
    }
}

/// `src` of every `<script type="module">` tag, in document order.
pub fn module_script_sources(html: &str) -> Vec<String> {
    SCRIPT_TAG
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let is_module = attribute(attrs, "type").is_some_and(|t| t == "module");
            if !is_module {
                return None;
            }
            attribute(attrs, "src").filter(|src| !src.is_empty())
        })
        .collect()
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTRIBUTE.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|value| value.as_str().to_string())
    })
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://") || src.starts_with("//")
}

/// URL of `chunk` as referenced from the page `html_file`.
///
/// A relative base (`./` or empty) yields a path relative to the page.
pub fn chunk_url(base: &str, html_file: &str, chunk: &str) -> String {
    if base.is_empty() || base == "./" || base == "." {
        return to_relative_path(chunk, html_file);
    }
    format!("{}/{}", base.trim_end_matches('/'), chunk)
}

/// Swap `src` values of module script tags.
fn rewrite_script_sources(html: &str, replacements: &[(String, String)]) -> String {
    if replacements.is_empty() {
        return html.to_string();
    }

    SCRIPT_TAG
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            let attrs = &caps[1];
            let Some(src) = attribute(attrs, "src") else {
                return tag.to_string();
            };
            match replacements.iter().find(|(from, _)| *from == src) {
                Some((_, to)) => tag
                    .replacen(&format!("\"{src}\""), &format!("\"{to}\""), 1)
                    .replacen(&format!("'{src}'"), &format!("'{to}'"), 1),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

/// Inject a script tag right before `</body>`, or at the end.
pub fn inject_script(html: &str, tag: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => {
            let mut result = String::with_capacity(html.len() + tag.len() + 4);
            result.push_str(&html[..pos]);
            result.push_str("  ");
            result.push_str(tag);
            result.push('\n');
            result.push_str(&html[pos..]);
            result
        }
        None => format!("{html}\n{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <script src="/legacy.js"></script>
    <script type="module" src="/src/main.ts"></script>
    <script type='module' src='./extra.ts'></script>
    <script type="module" src="https://cdn.example.com/lib.js"></script>
  </head>
  <body><div id="app"></div></body>
</html>
"#;

    #[test]
    fn collects_module_scripts_only() {
        assert_eq!(
            module_script_sources(PAGE),
            vec![
                "/src/main.ts".to_string(),
                "./extra.ts".to_string(),
                "https://cdn.example.com/lib.js".to_string()
            ]
        );
    }

    #[test]
    fn loads_and_renders_a_page() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("src/renderer");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), PAGE).unwrap();

        let entry = HtmlEntry::load(&root.join("index.html"), &root).unwrap();
        assert_eq!(entry.file_name, "index.html");
        assert_eq!(entry.scripts.len(), 2);
        assert_eq!(entry.scripts[0].path, root.join("src/main.ts"));
        assert_eq!(entry.scripts[1].path, root.join("extra.ts"));

        let main = root.join("src/main.ts");
        let html = entry.render("./", |path| {
            (path == main).then(|| "assets/main-abc123.js".to_string())
        });
        assert!(html.contains(r#"<script type="module" src="./assets/main-abc123.js"></script>"#));
        assert!(html.contains(r#"<script type='module' src='./extra.ts'></script>"#));
        assert!(html.contains(r#"<script src="/legacy.js"></script>"#));
    }

    #[test]
    fn absolute_base_prefixes_chunks() {
        assert_eq!(chunk_url("/", "index.html", "assets/a.js"), "/assets/a.js");
        assert_eq!(chunk_url("./", "pages/about.html", "assets/a.js"), "../assets/a.js");
        assert_eq!(chunk_url("", "index.html", "assets/a.js"), "./assets/a.js");
    }

    #[test]
    fn injects_before_closing_body() {
        let html = inject_script("<html><body><h1>x</h1></body></html>", "<script src=\"/r.js\"></script>");
        let script = html.find("/r.js").unwrap();
        assert!(script < html.find("</body>").unwrap());
        assert!(inject_script("<p>no body</p>", "<b></b>").ends_with("<b></b>"));
    }
}
