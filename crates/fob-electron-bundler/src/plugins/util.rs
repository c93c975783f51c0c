//! Helpers shared by the post-processors.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

/// Strip the query string and hash from a module id.
pub fn clean_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Query parameters of a module id, or `None` when it has no query.
///
/// Flags without a value, like `?asset`, map to an empty string.
pub fn parse_request(id: &str) -> Option<HashMap<String, String>> {
    let without_hash = &id[..id.find('#').unwrap_or(id.len())];
    let (_, query) = without_hash.split_once('?')?;
    if query.is_empty() {
        return None;
    }

    Some(
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect(),
    )
}

/// First eight hex digits of the SHA-256 of `text`.
pub fn get_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Path of `filename` as seen from the directory of `importer`.
///
/// Both are `/`-separated. The result always starts with `.`, so it can be
/// handed to `require` or `new URL` as a relative specifier.
pub fn to_relative_path(filename: &str, importer: &str) -> String {
    let from = Path::new(importer).parent().unwrap_or(Path::new(""));
    let relative = relative_path(from, Path::new(filename));
    let relative = relative.to_string_lossy().replace('\\', "/");
    if relative.starts_with('.') {
        relative
    } else {
        format!("./{relative}")
    }
}

fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().filter(|c| *c != Component::CurDir).collect();
    let to: Vec<Component<'_>> = to.components().filter(|c| *c != Component::CurDir).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// Replace every `<prefix><key>__` marker in `code`.
///
/// Keys are made of word characters and `$`. Markers whose key `resolve`
/// does not know are left as they are. Returns `None` when nothing changed.
pub fn replace_markers(
    code: &str,
    prefix: &str,
    mut resolve: impl FnMut(&str) -> Option<String>,
) -> Option<String> {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    let mut changed = false;

    while let Some(start) = rest.find(prefix) {
        let after = &rest[start + prefix.len()..];
        let key_len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        let candidate = &after[..key_len];

        let marker = candidate
            .strip_suffix("__")
            .filter(|key| !key.is_empty())
            .and_then(|key| resolve(key).map(|replacement| (key.len() + 2, replacement)));

        match marker {
            Some((consumed, replacement)) => {
                out.push_str(&rest[..start]);
                out.push_str(&replacement);
                rest = &after[consumed..];
                changed = true;
            }
            None => {
                out.push_str(&rest[..start + prefix.len()]);
                rest = after;
            }
        }
    }

    if !changed {
        return None;
    }
    out.push_str(rest);
    Some(out)
}

/// JS string literal for a path.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// `true` for ids rolldown hands to JavaScript or TypeScript loaders.
pub fn is_script_id(id: &str) -> bool {
    let path = clean_url(id);
    [".js", ".mjs", ".cjs", ".ts", ".mts", ".cts", ".jsx", ".tsx"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Resolve a relative or absolute specifier against the importing module.
pub fn resolve_from_importer(specifier: &str, importer: Option<&str>, root: &Path) -> Option<PathBuf> {
    let path = Path::new(specifier);
    if path.is_absolute() {
        return Some(path_clean::clean(path));
    }
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let base = importer
        .map(clean_url)
        .and_then(|importer| Path::new(importer).parent().map(Path::to_path_buf))
        .unwrap_or_else(|| root.to_path_buf());
    Some(path_clean::clean(base.join(path)))
}

/// `path` itself when it exists, else the first sibling with a script extension.
pub fn probe_module(path: PathBuf) -> PathBuf {
    if path.is_file() {
        return path;
    }
    ["ts", "js", "mts", "mjs", "cts", "cjs", "tsx", "jsx"]
        .iter()
        .map(|ext| {
            let mut candidate = path.clone().into_os_string();
            candidate.push(".");
            candidate.push(ext);
            PathBuf::from(candidate)
        })
        .find(|candidate| candidate.is_file())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_url_drops_query_and_hash() {
        assert_eq!(clean_url("./icon.png?asset&asarUnpack"), "./icon.png");
        assert_eq!(clean_url("./a.js#frag"), "./a.js");
        assert_eq!(clean_url("./plain.js"), "./plain.js");
    }

    #[test]
    fn parse_request_reads_flags_and_values() {
        let query = parse_request("./icon.png?asset&asarUnpack").unwrap();
        assert_eq!(query.get("asset").map(String::as_str), Some(""));
        assert!(query.contains_key("asarUnpack"));

        let query = parse_request("./w.ts?nodeWorker&importer=/a/b.ts").unwrap();
        assert_eq!(query["importer"], "/a/b.ts");

        assert!(parse_request("./plain.ts").is_none());
        assert!(parse_request("./plain.ts?").is_none());
    }

    #[test]
    fn hash_is_eight_hex_digits() {
        let hash = get_hash("/project/resources/icon.png");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, get_hash("/project/resources/icon.png"));
    }

    #[test]
    fn relative_paths_always_start_with_dot() {
        assert_eq!(to_relative_path("chunks/icon.png", "index.js"), "./chunks/icon.png");
        assert_eq!(to_relative_path("icon.png", "chunks/worker.js"), "../icon.png");
        assert_eq!(to_relative_path("chunks/a.js", "chunks/b.js"), "./a.js");
        assert_eq!(
            to_relative_path("/app/resources/icon.png", "/app/out/main/index.js"),
            "../../resources/icon.png"
        );
    }

    #[test]
    fn markers_are_replaced_and_unknown_ones_kept() {
        let code = r#"const a = __FOB_X__abc__; const b = __FOB_X__zzz__;"#;
        let out = replace_markers(code, "__FOB_X__", |key| {
            (key == "abc").then(|| "\"./a.png\"".to_string())
        })
        .unwrap();
        assert_eq!(out, r#"const a = "./a.png"; const b = __FOB_X__zzz__;"#);
        assert!(replace_markers("nothing here", "__FOB_X__", |_| None).is_none());
    }

    #[test]
    fn probe_adds_missing_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("worker.ts"), "").unwrap();
        assert_eq!(probe_module(dir.path().join("worker")), dir.path().join("worker.ts"));
        assert_eq!(probe_module(dir.path().join("missing")), dir.path().join("missing"));
    }

    #[test]
    fn importer_relative_resolution() {
        let root = Path::new("/app");
        assert_eq!(
            resolve_from_importer("./worker.ts", Some("/app/src/main/index.ts"), root),
            Some(PathBuf::from("/app/src/main/worker.ts"))
        );
        assert_eq!(
            resolve_from_importer("../../resources/icon.png", Some("/app/src/main/index.ts"), root),
            Some(PathBuf::from("/app/resources/icon.png"))
        );
        assert_eq!(resolve_from_importer("lodash", Some("/app/src/main/index.ts"), root), None);
    }
}
