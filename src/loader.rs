//! Pre-compilation processing of a test style sheet.
//!
//! [`process`] is the step a host build hook runs per file: parse the sheet,
//! defuse its `@error` directives, serialize it back, and emit a test-module
//! source fragment that hands the rewritten text to the execution entry
//! point. The fragment references either the published package or a local
//! checkout, selected by an environment flag; the switch affects only which
//! module the fragment names.

use std::env;
use std::path::Path;

use crate::errors::HarnessError;
use crate::rewrite;
use crate::stylesheet::StylesheetParser;

/// Set to `true` or `1` to make generated fragments reference the local
/// crate instead of the published package.
pub const LOCAL_DEBUG_ENV: &str = "STYLESPEC_LOCAL_DEBUG";

/// Which module the generated fragment imports the entry point from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Published,
    LocalDebug,
}

impl EntryPoint {
    pub fn from_env() -> Self {
        match env::var(LOCAL_DEBUG_ENV) {
            Ok(value) if value == "true" || value == "1" => EntryPoint::LocalDebug,
            _ => EntryPoint::Published,
        }
    }

    fn module_path(self) -> &'static str {
        match self {
            EntryPoint::Published => "stylespec",
            EntryPoint::LocalDebug => "crate",
        }
    }
}

/// Emits the generated test-module fragment: import the entry point, invoke
/// it with the rewritten source, the test directory, and the working
/// directory.
pub fn emit_test_module(
    rewritten: &str,
    test_dir: &Path,
    cwd: &Path,
    entry: EntryPoint,
) -> String {
    format!(
        "use {module}::run;\n\nrun(r##\"{rewritten}\"##, \"{test_dir}\", \"{cwd}\");\n",
        module = entry.module_path(),
        rewritten = rewritten,
        test_dir = test_dir.display(),
        cwd = cwd.display(),
    )
}

/// Parses, rewrites, and wraps one test sheet.
pub fn process<P: StylesheetParser>(
    source: &str,
    file_path: &Path,
    cwd: &Path,
    parser: &P,
    entry: EntryPoint,
) -> Result<String, HarnessError> {
    let mut tree = parser.parse(source)?;
    rewrite::stub_error_directives(&mut tree)?;
    let rewritten = tree.to_string();

    let test_dir = file_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(emit_test_module(&rewritten, test_dir, cwd, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::{Node, NodeKind};

    /// Parser stand-in that treats the whole source as one raw leaf; enough
    /// for loader plumbing, which never looks inside.
    struct RawParser;

    impl StylesheetParser for RawParser {
        fn parse(&self, source: &str) -> Result<Node, HarnessError> {
            Ok(Node::container(
                NodeKind::Stylesheet,
                vec![Node::raw(source)],
            ))
        }
    }

    #[test]
    fn fragment_references_the_published_package_by_default() {
        let fragment = process(
            ".a { color: red; }",
            Path::new("suite/math.test.scss"),
            Path::new("/project"),
            &RawParser,
            EntryPoint::Published,
        )
        .unwrap();
        assert!(fragment.starts_with("use stylespec::run;"));
        assert!(fragment.contains(".a { color: red; }"));
        assert!(fragment.contains("\"suite\""));
        assert!(fragment.contains("\"/project\""));
    }

    #[test]
    fn local_debug_entry_point_changes_only_the_module_path() {
        let published = emit_test_module(
            "x",
            Path::new("t"),
            Path::new("."),
            EntryPoint::Published,
        );
        let local = emit_test_module("x", Path::new("t"), Path::new("."), EntryPoint::LocalDebug);
        assert_eq!(
            published.replace("use stylespec::run;", "use crate::run;"),
            local
        );
    }

    #[test]
    fn entry_point_env_switch() {
        env::remove_var(LOCAL_DEBUG_ENV);
        assert_eq!(EntryPoint::from_env(), EntryPoint::Published);
        env::set_var(LOCAL_DEBUG_ENV, "true");
        assert_eq!(EntryPoint::from_env(), EntryPoint::LocalDebug);
        env::set_var(LOCAL_DEBUG_ENV, "no");
        assert_eq!(EntryPoint::from_env(), EntryPoint::Published);
        env::remove_var(LOCAL_DEBUG_ENV);
    }
}
