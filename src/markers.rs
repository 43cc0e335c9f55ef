//! The sentinel marker protocol and the deferred content resolver.
//!
//! A case that wants to assert about compiled *output* (rather than
//! compile-time values) registers a content assertion, receives a block
//! index, and emits its actual and expected text into its own compiled output
//! delimited by the markers below. After compilation the resolver scans the
//! final text once, left to right, and fills in each registered block.
//!
//! The marker text is a private wire format between the compiling run and
//! this resolver; it must round-trip byte-exact.
//!
//! ```css
//! /*0-start*/
//! /*output-start*/ actual text /*output-end*/
//! /*expect-start*/ expected text /*expect-end*/
//! /*0-end*/
//! ```

use crate::errors::HarnessError;
use crate::tree::ContentRegistry;

pub const OUTPUT_START: &str = "/*output-start*/";
pub const OUTPUT_END: &str = "/*output-end*/";
pub const EXPECT_START: &str = "/*expect-start*/";
pub const EXPECT_END: &str = "/*expect-end*/";

/// Start marker for content block `index`.
pub fn block_start(index: usize) -> String {
    format!("/*{index}-start*/")
}

/// End marker for content block `index`.
pub fn block_end(index: usize) -> String {
    format!("/*{index}-end*/")
}

/// Renders a full marker block in the canonical layout. Style sheets emit
/// this shape themselves; the harness uses it to build fixtures.
pub fn render_block(index: usize, actual: &str, expected: &str) -> String {
    format!(
        "{}\n{} {} {}\n{} {} {}\n{}\n",
        block_start(index),
        OUTPUT_START,
        actual,
        OUTPUT_END,
        EXPECT_START,
        expected,
        EXPECT_END,
        block_end(index),
    )
}

/// Resolves every registered content block against the compiled output.
///
/// Markers are consumed strictly left to right and never re-scanned, so
/// identical marker text for different indices cannot be confused. Every
/// registered index must resolve exactly once.
pub fn resolve_content_blocks(
    compiled: &str,
    registry: &mut ContentRegistry,
) -> Result<(), HarnessError> {
    let mut scanner = Scanner::new(compiled);

    for index in 0..registry.len() {
        scanner.skip_past(&block_start(index), index)?;
        let actual = scanner.capture_between(OUTPUT_START, OUTPUT_END, index)?;
        let expected = scanner.capture_between(EXPECT_START, EXPECT_END, index)?;
        scanner.skip_past(&block_end(index), index)?;
        registry.resolve(index, actual, expected)?;
    }

    let unresolved = registry.unresolved_count();
    if unresolved != 0 {
        return Err(HarnessError::block_count_mismatch(
            registry.len(),
            registry.len() - unresolved,
        ));
    }
    Ok(())
}

/// Single-pass cursor over the compiled text.
struct Scanner<'a> {
    text: &'a str,
    cursor: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, cursor: 0 }
    }

    /// Advances the cursor past the next occurrence of `marker`.
    fn skip_past(&mut self, marker: &str, block: usize) -> Result<(), HarnessError> {
        match self.text[self.cursor..].find(marker) {
            Some(offset) => {
                self.cursor += offset + marker.len();
                Ok(())
            }
            None => Err(HarnessError::marker_not_found(marker, block)),
        }
    }

    /// Consumes a `start`..`end` marker pair and returns the text between
    /// them, with one leading and one trailing delimiter character trimmed.
    fn capture_between(
        &mut self,
        start: &str,
        end: &str,
        block: usize,
    ) -> Result<String, HarnessError> {
        self.skip_past(start, block)?;
        let from = self.cursor;
        self.skip_past(end, block)?;
        let raw = &self.text[from..self.cursor - end.len()];
        Ok(trim_delimiters(raw).to_string())
    }
}

/// Strips the single delimiter character the marker format places on each
/// side of the payload. Only one character per side is removed; interior and
/// additional edge whitespace belongs to the payload.
fn trim_delimiters(raw: &str) -> &str {
    let raw = match raw.chars().next() {
        Some(first) if first.is_whitespace() => &raw[first.len_utf8()..],
        _ => raw,
    };
    match raw.chars().next_back() {
        Some(last) if last.is_whitespace() => &raw[..raw.len() - last.len_utf8()],
        _ => raw,
    }
}
