//! Best-effort location of a named test inside a source file.
//!
//! This is line matching, not parsing. A test is found by its quoted name
//! (`it('name', ...)`, `test("name", ...)`) or a declaration such as
//! `fn name(` / `def name(`. The span ends where the brace depth returns
//! to zero, or for indentation-delimited code where the indentation drops
//! back. Nested or overlapping tests with the same name are reported as
//! ambiguous rather than silently picked.

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found(String),
    /// Several declarations match; `code` is the first of them.
    Ambiguous { code: String, matches: usize },
    NotFound,
}

/// Find the source span of `test_name` in `content`.
#[must_use]
pub fn locate(content: &str, test_name: &str) -> Located {
    let lines: Vec<&str> = content.lines().collect();
    let starts = declaration_lines(&lines, test_name);

    match starts.as_slice() {
        [] => Located::NotFound,
        [only] => Located::Found(span(&lines, *only)),
        [first, ..] => Located::Ambiguous {
            code: span(&lines, *first),
            matches: starts.len(),
        },
    }
}

fn declaration_lines(lines: &[&str], test_name: &str) -> Vec<usize> {
    if test_name.trim().is_empty() {
        return Vec::new();
    }
    let quoted = [
        format!("'{test_name}'"),
        format!("\"{test_name}\""),
        format!("`{test_name}`"),
    ];
    let declared = Regex::new(&format!(
        r"\b(?:fn|def|func|function)\s+{}\s*[(<]",
        regex::escape(test_name)
    ))
    .ok();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            quoted.iter().any(|q| line.contains(q.as_str()))
                || declared.as_ref().is_some_and(|re| re.is_match(line))
        })
        .map(|(i, _)| i)
        .collect()
}

fn span(lines: &[&str], start: usize) -> String {
    let end = brace_end(lines, start).unwrap_or_else(|| indent_end(lines, start));
    lines[start..=end].join("\n")
}

/// Last line of a brace-delimited block opened at or after `start`.
fn brace_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return Some(i);
        }
        // A declaration line with no brace at all is not brace-delimited.
        if !opened && i == start && !line.trim_end().ends_with(['(', ',']) {
            return None;
        }
    }
    opened.then(|| lines.len() - 1)
}

/// Last line indented deeper than `start`, for Python-style blocks.
fn indent_end(lines: &[&str], start: usize) -> usize {
    let base = indentation(lines[start]);
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indentation(line) <= base {
            break;
        }
        end = i;
    }
    end
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "\
import { connect } from 'lib';

describe('client', () => {
  it('connects to the server', async () => {
    const c = await connect();
    if (c) {
      c.close();
    }
  });

  it('sends a message', () => {
    send('hi');
  });
});
";

    #[test]
    fn finds_a_quoted_test_by_braces() {
        let Located::Found(code) = locate(TS, "connects to the server") else {
            panic!("expected a single match");
        };
        assert!(code.starts_with("  it('connects to the server'"));
        assert!(code.contains("c.close();"));
        assert!(code.ends_with("  });"));
        assert!(!code.contains("sends a message"));
    }

    #[test]
    fn finds_python_tests_by_indentation() {
        let py = "\
import lib

def test_connects():
    client = lib.connect()

    assert client.ready

def test_other():
    pass
";
        let Located::Found(code) = locate(py, "test_connects") else {
            panic!("expected a single match");
        };
        assert_eq!(code.lines().count(), 4);
        assert!(!code.contains("test_other"));
    }

    #[test]
    fn finds_rust_test_functions() {
        let rs = "\
#[test]
fn parses_input() {
    let v = parse(\"1\");
    assert_eq!(v, 1);
}
";
        let Located::Found(code) = locate(rs, "parses_input") else {
            panic!("expected a single match");
        };
        assert!(code.starts_with("fn parses_input()"));
        assert!(code.ends_with('}'));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let src = "it('works', () => { a(); });\nit('works', () => { b(); });\n";
        match locate(src, "works") {
            Located::Ambiguous { code, matches } => {
                assert_eq!(matches, 2);
                assert!(code.contains("a();"));
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        assert_eq!(locate(TS, "does not exist"), Located::NotFound);
        assert_eq!(locate(TS, ""), Located::NotFound);
    }
}
