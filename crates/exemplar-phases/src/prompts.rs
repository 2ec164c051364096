//! Prompt text for the four LLM roles.

use exemplar_config::ExampleProfile;
use exemplar_llm::Message;

use crate::capabilities::{CandidateBlock, GenerationRequest, RefinementRequest};

/// Appended to every system prompt so answers parse as a single document.
const JSON_ONLY: &str = "
Respond with a single JSON document and nothing else. Do not wrap it in prose.
Use null for optional values you are not providing.";

const EXTRACTION_SCHEMA: &str = r#"{
  "blocks": [
    {
      "name": "exact test name as written in the file",
      "source_line_range": { "start": 1, "end": 20 },
      "features_tested": ["..."],
      "classification": "user-facing | internal | mixed",
      "use_case": "what a user would do with this, or null",
      "target_users": ["..."],
      "example_potential": "high | medium | low",
      "complexity": "simple | moderate | complex",
      "prerequisites": ["..."],
      "key_concepts": ["..."],
      "user_value": "why a user cares, or null"
    }
  ]
}"#;

const PLANNING_SCHEMA: &str = r#"{
  "examples": [
    {
      "title": "short imperative title",
      "summary": "one paragraph",
      "language": "implementation language",
      "complexity": "simple | moderate | complex",
      "example_potential": "high | medium",
      "prerequisites": ["..."],
      "run_instructions": "how to run it",
      "expected_output": ["lines the user should see"],
      "source_tests": [{ "file": "path exactly as given", "test_name": "name exactly as given" }],
      "artifacts_plan": [
        {
          "path": "relative path inside artifacts/",
          "type": "config | data | code | text",
          "action": "copy | generate",
          "source_path": "repo-relative path for copy, else null",
          "description": "what it is for"
        }
      ]
    }
  ]
}"#;

const BUNDLE_SCHEMA: &str = r#"{
  "main": "full contents of the entry file",
  "readme": "full contents of the README",
  "manifest": "full contents of the manifest",
  "config": "full contents of the config file, or null",
  "env_template": "full contents of the env template, or null"
}"#;

pub(crate) fn extraction(source_file: &str, content: &str) -> Vec<Message> {
    let system = format!(
        r"You analyse automated test files and describe each individual test case.
Classify every test by whether it demonstrates behaviour a library user would rely on
(user-facing), implementation details (internal) or both (mixed), and rate how good a
documentation example it would make.

Schema:
{EXTRACTION_SCHEMA}
{JSON_ONLY}"
    );
    let user = format!(
        "File: {source_file}\n\n```\n{}\n```\n\nList every test case in this file.",
        numbered(content)
    );
    vec![Message::system(system), Message::user(user)]
}

pub(crate) fn planning(candidates: &[CandidateBlock], profile: &ExampleProfile) -> Vec<Message> {
    let system = format!(
        r"You plan runnable documentation examples for a software library.
Group related test cases into examples a new user can run and learn from. Each example
must cite the tests it is based on using the exact file and test name provided. Prefer a
few focused examples over one example per test. Examples are written in {language}.

Schema:
{PLANNING_SCHEMA}
{JSON_ONLY}",
        language = profile.language
    );
    let listing = serde_json::to_string_pretty(candidates).unwrap_or_default();
    let user = format!("Candidate test cases:\n\n{listing}");
    vec![Message::system(system), Message::user(user)]
}

pub(crate) fn generation(request: &GenerationRequest) -> Vec<Message> {
    let profile = &request.profile;
    let dependency = match &request.package_name {
        Some(name) => format!(
            "The manifest must depend on `{name}` using a local reference starting with one of: {}.",
            profile.package_reference_prefixes.join(", ")
        ),
        None => "Depend on the library under test the way its own README suggests.".to_string(),
    };
    let module_type = profile
        .module_type
        .as_deref()
        .map(|t| format!("The manifest must declare \"type\": \"{t}\"."))
        .unwrap_or_default();
    let forbidden = if profile.forbidden_imports.is_empty() {
        String::new()
    } else {
        format!(
            "Never import these internal modules: {}.",
            profile.forbidden_imports.join(", ")
        )
    };

    let system = format!(
        r"You turn automated tests into a standalone, runnable {language} example project.
The entry file is {main}, the manifest is {manifest}, the README is {readme}.
Remove every trace of the test framework: no assertions, mocks, spies or suite
declarations. Print results instead of asserting them.
{dependency}
{module_type}
{forbidden}

Schema:
{BUNDLE_SCHEMA}
{JSON_ONLY}",
        language = profile.language,
        main = profile.main_file,
        manifest = profile.manifest_file,
        readme = profile.readme_file,
    );

    let mut user = format!(
        "Example plan:\n{}\n\nSource tests:\n",
        serde_json::to_string_pretty(&request.plan).unwrap_or_default()
    );
    for snippet in &request.sources {
        user.push_str(&format!(
            "\n--- {} :: {} ---\n{}\n",
            snippet.file, snippet.test_name, snippet.code
        ));
    }
    vec![Message::system(system), Message::user(user)]
}

pub(crate) fn refinement(request: &RefinementRequest) -> Vec<Message> {
    let system = format!(
        r"You fix runnable {language} example projects that failed automated quality checks.
Return only the files you change. Use null for every file that needs no change.

Schema:
{BUNDLE_SCHEMA}
{JSON_ONLY}",
        language = request.profile.language
    );
    let user = format!(
        "Example {}\n\nIssues:\n{}\n\nCurrent files:\n{}",
        request.example_id,
        serde_json::to_string_pretty(&request.issues).unwrap_or_default(),
        serde_json::to_string_pretty(&request.files).unwrap_or_default()
    );
    vec![Message::system(system), Message::user(user)]
}

/// Prefix lines with one-based numbers so line ranges can be reported.
fn numbered(content: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_numbers_lines() {
        let messages = extraction("a.test.ts", "it('a', () => {})\nit('b', () => {})");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("   2 | it('b'"));
        assert!(messages[0].content.contains("\"blocks\""));
    }
}
