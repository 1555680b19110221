//! Every file under `fixtures/` must hold: each case's verdict matches `valid`.
use std::path::{Path, PathBuf};

use json_rules::{ChallengeOptions, EnumDomain, StockRules, Validator};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    #[serde(default)]
    description: String,
    #[serde(default)]
    enum_domain: EnumDomain,
    rule_set: Value,
    /// The rule set itself must be rejected by the factory.
    #[serde(default)]
    build_fails: bool,
    #[serde(default)]
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    subject: Value,
    valid: bool,
}

fn fixture_files() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let mut files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

#[test]
fn fixtures_hold() {
    let files = fixture_files();
    assert!(!files.is_empty());
    let mut mismatches = Vec::new();
    for path in files {
        let src = std::fs::read_to_string(&path).unwrap();
        let fixture: Fixture = json_rules::path_de::from_str_with_path(&src)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let validator = Validator::new(StockRules::new(fixture.enum_domain));
        let rule_set = match (validator.factory().make(&fixture.rule_set), fixture.build_fails) {
            (Ok(rs), false) => rs,
            (Err(_), true) => continue,
            (Ok(_), true) => {
                mismatches.push(format!("{}: rule set was expected to be rejected", path.display()));
                continue;
            }
            (Err(e), false) => panic!("{}: {e}", path.display()),
        };
        for (i, case) in fixture.cases.iter().enumerate() {
            let options = ChallengeOptions::RECORD | ChallengeOptions::CONTINUE;
            let verdict = validator.challenge(&case.subject, &rule_set, options);
            if verdict.passed() != case.valid {
                mismatches.push(format!(
                    "{} ({}) case {i}: expected valid={}, got {}",
                    path.display(),
                    fixture.description,
                    case.valid,
                    verdict.last_failure("; "),
                ));
            }
        }
    }
    assert!(mismatches.is_empty(), "{}", mismatches.join("\n"));
}
