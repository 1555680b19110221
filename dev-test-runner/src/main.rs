//! Runs the JSON fixtures under `fixtures/` and prints every case whose
//! verdict disagrees with its `valid` flag.
//!
//! Usage: `dev-test-runner [FILTER_REGEX] [--verbose]`
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use json_rules::{ChallengeOptions, EnumDomain, StockRules, Validator};
use regex::Regex;
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

fn load(path: &Path) -> Result<Fixture, String> {
    let src = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let de = &mut serde_json::Deserializer::from_str(&src);
    serde_path_to_error::deserialize(de).map_err(|e| format!("at {} → {}", e.path(), e.inner()))
}

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures")
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let filter = match args.iter().find(|a| !a.starts_with("--")).map(|p| Regex::new(p)) {
        None => None,
        Some(Ok(re)) => Some(re),
        Some(Err(e)) => {
            eprintln!("bad filter: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut files: Vec<PathBuf> = match std::fs::read_dir(fixture_dir()) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter(|p| filter.as_ref().is_none_or(|re| re.is_match(&p.to_string_lossy())))
            .collect(),
        Err(e) => {
            eprintln!("cannot read fixtures: {e}");
            return ExitCode::FAILURE;
        }
    };
    files.sort();

    let (mut total, mut failed) = (0usize, 0usize);
    for path in &files {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let fixture = match load(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("✘ {name}: {e}");
                failed += 1;
                continue;
            }
        };
        let validator = Validator::new(StockRules::new(fixture.enum_domain));
        let rule_set = match (validator.factory().make(&fixture.rule_set), fixture.build_fails) {
            (Ok(rs), false) => rs,
            (Err(e), true) => {
                total += 1;
                println!("✔ {name} (rejected: {e}) {}", fixture.description);
                continue;
            }
            (Ok(_), true) => {
                total += 1;
                eprintln!("✘ {name}: rule set was expected to be rejected");
                failed += 1;
                continue;
            }
            (Err(e), false) => {
                eprintln!("✘ {name}: {e}");
                failed += 1;
                continue;
            }
        };
        let mut bad = 0;
        for (i, case) in fixture.cases.iter().enumerate() {
            total += 1;
            let options = ChallengeOptions::RECORD | ChallengeOptions::CONTINUE;
            let verdict = validator.challenge(&case.subject, &rule_set, options);
            if verdict.passed() != case.valid {
                bad += 1;
                eprintln!(
                    "✘ {name} case {i}: expected valid={}, subject {}\n    {}",
                    case.valid,
                    case.subject,
                    verdict.last_failure("\n    ")
                );
            } else if verbose && !verdict.passed() {
                println!("  {name} case {i}: {}", verdict.last_failure("; "));
            }
        }
        failed += bad;
        if bad == 0 {
            println!("✔ {name} ({} cases) {}", fixture.cases.len(), fixture.description);
        }
    }

    println!("{total} cases, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
