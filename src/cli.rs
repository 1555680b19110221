//! CLI: check | normalize | rules
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::challenge::{ChallengeOptions, FailureRecord, Validator};
use crate::factory::DEFAULT_RECURSION_LIMIT;
use crate::provider::{RuleProvider, StockRules};
use crate::rule_set::RuleSet;
use crate::scalar::EnumDomain;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against declarative rule sets
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// challenge every input document against a rule set
    Check(CheckOut),
    /// print the normalized form of a rule set
    Normalize(NormalizeOut),
    /// list the stock rule catalog
    Rules(RulesOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is a subject.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct RuleSettings {
    /// rule-set source file (JSON)
    #[arg(long, short)]
    rules: PathBuf,

    /// literal kinds accepted by `enum` and `alternativeEnum`
    #[arg(long, value_enum, default_value_t = EnumDomain::default())]
    enum_domain: EnumDomain,

    /// nesting bound, applied both when building and when challenging
    #[arg(long, default_value_t = DEFAULT_RECURSION_LIMIT)]
    max_depth: usize,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    rule_settings: RuleSettings,

    /// keep going after the first failure and report all of them
    #[arg(long = "continue")]
    keep_going: bool,

    /// separator between failure lines
    #[arg(long, default_value = "\n    ")]
    delimiter: String,

    /// emit a JSON report instead of coloured text
    #[arg(long)]
    json: bool,

    /// only print failing documents
    #[arg(long, short)]
    quiet: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    rule_settings: RuleSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct RulesOut {
    #[arg(long, value_enum, default_value_t = EnumDomain::default())]
    enum_domain: EnumDomain,

    /// emit the catalog as JSON
    #[arg(long)]
    json: bool,
}

/// One subject pulled out of an input file.
#[derive(Debug)]
struct Document {
    label: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    document: &'a str,
    passed: bool,
    failures: Vec<FailureRecord>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths =
            resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({path_str})"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse {path_str}:{}", line_no + 1))?;
                    self.select(format!("{path_str}:{}", line_no + 1), value, &mut out)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({path_str})"))?;
                self.select(path_str, value, &mut out)?;
            }
        }
        tracing::debug!(documents = out.len(), "inputs loaded");
        Ok(out)
    }

    /// Apply the JSON pointer, then the jq filter.
    fn select(&self, label: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(ptr) => value
                .pointer(ptr)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {ptr} selects nothing in {label}"))?,
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { label, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let many = results.len() > 1;
                for (i, value) in results.into_iter().enumerate() {
                    let label = if many { format!("{label}#{i}") } else { label.clone() };
                    out.push(Document { label, value });
                }
            }
        }
        Ok(())
    }
}

impl RuleSettings {
    fn validator(&self) -> Validator {
        Validator::new(StockRules::new(self.enum_domain)).with_max_depth(self.max_depth)
    }

    fn load_rule_set(&self, validator: &Validator) -> Result<RuleSet> {
        let path_str = self.rules.to_string_lossy();
        let source = std::fs::read_to_string(&self.rules)
            .with_context(|| format!("failed to read rule set ({path_str})"))?;
        let rule_set = validator
            .factory()
            .make_from_str(&source)
            .with_context(|| format!("invalid rule set ({path_str})"))?;
        Ok(rule_set)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Normalize(target) => {
                let validator = target.rule_settings.validator();
                let rule_set = target.rule_settings.load_rule_set(&validator)?;
                let src = serde_json::to_string_pretty(&rule_set.to_source())?;
                write_output(target.out.as_deref(), &src)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Rules(target) => {
                target.run()?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<ExitCode> {
        let validator = self.rule_settings.validator();
        let rule_set = self.rule_settings.load_rule_set(&validator)?;
        let documents = self.input_settings.load_documents()?;

        let mut options = ChallengeOptions::RECORD;
        if self.keep_going {
            options |= ChallengeOptions::CONTINUE;
        }

        let reports: Vec<Report<'_>> = documents
            .par_iter()
            .map(|doc| {
                let challenge = validator.challenge(&doc.value, &rule_set, options);
                Report {
                    document: &doc.label,
                    passed: challenge.passed(),
                    failures: challenge.into_failures().map(|r| r.into_records()).unwrap_or_default(),
                }
            })
            .collect();

        let failed = reports.iter().filter(|r| !r.passed).count();
        tracing::info!(documents = reports.len(), failed, "check finished");

        let rendered = if self.json {
            serde_json::to_string_pretty(&reports)?
        } else {
            self.render_text(&reports, failed)
        };
        write_output(self.out.as_deref(), &rendered)?;

        Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }

    fn render_text(&self, reports: &[Report<'_>], failed: usize) -> String {
        let mut s = String::new();
        for report in reports {
            if report.passed {
                if !self.quiet {
                    s.push_str(&format!("{} {}\n", "PASS".green().bold(), report.document));
                }
                continue;
            }
            let lines = report
                .failures
                .iter()
                .map(FailureRecord::to_string)
                .collect::<Vec<_>>()
                .join(&self.delimiter);
            s.push_str(&format!(
                "{} {}{}{}\n",
                "FAIL".red().bold(),
                report.document,
                self.delimiter,
                lines
            ));
        }
        let summary = format!("{} of {} documents failed", failed, reports.len());
        if failed == 0 {
            s.push_str(&summary.green().to_string());
        } else {
            s.push_str(&summary.red().to_string());
        }
        s
    }
}

impl RulesOut {
    fn run(&self) -> Result<()> {
        let provider = StockRules::new(self.enum_domain);
        let catalog: IndexMap<&str, _> = provider
            .rule_names()
            .filter_map(|name| provider.rule_info(name).map(|info| (name, info)))
            .collect();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            return Ok(());
        }
        for (name, info) in &catalog {
            let kind = if info.type_checking {
                "type".cyan().to_string()
            } else {
                info.type_affiliation.as_deref().unwrap_or("any").yellow().to_string()
            };
            let arity = match (info.params_required, info.params_allowed) {
                (0, 0) => String::new(),
                (r, a) if r == a => format!(" args={r}"),
                (r, a) => format!(" args={r}..={a}"),
            };
            let renamed = info
                .renamed_from
                .as_deref()
                .map(|old| format!(" (was {old})").dimmed().to_string())
                .unwrap_or_default();
            println!("{:<16} {kind}{arity}{renamed}", name.bold());
        }
        println!("enum domain: {}", provider.enum_domain());
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Literal paths pass through; patterns with glob characters must match.
fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !pattern.contains(['*', '?', '[', '{']) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {pattern}"))? {
            out.push(entry.with_context(|| format!("cannot read a match of {pattern}"))?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(pointer: Option<&str>, jq: Option<&str>) -> InputSettings {
        InputSettings {
            ndjson: false,
            json_pointer: pointer.map(str::to_string),
            jq_expr: jq.map(str::to_string),
            input: vec![],
        }
    }

    #[test]
    fn pointer_then_jq_select_subjects() {
        let doc = json!({"data": {"items": [1, 2]}});
        let mut out = Vec::new();
        settings(Some("/data"), Some(".items[]"))
            .select("doc.json".into(), doc.clone(), &mut out)
            .unwrap();
        let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["doc.json#0", "doc.json#1"]);
        assert_eq!(out[1].value, json!(2));

        let err = settings(Some("/nope"), None).select("doc.json".into(), doc, &mut out);
        assert!(err.is_err());
    }

    #[test]
    fn cli_parses_check_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "json-rules", "check", "-r", "rules.json", "-i", "a.json", "b.json",
            "--continue", "--enum-domain", "scalar", "--max-depth", "4",
        ])
        .unwrap();
        let Command::Check(check) = cli.cmd else { panic!("expected check") };
        assert!(check.keep_going);
        assert_eq!(check.input_settings.input, ["a.json", "b.json"]);
        assert_eq!(check.rule_settings.enum_domain, EnumDomain::Scalar);
        assert_eq!(check.rule_settings.max_depth, 4);
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
        let err = resolve_file_path_patterns(["/nonexistent-dir-*/x.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"), "{err}");
    }
}
