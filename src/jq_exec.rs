//! jq pre-processing of subject documents before they are challenged.
use anyhow::{anyhow, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every emitted value becomes one subject.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in it {
        let v = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        // Val prints as JSON text
        out.push(serde_json::from_str(&v.to_string())?);
    }
    tracing::trace!(filter = filter_src, outputs = out.len(), "jq filter applied");
    Ok(out)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let detail: Vec<String> = errs.iter().map(|(_, err)| format!("{err:?}")).collect();
    let code = errs.first().map(|(file, _)| file.code).unwrap_or_default();
    anyhow!(detail.join("; ")).context(format!("cannot parse jq filter `{code}`"))
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let names: Vec<String> = errs
        .iter()
        .flat_map(|(_, list)| list.iter().map(|(name, undef)| format!("{name} ({undef:?})")))
        .collect();
    let code = errs.first().map(|(file, _)| file.code).unwrap_or_default();
    anyhow!("undefined: {}", names.join(", ")).context(format!("cannot compile jq filter `{code}`"))
}
