// crates/gform_cli/src/main.rs
//
// GFORM-ENGINE v0 — CLI entrypoint
// Drives the fixed pipeline end-to-end: parse schema + policy, hash the
// policy, normalize responses, build groups, write the canonical result and
// (optionally) a rendered report. Strictly offline & deterministic.

mod args;

use args::{parse_and_validate, Args};
use gform_core::{FieldSpec, Policy, PolicyHash};
use gform_io::canonical_json::to_canonical_bytes;
use gform_io::{hasher, policy as policy_io, schema as schema_io};
use gform_pipeline::run as engine_run;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[cfg(feature = "report-json")]
use gform_report::{build_model, render_report_json};

const RESULT_FILE: &str = "result.json";
const REPORT_JSON_FILE: &str = "report.json";

fn main() -> ExitCode {
    let args = match parse_and_validate() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("gform: error: {e}");
            return ExitCode::from(1);
        }
    };

    init_tracing(args.quiet);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("gform: error: {e}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(quiet: bool) {
    use tracing_subscriber::EnvFilter;
    let default_level = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the whole orchestration. Returns the process exit code per policy.
fn run(args: Args) -> Result<ExitCode, String> {
    fs::create_dir_all(&args.out)
        .map_err(|e| format!("cannot create output directory {}: {e}", args.out.display()))?;

    let schema = load_schema(&args.schema)?;
    let policy = load_policy(&schema, &args.policy)?;
    let policy_hash = hasher::policy_hash(&policy).map_err(|e| format!("policy_hash: {e}"))?;

    if args.validate_only {
        if !args.quiet {
            println!("gform: schema and policy valid, policy_hash={}", policy_hash.as_hex());
        }
        return Ok(ExitCode::from(0));
    }

    let responses_path = args
        .responses
        .as_ref()
        .ok_or_else(|| "--responses is required outside --validate-only".to_string())?;
    let raw_rows = load_responses(responses_path)?;

    let (result, report) = engine_run(&schema, &policy, &policy_hash, &raw_rows, || false)
        .map_err(|e| format!("run: {e}"))?;

    let result_path = args.out.join(RESULT_FILE);
    let result_bytes = to_canonical_bytes(&result).map_err(|e| format!("encode result: {e}"))?;
    write_bytes_atomically(&result_path, &result_bytes)
        .map_err(|e| format!("write {}: {e}", result_path.display()))?;

    if args.render.iter().any(|r| r == "json") {
        render_json(&args.out, &result)?;
    }

    for (idx, err) in &report.excluded {
        eprintln!("gform: warning: participant {idx} excluded: {err}");
    }

    if !args.quiet {
        println!(
            "gform: completed, groups={} ungrouped={} excluded={}",
            result.stats.total_groups,
            result.stats.ungrouped_indices.len(),
            report.excluded.len(),
        );
        println!("gform: artifacts written to {}", args.out.display());
    }

    let code = if result.stats.total_records > 0 && result.stats.total_groups == 0 {
        ExitCode::from(2)
    } else {
        ExitCode::from(0)
    };
    Ok(code)
}

fn load_schema(path: &Path) -> Result<Vec<FieldSpec>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read schema {}: {e}", path.display()))?;
    schema_io::parse_schema(&text).map_err(|e| format!("schema {}: {e}", path.display()))
}

fn load_policy(schema: &[FieldSpec], path: &Path) -> Result<Policy, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read policy {}: {e}", path.display()))?;
    policy_io::bind_policy(schema, &text).map_err(|e| format!("policy {}: {e}", path.display()))
}

fn load_responses(path: &Path) -> Result<Vec<BTreeMap<String, serde_json::Value>>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read responses {}: {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("responses {}: expected a JSON array of records: {e}", path.display()))
}

#[cfg(feature = "report-json")]
fn render_json(out_dir: &Path, result: &gform_core::RunResult) -> Result<(), String> {
    let run_value = serde_json::to_value(result).map_err(|e| format!("encode result for report: {e}"))?;
    let model = build_model(&run_value);
    let report_value = render_report_json(&model);
    let report_bytes = to_canonical_bytes(&report_value).map_err(|e| format!("encode report: {e}"))?;
    let report_path = out_dir.join(REPORT_JSON_FILE);
    write_bytes_atomically(&report_path, &report_bytes).map_err(|e| format!("write {}: {e}", report_path.display()))
}

#[cfg(not(feature = "report-json"))]
fn render_json(_out_dir: &Path, _result: &gform_core::RunResult) -> Result<(), String> {
    eprintln!("gform: warning: report-json feature is disabled, skipping --render json");
    Ok(())
}

fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path_for(path);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut s = final_path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_for_appends_suffix() {
        let p = PathBuf::from("/out/result.json");
        assert_eq!(tmp_path_for(&p), PathBuf::from("/out/result.json.tmp"));
    }
}
