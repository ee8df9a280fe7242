// crates/gform_cli/src/args.rs
//
// Deterministic, offline CLI argument parsing & validation.
// - No networked paths (reject http/https schemes)
// - Schema, policy, and responses are always required, local files
// - Light validation up front so the engine only ever sees resolvable paths

use clap::Parser;
use std::{env, fs, path::PathBuf};

#[derive(Debug, Parser)]
#[command(name = "gform", about = "Offline, deterministic group-formation engine")]
pub struct Args {
    /// Survey schema JSON: an array of field documents.
    #[arg(long)]
    pub schema: PathBuf,

    /// Policy JSON document bound against the schema.
    #[arg(long)]
    pub policy: PathBuf,

    /// Responses JSON: an array of participant records, field name -> value.
    /// Not required in --validate-only mode.
    #[arg(long)]
    pub responses: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    #[arg(long, value_parser = ["json"], num_args = 0..=1)]
    pub render: Vec<String>,

    /// Parse and bind schema + policy, print the resulting policy_hash, and exit.
    #[arg(long)]
    pub validate_only: bool,

    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {}", s),
            NonLocalPath(p) => write!(f, "path must be local file (no scheme): {}", p),
            NotFound(p) => write!(f, "file not found: {}", p),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    let mut args = Args::parse();

    if args.render.is_empty() {
        args.render.push("json".to_string());
    }

    ensure_local_exists(&args.schema, "--schema")?;
    ensure_local_exists(&args.policy, "--policy")?;

    if !args.validate_only {
        match &args.responses {
            Some(p) => ensure_local_exists(p, "--responses")?,
            None => return Err(CliError::Missing("--responses")),
        }
    }

    args.schema = normalize_path(&args.schema);
    args.policy = normalize_path(&args.policy);
    args.responses = args.responses.as_ref().map(normalize_path);
    args.out = normalize_path(&args.out);

    Ok(args)
}

/// Ensure a path is local (no scheme) and exists as a file.
fn ensure_local_exists(p: &PathBuf, label: &'static str) -> Result<(), CliError> {
    let s = p.to_string_lossy().to_string();
    if has_scheme(&s) {
        return Err(CliError::NonLocalPath(format!("{} {}", label, s)));
    }
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{} {}", label, s)))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{} {}", label, s)));
    }
    Ok(())
}

/// Best-effort normalization to an absolute canonical path.
fn normalize_path(p: &PathBuf) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.clone()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}

fn has_scheme(s: &str) -> bool {
    s.contains("://") || s.starts_with("http:") || s.starts_with("https:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_local_path_detection() {
        assert!(has_scheme("http://x"));
        assert!(has_scheme("scheme://x"));
        assert!(!has_scheme(r"/tmp/file.json"));
    }

    #[test]
    fn normalize_path_best_effort() {
        let p = PathBuf::from("does/not/exist.txt");
        let abs = normalize_path(&p);
        assert!(abs.is_absolute());
    }
}
