//! Build script for the dxcognito crate.
//!
//! Bakes Cognito and API settings into the binary so `CognitoConfig::from_env()`
//! can read them through `option_env!()`. A browser build has no process
//! environment to read at run time.
//!
//! A variable already set in the build environment always wins. Otherwise it
//! comes from `.env`, or from `.env.example` when `.env` is absent and none of
//! the required variables are set.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VARS: [&str; 5] = [
    "COGNITO_ENDPOINT",
    "COGNITO_CLIENT_ID",
    "COGNITO_USER_POOL_ID",
    "API_URL",
    "USE_PASSWORD_FLOW",
];

const REQUIRED_VARS: [&str; 3] = ["COGNITO_CLIENT_ID", "COGNITO_USER_POOL_ID", "API_URL"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=.env.example");
    CONFIG_VARS
        .iter()
        .for_each(|var| println!("cargo:rerun-if-env-changed={var}"));

    let root = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let preset = REQUIRED_VARS.iter().filter(|var| env::var_os(var).is_some()).count();

    match dotenv_source(&root, preset) {
        Some(path) => bake(&path),
        None if preset > 0 => println!(
            "cargo:warning=Using Cognito configuration from the build environment ({preset}/{} required set)",
            REQUIRED_VARS.len()
        ),
        None => {
            println!("cargo:warning=No Cognito configuration: no .env, no .env.example, no variables set");
            println!("cargo:warning=Set COGNITO_* and API_URL or create a .env file");
        }
    }
}

/// Picks the file to read, if any.
fn dotenv_source(root: &Path, preset: usize) -> Option<PathBuf> {
    let local = root.join(".env");
    if local.is_file() {
        return Some(local);
    }
    let example = root.join(".env.example");
    (preset == 0 && example.is_file()).then_some(example)
}

fn bake(path: &Path) {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            println!("cargo:warning=Could not read {name}: {e}");
            return;
        }
    };
    println!("cargo:warning=Loading Cognito configuration from {name} (build environment takes priority)");

    contents
        .lines()
        .filter_map(assignment)
        .filter(|(key, _)| CONFIG_VARS.contains(key))
        .filter(|(key, _)| env::var_os(key).is_none())
        .for_each(|(key, value)| println!("cargo:rustc-env={key}={value}"));
}

/// Splits `[export] KEY=value`, dropping quotes and trailing ` # comments`.
fn assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, raw) = line.strip_prefix("export ").unwrap_or(line).split_once('=')?;
    let raw = raw.trim();

    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => raw[1..].split(quote).next().unwrap_or_default(),
        _ => raw.split(" #").next().unwrap_or_default().trim_end(),
    };
    Some((key.trim(), value))
}
