//! Built-in functions available to every template.
//!
//! | function | result |
//! |---|---|
//! | `domain_join(a, b, ...)` | `a.b...` with stray dots trimmed |
//! | `env(name, default=none)` | value of an environment variable |
//! | `file_ext(path)` / `file_name(path)` | basename split at its first `.` |
//! | `get(name)` | value of a variable by name |
//! | `get_host(ip)` | host name of an address (reverse lookup) |
//! | `get_ip(host)` | first address of a host name |
//! | `get_output(cmd)` | standard output of a shell command |
//! | `parse_yaml(text)` | YAML text as a value |
//! | `path_basename` / `path_dirname` / `path_join` | POSIX path helpers |
//! | `print(value)` | logs `value`, renders nothing |
//! | `raise(message)` | aborts the render |
//! | `read_file(path)` | file contents, relative to the template root |
//! | `require(name, ...)` | aborts unless every name is defined |
use std::net::{IpAddr, ToSocketAddrs as _};
use std::path::{Path, PathBuf};

use minijinja::value::Rest;
use minijinja::{Environment, Error, ErrorKind, State, Value};

use crate::exec;
use crate::logging::PRINT_TARGET;

/// Directories the path-aware functions resolve against.
#[derive(Debug, Clone)]
pub struct FunctionRoots {
    /// Relative `read_file` paths are joined onto this directory.
    pub template: PathBuf,
}

/// Register every built-in function on `env`.
pub fn register(env: &mut Environment<'static>, roots: &FunctionRoots) {
    env.add_function("domain_join", domain_join);
    env.add_function("env", env_var);
    env.add_function("file_ext", file_ext);
    env.add_function("file_name", file_name);
    env.add_function("get", get);
    env.add_function("get_host", get_host);
    env.add_function("get_ip", get_ip);
    env.add_function("get_output", get_output);
    env.add_function("parse_yaml", parse_yaml);
    env.add_function("path_basename", path_basename);
    env.add_function("path_dirname", path_dirname);
    env.add_function("path_join", path_join);
    env.add_function("print", print);
    env.add_function("raise", raise);
    env.add_function("require", require);

    let template_root = roots.template.clone();
    env.add_function("read_file", move |path: String| {
        read_file(&template_root, &path)
    });
}

fn failure(function: &str, message: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, format!("{function}() : {message}"))
}

fn domain_join(parts: Rest<String>) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('.'))
        .collect::<Vec<_>>()
        .join(".")
}

fn env_var(name: &str, default: Option<Value>) -> Value {
    std::env::var(name).map_or_else(|_| default.unwrap_or_else(|| Value::from(())), Value::from)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn file_ext(path: &str) -> String {
    basename(path)
        .split_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

fn file_name(path: &str) -> String {
    let base = basename(path);
    base.split_once('.')
        .map_or(base, |(name, _)| name)
        .to_string()
}

fn get(state: &State, name: &str) -> Value {
    state.lookup(name).unwrap_or_default()
}

/// Reverse lookup through `getent hosts`.
fn get_host(ip: &str) -> Result<String, Error> {
    let unable = |reason: &dyn std::fmt::Display| {
        failure(
            "get_host",
            format!("Unable to obtain host for specified IP address \"{ip}\" - {reason}"),
        )
    };
    let addr: IpAddr = ip.trim().parse().map_err(|e| unable(&e))?;
    let addr = addr.to_string();
    let result =
        exec::run("getent", &["hosts", addr.as_str()]).map_err(|e| unable(&format!("{e:#}")))?;
    result
        .stdout
        .lines()
        .find_map(|line| line.split_whitespace().nth(1))
        .map(ToString::to_string)
        .ok_or_else(|| unable(&"no host name"))
}

fn get_ip(host: &str) -> Result<String, Error> {
    let addrs: Vec<IpAddr> = (host, 0)
        .to_socket_addrs()
        .map_err(|e| {
            failure(
                "get_ip",
                format!("Unable to obtain IP address for specified host \"{host}\" - {e}"),
            )
        })?
        .map(|a| a.ip())
        .collect();
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .map(ToString::to_string)
        .ok_or_else(|| {
            failure(
                "get_ip",
                format!("Unable to obtain IP address for specified host \"{host}\" - no addresses"),
            )
        })
}

fn get_output(cmd: &str) -> Result<String, Error> {
    exec::run_shell(cmd).map(|r| r.stdout).map_err(|e| {
        failure(
            "get_output",
            format!("Unable to get output from command \"{cmd}\" - {e:#}"),
        )
    })
}

fn parse_yaml(text: &str) -> Result<Value, Error> {
    serde_yaml::from_str::<serde_yaml::Value>(text)
        .map(|v| Value::from_serialize(&v))
        .map_err(|e| failure("parse_yaml", format!("Unable to parse YAML string - {e}")))
}

fn path_basename(path: &str) -> String {
    basename(path).to_string()
}

fn path_dirname(path: &str) -> String {
    let Some(idx) = path.rfind('/') else {
        return String::new();
    };
    let head = path.get(..=idx).unwrap_or_default();
    if head.chars().all(|c| c == '/') {
        head.to_string()
    } else {
        head.trim_end_matches('/').to_string()
    }
}

fn path_join(parts: Rest<String>) -> String {
    let mut joined = String::new();
    for part in parts.iter() {
        if part.starts_with('/') || joined.is_empty() {
            joined.clone_from(part);
        } else if joined.ends_with('/') {
            joined.push_str(part);
        } else {
            joined.push('/');
            joined.push_str(part);
        }
    }
    joined
}

fn print(message: &Value) -> String {
    tracing::info!(target: PRINT_TARGET, "{message}");
    String::new()
}

fn raise(message: &str) -> Result<Value, Error> {
    Err(failure("raise", message))
}

fn read_file(root: &Path, path: &str) -> Result<String, Error> {
    let actual = root.join(path);
    if !actual.is_file() {
        return Err(failure(
            "read_file",
            format!(
                "Cannot read file \"{}\" - specified file path does not exist",
                actual.display()
            ),
        ));
    }
    std::fs::read_to_string(&actual).map_err(|e| {
        failure(
            "read_file",
            format!("Cannot read file \"{}\" - {e}", actual.display()),
        )
    })
}

/// Fail unless every dotted name resolves to a defined value.
fn require(state: &State, names: Rest<String>) -> Result<String, Error> {
    for name in names.iter() {
        let mut segments = name.split('.');
        let head = segments.next().unwrap_or_default();
        let mut value = state.lookup(head).unwrap_or_default();
        for segment in segments {
            if value.is_undefined() {
                break;
            }
            value = value.get_attr(segment).unwrap_or_default();
        }
        if value.is_undefined() {
            return Err(failure(
                "require",
                format!(
                    "Required variable \"{name}\" not found within the context of \"{}\"",
                    state.name()
                ),
            ));
        }
    }
    Ok(String::new())
}
