//! User-supplied path resolution.
//!
//! Configuration files reference SteamCMD and destination directories with
//! home-relative shorthands (`~`, `$HOME`, `%userprofile%`), environment
//! variables and relative paths. Everything is resolved to an absolute,
//! lexically normalized UTF-8 path before use.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::env;

/// Resolve a raw user-supplied path to an absolute, normalized path.
pub fn resolve(raw: &str) -> Result<Utf8PathBuf> {
    let expanded = expand_home(raw)?;
    let expanded = expand_env(&expanded);

    let path = Utf8PathBuf::from(expanded);
    let absolute = if path.is_absolute() {
        path
    } else {
        let cwd = env::current_dir().context("failed to determine current directory")?;
        let cwd = Utf8PathBuf::try_from(cwd).context("current directory is not valid UTF-8")?;
        cwd.join(path)
    };

    Ok(normalize(&absolute))
}

fn home_dir() -> Result<String> {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map_err(|_| anyhow!("cannot expand home directory: neither HOME nor USERPROFILE is set"))
}

/// Expand a leading home-directory shorthand.
fn expand_home(raw: &str) -> Result<String> {
    for prefix in ["$HOME", "%userprofile%", "~"] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return Ok(format!("{}{}", home_dir()?, rest));
        }
    }
    Ok(raw.to_string())
}

/// Expand `$VAR` and `${VAR}` references. Unset variables expand to nothing.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name: String = if chars.peek() == Some(&'{') {
            chars.next();
            let name = chars.by_ref().take_while(|&c| c != '}').collect();
            name
        } else {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            name
        };

        if name.is_empty() {
            out.push('$');
        } else {
            out.push_str(&env::var(&name).unwrap_or_default());
        }
    }

    out
}

/// Lexically normalize a path: drop `.` components and fold `..` onto the
/// preceding component. Purely textual, nothing is touched on disk.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                // ".." above the root stays at the root
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}
