//! The `~/.sevenbridges/credentials` profile file read by `sbpack` and `sb`.
//!
//! INI format, one section per profile:
//!
//! ```text
//! [cgc]
//! api_endpoint = https://cgc-api.sbgenomics.com/v2
//! auth_token = <token>
//! ```
//!
//! Writing a profile replaces only that profile's two keys; other profiles,
//! other keys and comments are kept as they are.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::backend::store::{restrict_permissions, write_atomically};
use crate::error::{CredentialError, Result};
use crate::platform::Platform;
use crate::secret::Secret;

const DIR_NAME: &str = ".sevenbridges";
const FILE_NAME: &str = "credentials";
const MANAGED_KEYS: [&str; 2] = ["api_endpoint", "auth_token"];

pub fn credentials_path(home: &Path) -> PathBuf {
    home.join(DIR_NAME).join(FILE_NAME)
}

/// Write `token` for `platform` into section `[profile]` of the profile file
/// under `home`. Returns the file's path.
pub fn write_profile(
    home: &Path,
    profile: &str,
    platform: &Platform,
    token: &Secret,
) -> Result<PathBuf> {
    let path = credentials_path(home);
    let token = token
        .expose_str()
        .filter(|t| !t.contains(['\n', '\r']))
        .ok_or_else(|| CredentialError::invalid("token", "not a single line of text"))?;
    if profile.is_empty() || profile.contains([']', '[', '\n', '\r']) {
        return Err(CredentialError::invalid(
            "profile name",
            format!("'{profile}' cannot be used as a section name"),
        ));
    }

    let dir = home.join(DIR_NAME);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| CredentialError::io(&dir, e))?;
    }
    restrict_permissions(&dir, 0o700)?;

    let existing = match fs::read_to_string(&path) {
        Ok(content) => Zeroizing::new(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Zeroizing::new(String::new()),
        Err(e) => return Err(CredentialError::io(&path, e)),
    };
    let updated = Zeroizing::new(upsert_section(
        &existing,
        profile,
        &[
            ("api_endpoint", platform.api_endpoint),
            ("auth_token", token),
        ],
    ));
    write_atomically(&path, updated.as_bytes())?;
    tracing::info!(profile, platform = platform.id, path = %path.display(), "wrote sevenbridges profile");
    Ok(path)
}

/// Remove section `[profile]` from the profile file. Missing file or section
/// is not an error.
pub fn remove_profile(home: &Path, profile: &str) -> Result<()> {
    let path = credentials_path(home);
    let existing = match fs::read_to_string(&path) {
        Ok(content) => Zeroizing::new(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CredentialError::io(&path, e)),
    };
    let mut out = String::with_capacity(existing.len());
    let mut skipping = false;
    for line in existing.lines() {
        if let Some(name) = section_name(line) {
            skipping = name == profile;
        }
        if !skipping {
            out.push_str(line);
            out.push('\n');
        }
    }
    let out = Zeroizing::new(out);
    write_atomically(&path, out.as_bytes())
}

/// Section header as configparser reads it: the stripped line starts with
/// `[` and the name runs to the last `]`, so `[cgc] # note` is section `cgc`.
fn section_name(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('[')?;
    let end = rest.rfind(']')?;
    Some(&rest[..end]).filter(|name| !name.is_empty())
}

fn key_of(line: &str) -> Option<&str> {
    let (key, _) = line.split_once(['=', ':'])?;
    Some(key.trim())
}

/// Option names are case-insensitive to configparser.
fn is_managed(line: &str) -> bool {
    key_of(line).is_some_and(|k| MANAGED_KEYS.iter().any(|m| m.eq_ignore_ascii_case(k)))
}

/// Return `content` with `entries` set in section `[section]`, appending the
/// section when it does not exist.
fn upsert_section(content: &str, section: &str, entries: &[(&str, &str)]) -> String {
    let render = |out: &mut String| {
        for (key, value) in entries {
            out.push_str(&format!("{key} = {value}\n"));
        }
    };

    let mut out = String::with_capacity(content.len() + 128);
    let mut in_target = false;
    let mut written = false;
    // Blank lines inside the target section are held back so new keys land
    // before the gap that separates it from the next section.
    let mut held_blanks = 0;
    for line in content.lines() {
        if let Some(name) = section_name(line) {
            if in_target && !written {
                render(&mut out);
                written = true;
            }
            for _ in 0..std::mem::take(&mut held_blanks) {
                out.push('\n');
            }
            in_target = name == section;
            out.push_str(line);
            out.push('\n');
            continue;
        }
        if in_target {
            if line.trim().is_empty() {
                held_blanks += 1;
                continue;
            }
            if is_managed(line) {
                continue;
            }
            for _ in 0..std::mem::take(&mut held_blanks) {
                out.push('\n');
            }
        }
        out.push_str(line);
        out.push('\n');
    }

    if in_target && !written {
        render(&mut out);
        written = true;
    }
    for _ in 0..held_blanks {
        out.push('\n');
    }
    if !written {
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(&format!("[{section}]\n"));
        render(&mut out);
    }
    out
}
