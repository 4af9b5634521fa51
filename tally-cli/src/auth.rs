use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub gemini_api_key: Option<String>,
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_tally_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Resolve the Gemini API key: `GEMINI_API_KEY` env var first, then the
/// stored auth record.
pub fn resolve_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }
    let a = load_auth()?;
    a.gemini_api_key.ok_or_else(|| {
        anyhow::anyhow!(
            "no Gemini API key; set GEMINI_API_KEY or run: tally auth paste-gemini-key"
        )
    })
}

fn prompt_secret(label: &str) -> Result<String> {
    // Minimal portable secret prompt: just stdin.
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_gemini_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste Gemini API key (starts with AIza)")?;
    if key.is_empty() {
        bail!("no key entered");
    }
    if !key.starts_with("AIza") {
        bail!("key didn't look like a Gemini API key (expected prefix AIza)");
    }
    auth.gemini_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Gemini API key to ~/.tally/auth.json");
    Ok(())
}
