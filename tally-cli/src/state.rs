use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use tally_core::{Storage, Task, Theme};

pub fn tally_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tally"))
}

pub fn ensure_tally_home() -> Result<PathBuf> {
    let dir = tally_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// File-backed storage: two independent whole-file JSON records under the
/// app home, overwritten on every save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn in_home() -> Result<Self> {
        Ok(Self::new(ensure_tally_home()?))
    }

    fn tasks_path(&self) -> PathBuf {
        self.dir.join("tasks.json")
    }

    fn theme_path(&self) -> PathBuf {
        self.dir.join("theme.json")
    }
}

impl Storage for FileStorage {
    fn load_tasks(&self) -> Result<Vec<Task>> {
        let p = self.tasks_path();
        if !p.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let p = self.tasks_path();
        let json = serde_json::to_string_pretty(tasks)?;
        write_record(&p, &json)
    }

    fn load_theme(&self) -> Theme {
        let p = self.theme_path();
        let Ok(s) = fs::read_to_string(&p) else {
            return Theme::default();
        };
        serde_json::from_str::<String>(&s)
            .map(|v| Theme::parse_or_default(&v))
            .unwrap_or_default()
    }

    fn save_theme(&self, theme: Theme) -> Result<()> {
        let p = self.theme_path();
        let json = serde_json::to_string(theme.as_str())?;
        write_record(&p, &json)
    }
}

fn write_record(p: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(p, contents).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}
