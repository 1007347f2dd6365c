use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanlensError};

pub const FALLBACK_COLOR: &str = "#888888";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub layout: LayoutConfig,
}

/// Circular layout parameters for the service graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    pub center_x: f64,
    pub center_y: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub radius_per_service: f64,
    pub palette: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 400.0,
            center_y: 300.0,
            min_radius: 120.0,
            max_radius: 260.0,
            radius_per_service: 40.0,
            palette: [
                "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1",
                "#ff9da7", "#9c755f", "#bab0ac",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl LayoutConfig {
    /// Radius grows with the service count and stays inside
    /// `[min_radius, max_radius]`.
    pub fn radius_for(&self, services: usize) -> f64 {
        (services as f64 * self.radius_per_service)
            .max(self.min_radius)
            .min(self.max_radius)
    }

    pub fn color_for(&self, index: usize) -> String {
        if self.palette.is_empty() {
            return FALLBACK_COLOR.to_string();
        }
        self.palette[index % self.palette.len()].clone()
    }

    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("center_x", self.center_x),
            ("center_y", self.center_y),
            ("min_radius", self.min_radius),
            ("max_radius", self.max_radius),
            ("radius_per_service", self.radius_per_service),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(SpanlensError::Config(format!(
                    "layout.{name} must be a finite non-negative number (value={value})"
                )));
            }
        }
        if self.min_radius > self.max_radius {
            return Err(SpanlensError::Config(format!(
                "layout.min_radius ({}) exceeds layout.max_radius ({})",
                self.min_radius, self.max_radius
            )));
        }
        for color in &self.palette {
            validate_color(color)?;
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_with_file(&config_file_path())
    }

    /// Defaults, then `path` if it exists, then environment overrides.
    pub fn load_with_file(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(file_overrides) = load_file_overrides(path)? {
            apply_overrides(&mut cfg, file_overrides.layout, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.layout.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.layout.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    #[serde(default)]
    layout: LayoutOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutOverrides {
    center_x: Option<f64>,
    center_y: Option<f64>,
    min_radius: Option<f64>,
    max_radius: Option<f64>,
    radius_per_service: Option<f64>,
    palette: Option<Vec<String>>,
}

pub fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("SPANLENS_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("spanlens/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<FileOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| SpanlensError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: FileOverrides = toml::from_str(&raw)
        .map_err(|e| SpanlensError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<LayoutOverrides> {
    Ok(LayoutOverrides {
        center_x: env_f64("SPANLENS_LAYOUT_CENTER_X")?,
        center_y: env_f64("SPANLENS_LAYOUT_CENTER_Y")?,
        min_radius: env_f64("SPANLENS_LAYOUT_MIN_RADIUS")?,
        max_radius: env_f64("SPANLENS_LAYOUT_MAX_RADIUS")?,
        radius_per_service: env_f64("SPANLENS_LAYOUT_RADIUS_PER_SERVICE")?,
        palette: env::var("SPANLENS_PALETTE")
            .ok()
            .map(|raw| parse_palette(&raw))
            .transpose()
            .map_err(|e| SpanlensError::Config(format!("bad SPANLENS_PALETTE in environment: {e}")))?,
    })
}

fn env_f64(name: &str) -> Result<Option<f64>> {
    match env::var(name) {
        Ok(v) => Ok(Some(v.trim().parse::<f64>().map_err(|e| {
            SpanlensError::Config(format!("bad {name} in environment: {e} (value={v})"))
        })?)),
        Err(_) => Ok(None),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: LayoutOverrides, source: &str) -> Result<()> {
    let layout = &mut cfg.layout;
    if let Some(v) = overrides.center_x {
        layout.center_x = v;
    }
    if let Some(v) = overrides.center_y {
        layout.center_y = v;
    }
    if let Some(v) = overrides.min_radius {
        layout.min_radius = v;
    }
    if let Some(v) = overrides.max_radius {
        layout.max_radius = v;
    }
    if let Some(v) = overrides.radius_per_service {
        layout.radius_per_service = v;
    }
    if let Some(v) = overrides.palette {
        for color in &v {
            validate_color(color).map_err(|e| {
                SpanlensError::Config(format!("bad palette in {source}: {e}"))
            })?;
        }
        layout.palette = v;
    }
    Ok(())
}

fn parse_palette(raw: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        validate_color(trimmed)?;
        out.push(trimmed.to_string());
    }
    Ok(out)
}

fn validate_color(color: &str) -> Result<()> {
    let Some(hex) = color.strip_prefix('#') else {
        return Err(SpanlensError::Config(format!(
            "colour must start with '#': {color}"
        )));
    };
    if !matches!(hex.len(), 3 | 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SpanlensError::Config(format!(
            "colour must be #rgb, #rrggbb or #rrggbbaa: {color}"
        )));
    }
    Ok(())
}
