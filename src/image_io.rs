// src/image_io.rs - Input discovery and file loading/saving

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use image::{ImageFormat, RgbImage};

use crate::errors::{AlgaeRiskError, Result};
use crate::measurement::SpectralMeasurement;

/// What an input file holds, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// JSON band values from the imagery provider
    Measurement,
    /// PNG/JPEG photograph of the waterbody
    Photo,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(InputKind::Measurement),
            "png" | "jpg" | "jpeg" => Some(InputKind::Photo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    /// Output name for reports and overlays; unique within one `collect_inputs` batch
    pub name: String,
    pub kind: InputKind,
}

impl InputFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let kind = InputKind::from_path(path).ok_or_else(|| {
            AlgaeRiskError::Config(format!("unsupported input file: {}", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            name: file_stem(path)?,
            kind,
        })
    }

    /// Input found under `root`, named after its relative path (`a/b/scene.json` -> `a_b_scene`)
    fn under_root(path: &Path, root: &Path) -> Result<Self> {
        let mut input = Self::new(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        let mut parts: Vec<String> = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => part.to_str().map(str::to_string),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        parts.push(input.name);
        input.name = parts.join("_");
        Ok(input)
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| AlgaeRiskError::InvalidPath(path.to_path_buf()))
}

/// Get all measurement and photo files from a directory (recursively), sorted by path
pub fn collect_inputs<P: AsRef<Path>>(dir_path: P) -> Result<Vec<InputFile>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(AlgaeRiskError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(AlgaeRiskError::Config(format!(
            "{} is not a directory",
            dir_path.display()
        )));
    }

    let mut paths = Vec::new();
    find_inputs_recursive(dir_path, &mut paths)?;
    paths.sort();

    let mut inputs = paths
        .iter()
        .map(|path| InputFile::under_root(path, dir_path))
        .collect::<Result<Vec<_>>>()?;
    make_names_unique(&mut inputs);
    Ok(inputs)
}

/// Same-named measurement and photo get their extension appended; any clash left gets a counter
fn make_names_unique(inputs: &mut [InputFile]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for input in inputs.iter() {
        *counts.entry(input.name.clone()).or_insert(0) += 1;
    }
    for input in inputs.iter_mut() {
        if counts.get(&input.name).copied().unwrap_or(0) > 1 {
            if let Some(ext) = input.path.extension().and_then(|e| e.to_str()) {
                input.name = format!("{}_{}", input.name, ext.to_ascii_lowercase());
            }
        }
    }

    let mut taken: HashSet<String> = HashSet::new();
    for input in inputs.iter_mut() {
        let mut candidate = input.name.clone();
        let mut n = 1;
        while !taken.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{}_{}", input.name, n);
        }
        if candidate != input.name {
            log::warn!("Input {} renamed to {} to keep reports apart", input.path.display(), candidate);
            input.name = candidate;
        }
    }
}

fn find_inputs_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_inputs_recursive(&path, result)?;
        } else if path.is_file() && InputKind::from_path(&path).is_some() {
            result.push(path);
        }
    }

    Ok(())
}

/// Load a photograph as 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

pub fn load_measurement<P: AsRef<Path>>(path: P) -> Result<SpectralMeasurement> {
    let text = fs::read_to_string(path.as_ref())?;
    let measurement = serde_json::from_str(&text)?;
    Ok(measurement)
}

/// Save an RGB image as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
