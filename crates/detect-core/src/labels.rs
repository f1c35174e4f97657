use std::{fs, path::Path};

use anyhow::{Context, Result, bail};

/// Load a class label file: one class name per line, line index = class id.
///
/// A missing or empty file is fatal; the pipeline must not start without its
/// label metadata.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("label file not found at {}", path.display()))?;
    let labels: Vec<String> = raw
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if labels.is_empty() {
        bail!("label file {} contains no labels", path.display());
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_one_label_per_line() {
        let path = std::env::temp_dir().join("visionfeed-labels-test.txt");
        fs::write(&path, "background\nperson\ncar\n\n").unwrap();
        let labels = load_labels(&path).expect("labels");
        assert_eq!(labels, vec!["background", "person", "car"]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("visionfeed-labels-missing.txt");
        assert!(load_labels(&path).is_err());
    }
}
