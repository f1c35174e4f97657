use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};

const USAGE: &str = "Usage: visionfeed [--source <uri>] [--model <path>] [--labels <path>] \
[--width <px>] [--height <px>] [--fps <n>] [--threshold <0..1>] [--jpeg-quality <1-100>] \
[--port <n>] [--max-clients <n>] [--synthetic] [--verbose]\n\nPositional form is also \
supported: visionfeed <source> <model-path> <labels-path>";

#[derive(Clone, Debug)]
pub struct Config {
    pub source: String,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub width: i32,
    pub height: i32,
    pub target_fps: f32,
    pub confidence_threshold: f32,
    pub jpeg_quality: u8,
    pub port: u16,
    pub max_clients: usize,
    pub synthetic: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut source: Option<String> = None;
        let mut model_path: Option<PathBuf> = None;
        let mut labels_path: Option<PathBuf> = None;
        let mut width: Option<i32> = None;
        let mut height: Option<i32> = None;
        let mut target_fps: Option<f32> = None;
        let mut confidence_threshold: Option<f32> = None;
        let mut jpeg_quality: Option<u8> = None;
        let mut port: Option<u16> = None;
        let mut max_clients: Option<usize> = None;
        let mut synthetic = false;
        let mut verbose = false;
        let mut positional: Vec<String> = Vec::new();

        let mut idx = 1;
        while idx < args.len() {
            match args[idx].as_str() {
                "--help" | "-h" => bail!(USAGE),
                "--source" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--source requires a value"))?
                        .clone();
                    source = Some(value);
                    idx += 1;
                }
                "--model" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--model requires a value"))?
                        .clone();
                    model_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--labels" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--labels requires a value"))?
                        .clone();
                    labels_path = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--width" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--width requires a value"))?
                        .parse::<i32>()
                        .with_context(|| "--width must be an integer".to_string())?;
                    if value <= 0 {
                        bail!("--width must be a positive integer");
                    }
                    width = Some(value);
                    idx += 1;
                }
                "--height" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--height requires a value"))?
                        .parse::<i32>()
                        .with_context(|| "--height must be an integer".to_string())?;
                    if value <= 0 {
                        bail!("--height must be a positive integer");
                    }
                    height = Some(value);
                    idx += 1;
                }
                "--fps" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--fps requires a value"))?
                        .parse::<f32>()
                        .with_context(|| "--fps must be a number".to_string())?;
                    if value <= 0.0 {
                        bail!("--fps must be positive");
                    }
                    target_fps = Some(value);
                    idx += 1;
                }
                "--threshold" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--threshold requires a value"))?
                        .parse::<f32>()
                        .with_context(|| "--threshold must be a number".to_string())?;
                    if !(0.0..=1.0).contains(&value) {
                        bail!("--threshold must be between 0 and 1");
                    }
                    confidence_threshold = Some(value);
                    idx += 1;
                }
                "--jpeg-quality" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--jpeg-quality requires a value"))?
                        .parse::<u8>()
                        .with_context(|| {
                            "--jpeg-quality must be an integer between 1 and 100".to_string()
                        })?;
                    if !(1..=100).contains(&value) {
                        bail!("--jpeg-quality must be an integer between 1 and 100");
                    }
                    jpeg_quality = Some(value);
                    idx += 1;
                }
                "--port" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--port requires a value"))?
                        .parse::<u16>()
                        .with_context(|| "--port must be a port number".to_string())?;
                    port = Some(value);
                    idx += 1;
                }
                "--max-clients" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--max-clients requires a value"))?
                        .parse::<usize>()
                        .with_context(|| "--max-clients must be a positive integer".to_string())?;
                    if value == 0 {
                        bail!("--max-clients must be at least 1");
                    }
                    max_clients = Some(value);
                    idx += 1;
                }
                "--synthetic" => {
                    synthetic = true;
                    idx += 1;
                }
                "--verbose" => {
                    verbose = true;
                    idx += 1;
                }
                arg if arg.starts_with('-') => {
                    bail!("Unrecognised flag: {arg}");
                }
                other => {
                    positional.push(other.to_string());
                    idx += 1;
                }
            }
        }

        let mut positional = positional.into_iter();
        if source.is_none() {
            source = positional.next();
        }
        if model_path.is_none() {
            model_path = positional.next().map(PathBuf::from);
        }
        if labels_path.is_none() {
            labels_path = positional.next().map(PathBuf::from);
        }

        let config = Self {
            source: source.unwrap_or_else(|| "/dev/video0".to_string()),
            model_path,
            labels_path,
            width: width.unwrap_or(640),
            height: height.unwrap_or(480),
            target_fps: target_fps.unwrap_or(30.0),
            confidence_threshold: confidence_threshold.unwrap_or(0.5),
            jpeg_quality: jpeg_quality.unwrap_or(85),
            port: port.unwrap_or(8080),
            max_clients: max_clients.unwrap_or(64),
            synthetic,
            verbose,
        };

        if !config.synthetic {
            let model = config
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow!("Missing model path. Provide --model <path> or use --synthetic.\n\n{USAGE}"))?;
            if !model.exists() {
                bail!("Model file not found at {}", model.display());
            }
            let labels = config
                .labels_path
                .as_ref()
                .ok_or_else(|| anyhow!("Missing labels path. Provide --labels <path> or use --synthetic.\n\n{USAGE}"))?;
            if !labels.exists() {
                bail!("Label file not found at {}", labels.display());
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("visionfeed")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn synthetic_mode_needs_no_artifacts() {
        let config = Config::from_args(&argv(&["--synthetic", "--fps", "15"])).expect("config");
        assert!(config.synthetic);
        assert_eq!(config.target_fps, 15.0);
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
    }

    #[test]
    fn missing_model_is_fatal() {
        let err = Config::from_args(&argv(&["--source", "0"])).unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn nonexistent_model_is_fatal() {
        let err = Config::from_args(&argv(&[
            "--model",
            "/nonexistent/model.pt",
            "--labels",
            "/nonexistent/labels.txt",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Config::from_args(&argv(&["--synthetic", "--threshold", "1.5"])).is_err());
        assert!(Config::from_args(&argv(&["--synthetic", "--jpeg-quality", "0"])).is_err());
        assert!(Config::from_args(&argv(&["--synthetic", "--fps", "0"])).is_err());
        assert!(Config::from_args(&argv(&["--synthetic", "--max-clients", "0"])).is_err());
    }

    #[test]
    fn positional_form_is_supported() {
        let err = Config::from_args(&argv(&["0", "/nonexistent/model.pt", "/tmp/labels.txt"]))
            .unwrap_err();
        // Positional paths are picked up and then validated.
        assert!(err.to_string().contains("/nonexistent/model.pt"));
    }
}
