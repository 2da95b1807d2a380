//! ONNX Runtime captioning backend.
//!
//! [`VitGpt2Captioner`] runs a vision encoder-decoder captioning model
//! (a ViT image encoder feeding a GPT-2 text decoder, such as
//! `nlpconnect/vit-gpt2-image-captioning`) exported to ONNX. The model
//! directory is expected to contain:
//!
//! | File | Required | Purpose |
//! |------|----------|---------|
//! | `encoder_model.onnx` | yes | image → hidden states |
//! | `decoder_model.onnx` | yes | tokens + hidden states → logits |
//! | `tokenizer.json` | yes | token ids → text |
//! | `config.json` | no | start / end / pad token ids |
//! | `generation_config.json` | no | `max_length` |
//! | `preprocessor_config.json` | no | image size, mean, std |
//!
//! This is the layout produced by
//! `optimum-cli export onnx --model nlpconnect/vit-gpt2-image-captioning <dir>`.
//!
//! Decoding is greedy: the encoder runs once per frame, then the decoder is
//! re-run over the growing token sequence and the most likely next token is
//! appended until the end-of-sequence token or `max_length` is reached.

use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use image::{RgbImage, imageops::FilterType};
use ndarray::{Array2, Array4, ArrayD, Ix3};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use serde_json::Value;
use tokenizers::Tokenizer;

use crate::{
    captioner::Captioner,
    error::{CaptionError, InferenceError},
};

const ENCODER_FILE: &str = "encoder_model.onnx";
const DECODER_FILE: &str = "decoder_model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// GPT-2's `<|endoftext|>`, used as start, end, and padding token.
const GPT2_END_OF_TEXT: i64 = 50256;

/// Preprocessing and generation settings for a captioning model.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionModelOptions {
    /// Side length frames are resized to before encoding.
    pub image_size: u32,
    /// Per-channel mean subtracted after scaling pixels to `[0, 1]`.
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided out after the mean.
    pub std: [f32; 3],
    /// Maximum length of the generated token sequence, start token included.
    pub max_length: usize,
    pub decoder_start_token_id: i64,
    pub eos_token_id: i64,
    pub pad_token_id: i64,
    /// ONNX Runtime intra-op thread count. `None` lets the runtime decide.
    pub intra_threads: Option<usize>,
}

impl Default for CaptionModelOptions {
    fn default() -> Self {
        Self {
            image_size: 224,
            mean: [0.5; 3],
            std: [0.5; 3],
            max_length: 16,
            decoder_start_token_id: GPT2_END_OF_TEXT,
            eos_token_id: GPT2_END_OF_TEXT,
            pad_token_id: GPT2_END_OF_TEXT,
            intra_threads: None,
        }
    }
}

impl CaptionModelOptions {
    /// Defaults overridden by whatever the model directory's JSON config
    /// files specify. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::ModelLoad`] if a config file exists but is
    /// not valid JSON.
    pub fn from_model_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CaptionError> {
        let dir = dir.as_ref();
        let mut options = Self::default();

        if let Some(config) = read_json(&dir.join("config.json"))? {
            if let Some(id) = config.get("decoder_start_token_id").and_then(Value::as_i64) {
                options.decoder_start_token_id = id;
            }
            if let Some(id) = config.get("eos_token_id").and_then(Value::as_i64) {
                options.eos_token_id = id;
            }
            if let Some(id) = config.get("pad_token_id").and_then(Value::as_i64) {
                options.pad_token_id = id;
            }
        }

        if let Some(generation) = read_json(&dir.join("generation_config.json"))? {
            if let Some(length) = generation.get("max_length").and_then(Value::as_u64) {
                options.max_length = length as usize;
            }
        }

        if let Some(preprocessor) = read_json(&dir.join("preprocessor_config.json"))? {
            if let Some(size) = preprocessor.get("size").and_then(image_size_from_json) {
                options.image_size = size;
            }
            if let Some(mean) = preprocessor.get("image_mean").and_then(channel_triple) {
                options.mean = mean;
            }
            if let Some(std) = preprocessor.get("image_std").and_then(channel_triple) {
                options.std = std;
            }
        }

        Ok(options)
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(2);
        self
    }

    #[must_use]
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = (threads > 0).then_some(threads);
        self
    }

    #[must_use]
    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size.max(1);
        self
    }
}

fn read_json(path: &Path) -> Result<Option<Value>, CaptionError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|error| CaptionError::ModelLoad {
            path: path.to_path_buf(),
            reason: format!("invalid JSON: {error}"),
        })
}

/// `size` is either a bare integer or `{"height": h, "width": w}`.
fn image_size_from_json(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.get("height").and_then(Value::as_u64))
        .map(|size| size as u32)
}

fn channel_triple(value: &Value) -> Option<[f32; 3]> {
    let values = value.as_array()?;
    match values.as_slice() {
        [r, g, b] => Some([r.as_f64()? as f32, g.as_f64()? as f32, b.as_f64()? as f32]),
        _ => None,
    }
}

/// Resize and normalise a frame into a `[1, 3, size, size]` tensor.
pub fn preprocess(image: &RgbImage, options: &CaptionModelOptions) -> Array4<f32> {
    let size = options.image_size;
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel.0[channel] as f32 / 255.0;
            tensor[[0, channel, y as usize, x as usize]] =
                (value - options.mean[channel]) / options.std[channel];
        }
    }
    tensor
}

/// Index of the largest value, ignoring NaNs.
fn argmax(values: impl IntoIterator<Item = f32>) -> Option<usize> {
    values
        .into_iter()
        .enumerate()
        .filter(|(_, value)| !value.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}

fn runtime_error(error: impl Display) -> InferenceError {
    InferenceError::Runtime(error.to_string())
}

/// ViT + GPT-2 captioner running on ONNX Runtime.
pub struct VitGpt2Captioner {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    options: CaptionModelOptions,
}

impl VitGpt2Captioner {
    /// Load the model in `dir`, reading options from its config files.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::ModelLoad`] if a required file is missing or
    /// cannot be loaded.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CaptionError> {
        let options = CaptionModelOptions::from_model_dir(dir.as_ref())?;
        Self::from_dir_with_options(dir, options)
    }

    /// Load the model in `dir` with explicit options.
    pub fn from_dir_with_options<P: AsRef<Path>>(
        dir: P,
        options: CaptionModelOptions,
    ) -> Result<Self, CaptionError> {
        let dir = dir.as_ref();
        let encoder = load_session(&dir.join(ENCODER_FILE), &options)?;
        let decoder = load_session(&dir.join(DECODER_FILE), &options)?;

        let tokenizer_path = dir.join(TOKENIZER_FILE);
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|error| CaptionError::ModelLoad {
                path: tokenizer_path.clone(),
                reason: error.to_string(),
            })?;

        log::info!("Loaded captioning model from {}", dir.display());
        log::debug!("{options:?}");

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            options,
        })
    }

    pub fn options(&self) -> &CaptionModelOptions {
        &self.options
    }

    /// Run the image encoder, returning its last hidden state.
    fn encode(&mut self, image: &RgbImage) -> Result<ArrayD<f32>, InferenceError> {
        let pixel_values = preprocess(image, &self.options);
        let input = TensorRef::from_array_view(pixel_values.view()).map_err(runtime_error)?;
        let outputs = self
            .encoder
            .run(ort::inputs!["pixel_values" => input])
            .map_err(runtime_error)?;
        let hidden = outputs[0].try_extract_array::<f32>().map_err(runtime_error)?;
        Ok(hidden.to_owned())
    }

    /// Pick the most likely token to follow `tokens`.
    fn next_token(
        &mut self,
        tokens: &[i64],
        hidden_states: &ArrayD<f32>,
    ) -> Result<i64, InferenceError> {
        let input_ids = Array2::from_shape_vec((1, tokens.len()), tokens.to_vec())
            .map_err(|error| InferenceError::Preprocess(error.to_string()))?;
        let ids = TensorRef::from_array_view(input_ids.view()).map_err(runtime_error)?;
        let states = TensorRef::from_array_view(hidden_states.view()).map_err(runtime_error)?;

        let outputs = self
            .decoder
            .run(ort::inputs![
                "input_ids" => ids,
                "encoder_hidden_states" => states
            ])
            .map_err(runtime_error)?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .map_err(runtime_error)?
            .into_dimensionality::<Ix3>()
            .map_err(|error| InferenceError::Runtime(format!("unexpected logits shape: {error}")))?;

        let last = logits.shape()[1]
            .checked_sub(1)
            .ok_or_else(|| InferenceError::Runtime("decoder returned no positions".to_string()))?;
        let scores = logits.slice(ndarray::s![0, last, ..]);
        argmax(scores.iter().copied())
            .map(|index| index as i64)
            .ok_or_else(|| InferenceError::Runtime("decoder returned empty logits".to_string()))
    }
}

impl Captioner for VitGpt2Captioner {
    fn caption(&mut self, image: &RgbImage) -> Result<String, InferenceError> {
        let started = Instant::now();
        let hidden_states = self.encode(image)?;

        let mut tokens = vec![self.options.decoder_start_token_id];
        while tokens.len() < self.options.max_length {
            let token = self.next_token(&tokens, &hidden_states)?;
            if token == self.options.eos_token_id {
                break;
            }
            tokens.push(token);
        }

        let generated: Vec<u32> = tokens[1..]
            .iter()
            .filter(|&&token| token != self.options.pad_token_id)
            .filter_map(|&token| u32::try_from(token).ok())
            .collect();
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|error| InferenceError::Decode(error.to_string()))?;
        let text = text.trim().to_string();

        log::debug!(
            "Generated {} token(s) in {:?}",
            generated.len(),
            started.elapsed()
        );

        if text.is_empty() {
            Err(InferenceError::EmptyOutput)
        } else {
            Ok(text)
        }
    }
}

fn load_session(path: &Path, options: &CaptionModelOptions) -> Result<Session, CaptionError> {
    let load_error = |error: &dyn Display| CaptionError::ModelLoad {
        path: PathBuf::from(path),
        reason: error.to_string(),
    };

    if !path.is_file() {
        return Err(load_error(&"file not found"));
    }

    let mut builder = Session::builder()
        .map_err(|error| load_error(&error))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|error| load_error(&error))?;

    if let Some(threads) = options.intra_threads {
        builder = builder
            .with_intra_threads(threads)
            .map_err(|error| load_error(&error))?;
    }

    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        builder = builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .map_err(|error| load_error(&error))?;
    }

    let session = builder
        .commit_from_file(path)
        .map_err(|error| load_error(&error))?;
    log::debug!("Prepared ort session for {}", path.display());
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_shape_and_range() {
        let image = RgbImage::from_fn(64, 32, |x, _| {
            if x < 32 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let options = CaptionModelOptions::default();

        let tensor = preprocess(&image, &options);

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!(tensor.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(tensor[[0, 0, 100, 0]], -1.0);
        assert_eq!(tensor[[0, 2, 100, 223]], 1.0);
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax([0.1, f32::NAN, 0.7, 0.2]), Some(2));
        assert_eq!(argmax(std::iter::empty::<f32>()), None);
    }

    #[test]
    fn options_from_config_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"decoder_start_token_id": 1, "eos_token_id": 2, "pad_token_id": 0}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("generation_config.json"),
            r#"{"max_length": 24}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("preprocessor_config.json"),
            r#"{"size": {"height": 384, "width": 384}, "image_mean": [0.485, 0.456, 0.406]}"#,
        )
        .unwrap();

        let options = CaptionModelOptions::from_model_dir(dir.path()).unwrap();

        assert_eq!(options.decoder_start_token_id, 1);
        assert_eq!(options.eos_token_id, 2);
        assert_eq!(options.pad_token_id, 0);
        assert_eq!(options.max_length, 24);
        assert_eq!(options.image_size, 384);
        assert_eq!(options.mean, [0.485, 0.456, 0.406]);
        assert_eq!(options.std, [0.5; 3]);
    }

    #[test]
    fn empty_dir_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = CaptionModelOptions::from_model_dir(dir.path()).unwrap();
        assert_eq!(options, CaptionModelOptions::default());
    }

    #[test]
    fn malformed_config_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let result = CaptionModelOptions::from_model_dir(dir.path());
        assert!(matches!(result, Err(CaptionError::ModelLoad { .. })));
    }

    #[test]
    fn missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = VitGpt2Captioner::from_dir(dir.path());
        match result {
            Err(CaptionError::ModelLoad { path, .. }) => {
                assert!(path.ends_with(ENCODER_FILE));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loading an empty directory should fail"),
        }
    }
}
