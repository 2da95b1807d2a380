//! VitGpt2Captioner integration tests.
//!
//! Set `FRAMECAP_MODEL_DIR` to an exported model directory to run them;
//! without it they return early.

#![cfg(feature = "onnx")]

use std::path::PathBuf;

use framecap::{Captioner, VitGpt2Captioner, sample_frames};
use image::{Rgb, RgbImage};

fn model_dir() -> Option<PathBuf> {
    std::env::var_os("FRAMECAP_MODEL_DIR").map(PathBuf::from)
}

#[test]
fn captions_a_synthetic_image() {
    let Some(dir) = model_dir() else {
        return;
    };

    let mut captioner = VitGpt2Captioner::from_dir(&dir).expect("Failed to load model");
    let image = RgbImage::from_fn(320, 240, |x, y| {
        if (x / 40 + y / 40) % 2 == 0 {
            Rgb([240, 240, 240])
        } else {
            Rgb([20, 20, 20])
        }
    });

    let caption = captioner.caption(&image).expect("Captioning failed");
    assert!(!caption.is_empty());
    assert_eq!(caption, caption.trim());
}

#[test]
fn captioning_is_deterministic() {
    let Some(dir) = model_dir() else {
        return;
    };
    let path = "tests/fixtures/sample_video.mp4";
    let Some(frame) = sample_frames(path, 1.0).into_iter().next() else {
        return;
    };

    let mut captioner = VitGpt2Captioner::from_dir(&dir).expect("Failed to load model");
    let first = captioner.caption(&frame.image).expect("Captioning failed");
    let second = captioner.caption(&frame.image).expect("Captioning failed");
    assert_eq!(first, second);
}
