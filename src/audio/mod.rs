pub mod microphone;

pub use microphone::{check_permission, CaptureStream, ConfiguredMicrophone, Microphone};
