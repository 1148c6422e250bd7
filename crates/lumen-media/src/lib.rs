//! Lumen Media - codec dispatch and file probing
//!
//! This crate handles:
//! - Detecting the file type of a path
//! - Probing file identity (size and timestamps) without decoding
//! - Dispatching a load to the codec registered for the file type
//! - A built-in codec backed by the `image` crate

pub mod decoder;
pub mod image_codec;
pub mod probe;

pub use decoder::{Codec, CodecRegistry, Decoded, LoadParams, SurfaceLayout, CUBE_FACE_COUNT};
pub use image_codec::ImageCodec;
pub use probe::{FileIdentity, FileType};
