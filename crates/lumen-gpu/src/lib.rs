//! Lumen GPU - texture residency backends
//!
//! The resource subsystem treats the GPU as an opaque "upload pixels, get
//! a handle" capability ([`TextureBackend`]). Handles are scoped: dropping
//! a [`TextureHandle`] destroys its texture.
//!
//! Two backends are provided: [`WgpuBackend`] for real rendering and
//! [`HeadlessBackend`], which records every create/destroy for tools and
//! tests that run without a GPU.

pub mod backend;
pub mod context;
pub mod headless;
pub mod mips;
pub mod texture;

pub use backend::{MipmapSettings, TextureBackend, TextureHandle, TextureUpload, NOT_RESIDENT};
pub use context::GpuContext;
pub use headless::{BackendEvent, HeadlessBackend};
pub use texture::{GpuTexture, WgpuBackend};
