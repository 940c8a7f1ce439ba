//! Image input handling for the Kindwise identification APIs.
//!
//! Turns the many shapes callers hold an image in (filesystem paths, raw
//! bytes, base64 text, URLs, open readers, decoded images) into the
//! canonical transport form: raw bytes resolved by [`Resolver`], then
//! base64 text produced by [`encode_image`] with optional bounded
//! downscaling.
//!
//! # Example
//!
//! ```no_run
//! use kindwise_image::{encode_image, ImageSource, Resolver};
//!
//! # async fn example() -> Result<(), kindwise_image::ImageError> {
//! let resolver = Resolver::new();
//! let bytes = resolver.resolve(ImageSource::from_path("bee.jpg")).await?;
//! let transport = encode_image(&bytes, Some(1500))?;
//! # Ok(())
//! # }
//! ```
//!
//! A blocking resolver with the same rules lives in [`blocking`].

pub mod blocking;
mod encode;
mod error;
mod resolve;
mod source;

pub use encode::encode_image;
pub use error::{ImageError, Result};
pub use resolve::Resolver;
pub use source::ImageSource;

// Re-exported so callers can build `ImageSource::Decoded` values without
// pinning their own copy of the image crate.
pub use image;
