#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use arpose_lie as lie;

#[doc(inline)]
pub use arpose_frames as frames;
