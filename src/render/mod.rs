pub mod map;

pub use map::{encode_png, render_map};
