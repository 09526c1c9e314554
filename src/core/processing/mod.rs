pub mod normalize;
pub mod pansharpen;
pub mod pipeline;
pub mod reproject;
pub mod resize;
