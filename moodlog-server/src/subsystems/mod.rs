pub mod pipeline;
pub mod submit;
