pub mod draw_queue;
pub mod instance;
pub mod line_buffer;
pub mod render_model;
pub mod renderer;
pub mod shader_loader;
pub mod texture;
pub mod uniform;
