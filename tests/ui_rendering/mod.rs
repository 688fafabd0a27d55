pub mod common;
mod conversation_render_test;
mod key_flow_test;
mod panels_scroll_test;
