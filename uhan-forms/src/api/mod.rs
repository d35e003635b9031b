//! HTTP API handlers for uhan-forms

pub mod badges;
pub mod buildinfo;
pub mod health;
pub mod members;
pub mod pages;
pub mod sessions;
pub mod sse;
pub mod ui;

pub use badges::verify_badge;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use members::{
    create_member, delete_member, get_member, list_members, member_qr, member_stats, update_member,
};
pub use pages::{clear_history, clear_saved, get_history, list_pages, score_page};
pub use sessions::{
    close_session, export_session, get_session, load_history_entry, load_session, open_session,
    recompute, save_session, session_events, update_fields,
};
pub use sse::event_stream;
pub use ui::{serve_app_js, serve_index};
