//! Session commands used by the CLI

mod session;

pub use session::{
    commit, create, delete, delete_parts, error_records, freeze, list, perform, render_session,
    render_sessions, show, unfreeze, upload_part,
};
