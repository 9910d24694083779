pub mod access;
pub mod api;
pub mod editor;
pub mod model;
pub mod render;

pub use access::{Action, Caller, Role};
pub use api::*;
pub use editor::{BlockPatch, Confirmation, DetailField, EditorError, EditorState, SectionPath};
pub use model::{
    Block, BlockContent, BlockKind, Detail, Document, DocumentDraft, DocumentSummary,
    DocumentUpdate, ModelError, Section,
};
