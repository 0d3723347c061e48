//! Content tree resolution and handler dispatch.
//!
//! One [`Content`] is resolved per node: the download decision, the
//! sanitized title, and the handler variant that knows how to mirror that
//! kind of node. Handlers fetch eagerly on the driving task and only
//! schedule writes; payload I/O happens on the pool's workers.

mod attachment;
mod body;
mod document;
mod external_link;
mod folder;
mod resolver;

pub use attachment::Attachment;
pub use body::ContentBody;
pub use document::Document;
pub use external_link::ExternalLink;
pub use folder::Folder;
pub use resolver::{Content, Handler};
