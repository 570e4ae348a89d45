//! Server state

use std::sync::Arc;

use crate::directive::router::DirectiveRouter;

/// State shared by HTTP handlers
pub struct ServerState {
    /// Directive router
    pub router: Arc<DirectiveRouter>,
}
