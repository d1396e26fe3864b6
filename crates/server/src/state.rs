use std::{path::PathBuf, sync::Arc};

use service::drinks::DrinkService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub drinks: Arc<DrinkService>,
    /// Static front-end served for every unmatched path.
    pub public_dir: PathBuf,
}
