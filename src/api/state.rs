use crate::panel::LoadTestPanel;

#[derive(Clone)]
pub struct AppState {
    pub panel: LoadTestPanel,
}

impl AppState {
    pub fn new(panel: LoadTestPanel) -> Self {
        Self { panel }
    }
}
