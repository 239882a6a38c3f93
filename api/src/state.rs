use intake_rag::QaHandle;

/// Everything request handlers share. Built once in `main`.
#[derive(Clone, Default)]
pub struct AppState {
    pub qa: QaHandle,
}

impl AppState {
    pub fn new(qa: QaHandle) -> Self {
        Self { qa }
    }
}
