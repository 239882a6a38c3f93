use serde::Deserialize;

#[derive(Deserialize)]
pub struct QueryPayload {
    pub query: String,
}
