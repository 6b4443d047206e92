use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), data: None }
    }
}
