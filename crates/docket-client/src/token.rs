use docket_core::error::AppError;
use docket_core::traits::TokenProvider;

/// A credential supplied up front, typically from `DOCKET_API_TOKEN`.
///
/// The same token is handed out for every actor. A blank token counts as no
/// token.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { token }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _actor_id: i64) -> Result<Option<String>, AppError> {
        Ok(self.token.clone())
    }
}
