// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANG;

const SUPPORTED: [&str; 2] = ["pt", "en"];

// Idioma da resposta, lido do Accept-Language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    /// Primeiro idioma suportado na ordem de preferência do cliente
    /// ("pt-BR" conta como "pt").
    pub fn from_header(value: &str) -> Self {
        accept_language::parse(value)
            .iter()
            .filter_map(|tag| tag.split('-').next())
            .map(|primary| primary.to_ascii_lowercase())
            .find(|primary| SUPPORTED.contains(&primary.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_first_supported_language() {
        assert_eq!(Locale::from_header("en-US,en;q=0.9,pt;q=0.8").0, "en");
        assert_eq!(Locale::from_header("pt-BR,pt;q=0.9").0, "pt");
        assert_eq!(Locale::from_header("fr-FR,en;q=0.5").0, "en");
    }

    #[test]
    fn test_falls_back_to_portuguese() {
        assert_eq!(Locale::from_header("de-DE").0, "pt");
        assert_eq!(Locale::from_header("").0, "pt");
        assert_eq!(Locale::default().0, "pt");
    }
}
