// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// (código, pt, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("required", "Campo obrigatório.", "This field is required."),
    ("invalid_email", "E-mail inválido.", "Invalid e-mail address."),
    ("password_too_short", "A senha deve ter no mínimo 6 caracteres.", "Password must have at least 6 characters."),
    ("invalid_range", "Valor fora do intervalo permitido.", "Value out of the allowed range."),
    ("invalid_date_range", "A data inicial deve ser anterior à final.", "Start date must be before end date."),
    ("category_kind_mismatch", "A categoria não se aplica a este tipo de chamado.", "The category does not apply to this ticket kind."),
    ("account_inactive", "Conta desativada.", "Account disabled."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("forbidden", "Você não tem permissão para realizar esta ação.", "You are not allowed to perform this action."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("not_found", "Registro não encontrado.", "Record not found."),
    ("invalid_status_transition", "Transição de status não permitida.", "Status transition not allowed."),
    ("unique_violation", "Já existe um registro com esses dados.", "A record with these values already exists."),
    ("foreign_key_violation", "Referência a um registro inexistente.", "Reference to a missing record."),
    ("file_too_large", "Arquivo maior que o limite permitido.", "File exceeds the allowed size."),
    ("unsupported_file_type", "Apenas imagens são permitidas.", "Only image files are allowed."),
    ("empty_file", "Nenhum arquivo enviado.", "No file was uploaded."),
    ("rate_limited", "Muitas requisições. Tente novamente em instantes.", "Too many requests. Try again shortly."),
    ("integration_not_configured", "Integração não configurada no servidor.", "Integration is not configured on the server."),
    ("upstream_error", "Falha ao comunicar com o serviço externo.", "Failed to reach the external service."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Catálogo de mensagens por idioma, indexado por código de erro.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalog: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut catalog: HashMap<&'static str, HashMap<&'static str, &'static str>> = HashMap::new();
        for &(code, pt, en) in MESSAGES {
            catalog.entry("pt").or_default().insert(code, pt);
            catalog.entry("en").or_default().insert(code, en);
        }
        Self { catalog }
    }

    /// Traduz `code` para `lang`; cai para o idioma padrão e depois para o
    /// próprio código.
    pub fn translate(&self, lang: &str, code: &str) -> String {
        self.catalog
            .get(lang)
            .and_then(|m| m.get(code))
            .or_else(|| self.catalog.get(DEFAULT_LANG).and_then(|m| m.get(code)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| code.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_by_language() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "not_found"), "Record not found.");
        assert_eq!(store.translate("pt", "not_found"), "Registro não encontrado.");
    }

    #[test]
    fn test_unknown_language_falls_back_to_default() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "forbidden"), store.translate("pt", "forbidden"));
    }

    #[test]
    fn test_unknown_code_is_returned_verbatim() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "some_new_code"), "some_new_code");
    }
}
