// src/common/i18n.rs

// Catálogo de mensagens com fallback para inglês.
// Os erros carregam CÓDIGOS; a tradução só acontece na borda da API.

#[derive(Clone, Default)]
pub struct I18nStore;

impl I18nStore {
    pub fn new() -> Self {
        Self
    }

    /// Resolve um código para a mensagem no idioma pedido.
    /// Código desconhecido volta como está (melhor que engolir o erro).
    pub fn translate(&self, lang: &str, code: &str) -> String {
        let msg = match lang {
            "pt" => pt(code).or_else(|| en(code)),
            _ => en(code),
        };
        msg.unwrap_or(code).to_string()
    }
}

fn en(code: &str) -> Option<&'static str> {
    Some(match code {
        "validation_failed" => "One or more fields are invalid.",
        "custom_data_invalid" => "One or more custom fields are invalid.",
        "invalid_token" => "Missing or invalid authentication token.",
        "invalid_credentials" => "Invalid e-mail or password.",
        "internal_error" => "An unexpected error occurred.",

        // Auth / usuários
        "admin_required" => "Only company admins can perform this action.",
        "user_not_found" => "User not found.",
        "email_exists" => "This e-mail is already in use.",

        // Registro de campos
        "field_not_found" => "Custom field definition not found.",
        "field_key_exists" => "A field with this key already exists for this module.",
        "select_requires_options" => "A SELECT field requires a non-empty options list.",

        // Entidades
        "lead_not_found" => "Lead not found.",
        "lead_email_exists" => "A lead with this e-mail already exists.",
        "opportunity_not_found" => "Opportunity not found.",
        "customer_not_found" => "Customer not found.",

        // Campanhas
        "campaign_not_found" => "Campaign not found.",
        "tracking_not_found" => "No tracking record exists for this recipient.",
        "email_subject_required" => "An e-mail campaign requires a subject.",
        "scheduled_time_in_past" => "The scheduled time must be in the future.",
        "audience_empty" => "The resolved audience is empty.",
        "campaign_terminal" => "This campaign has already finished and cannot change.",
        "campaign_not_sendable" => "This campaign cannot be sent from its current status.",
        "audience_frozen" => "The audience snapshot is frozen once a send has begun.",
        "audience_source_required" => "An audience change must name its recipient source.",

        // Códigos de validação de campo customizado
        "required" => "This field is required.",
        "invalid_text" => "Expected a text value.",
        "invalid_number" => "Expected a numeric value.",
        "invalid_date_format" => "Expected a date in YYYY-MM-DD format.",
        "invalid_option" => "Value is not one of the allowed options.",

        // Validações de payload
        "invalid_email" => "The e-mail address is invalid.",
        "password_too_short" => "The password must have at least 6 characters.",
        "name_too_short" => "The name must have at least 2 characters.",
        "company_name_too_short" => "The company name must have at least 2 characters.",
        "campaign_name_required" => "The campaign name is required.",
        "sender_required" => "The sender is required.",
        "content_required" => "The content is required.",
        "label_required" => "The field label is required.",
        "key_name_required" => "The field key is required.",

        _ => return None,
    })
}

fn pt(code: &str) -> Option<&'static str> {
    Some(match code {
        "validation_failed" => "Um ou mais campos são inválidos.",
        "custom_data_invalid" => "Um ou mais campos customizados são inválidos.",
        "invalid_token" => "Token de autenticação inválido ou ausente.",
        "invalid_credentials" => "E-mail ou senha inválidos.",
        "internal_error" => "Ocorreu um erro inesperado.",

        "admin_required" => "Apenas admins da empresa podem realizar esta ação.",
        "user_not_found" => "Usuário não encontrado.",
        "email_exists" => "Este e-mail já está em uso.",

        "field_not_found" => "Definição de campo customizado não encontrada.",
        "field_key_exists" => "Já existe um campo com esta chave neste módulo.",
        "select_requires_options" => "Um campo SELECT exige uma lista de opções.",

        "lead_not_found" => "Lead não encontrado.",
        "lead_email_exists" => "Já existe um lead com este e-mail.",
        "opportunity_not_found" => "Oportunidade não encontrada.",
        "customer_not_found" => "Cliente não encontrado.",

        "campaign_not_found" => "Campanha não encontrada.",
        "tracking_not_found" => "Não existe registro de envio para este destinatário.",
        "email_subject_required" => "Campanha de e-mail exige um assunto.",
        "scheduled_time_in_past" => "O agendamento deve estar no futuro.",
        "audience_empty" => "A audiência resolvida está vazia.",
        "campaign_terminal" => "Esta campanha já terminou e não pode mais mudar.",
        "campaign_not_sendable" => "Esta campanha não pode ser enviada no status atual.",
        "audience_frozen" => "O snapshot de audiência congela quando o envio começa.",
        "audience_source_required" => "Uma troca de audiência precisa indicar a origem dos destinatários.",

        "required" => "Este campo é obrigatório.",
        "invalid_text" => "Esperava um texto.",
        "invalid_number" => "Esperava um número.",
        "invalid_date_format" => "Esperava uma data no formato YYYY-MM-DD.",
        "invalid_option" => "O valor não está entre as opções permitidas.",

        "invalid_email" => "O e-mail fornecido é inválido.",
        "password_too_short" => "A senha deve ter no mínimo 6 caracteres.",
        "name_too_short" => "O nome deve ter no mínimo 2 caracteres.",
        "company_name_too_short" => "O nome da empresa deve ter no mínimo 2 caracteres.",
        "campaign_name_required" => "O nome da campanha é obrigatório.",
        "sender_required" => "O remetente é obrigatório.",
        "content_required" => "O conteúdo é obrigatório.",
        "label_required" => "O rótulo do campo é obrigatório.",
        "key_name_required" => "A chave do campo é obrigatória.",

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traduz_com_fallback_para_ingles() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "invalid_credentials"), "E-mail ou senha inválidos.");
        assert_eq!(store.translate("fr", "invalid_credentials"), "Invalid e-mail or password.");
    }

    #[test]
    fn codigo_desconhecido_volta_como_esta() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "inexistente"), "inexistente");
    }
}
