// src/services/report_service.rs

// O agregador de relatórios: funções totais sobre os eventos de tracking de
// UMA campanha. Nada de I/O aqui; lista vazia devolve zeros, nunca erro.
// (Se o volume crescer, isso vira agregação no banco mantendo as mesmas
// assinaturas.)

use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::models::campaign::TrackingEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub total: usize,
    pub opened: usize,
    pub clicked: usize,
    pub attachment_opened: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    #[schema(example = "Pune, IN")]
    pub location: String,
    pub count: usize,
}

/// Contagens simples sobre as flags de cada destinatário.
pub fn summarize(events: &[TrackingEvent]) -> CampaignSummary {
    CampaignSummary {
        total: events.len(),
        opened: events.iter().filter(|e| e.is_opened).count(),
        clicked: events.iter().filter(|e| e.link_clicked).count(),
        attachment_opened: events.iter().filter(|e| e.attachment_opened).count(),
    }
}

/// Agrupa por rótulo "{cidade ou 'Unknown'}, {país ou ''}", ordena por
/// contagem decrescente com desempate estável (ordem de primeira aparição)
/// e corta em `n`.
pub fn top_locations(events: &[TrackingEvent], n: usize) -> Vec<LocationCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for event in events {
        let city = event
            .city
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("Unknown");
        let country = event.country.as_deref().unwrap_or("");
        let label = format!("{city}, {country}");

        if !counts.contains_key(&label) {
            first_seen.push(label.clone());
        }
        *counts.entry(label).or_insert(0) += 1;
    }

    // Sort estável sobre a ordem de primeira aparição: empates preservam-na
    let mut result: Vec<LocationCount> = first_seen
        .into_iter()
        .map(|label| {
            let count = counts[&label];
            LocationCount { location: label, count }
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result.truncate(n);

    result
}

/// Exporta uma linha por evento, com colunas fixas.
///
/// Vírgulas dentro do user-agent viram ponto-e-vírgula para não desalinhar as
/// colunas. É um escape com perda, não CSV com aspas; os consumidores da
/// exportação dependem desse formato.
pub fn to_csv(events: &[TrackingEvent]) -> String {
    let mut out = String::from(
        "to,isOpened,openCount,attachmentOpened,linkClicked,lastOpenedAt,ip,city,region,country,userAgent\n",
    );

    for event in events {
        let last_opened = event
            .last_opened_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        let user_agent = event
            .user_agent
            .as_deref()
            .unwrap_or("")
            .replace(',', ";");

        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            event.recipient,
            event.is_opened,
            event.open_count,
            event.attachment_opened,
            event.link_clicked,
            last_opened,
            event.ip.as_deref().unwrap_or(""),
            event.city.as_deref().unwrap_or(""),
            event.region.as_deref().unwrap_or(""),
            event.country.as_deref().unwrap_or(""),
            user_agent,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(city: &str, country: &str) -> TrackingEvent {
        TrackingEvent {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            recipient: "a@x.com".to_string(),
            is_opened: false,
            open_count: 0,
            attachment_opened: false,
            link_clicked: false,
            last_opened_at: None,
            ip: None,
            city: (!city.is_empty()).then(|| city.to_string()),
            region: None,
            country: (!country.is_empty()).then(|| country.to_string()),
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resumo_sobre_vazio_e_tudo_zero() {
        let summary = summarize(&[]);
        assert_eq!(
            summary,
            CampaignSummary { total: 0, opened: 0, clicked: 0, attachment_opened: 0 }
        );
    }

    #[test]
    fn resumo_conta_cada_flag() {
        let mut aberto = event("Pune", "IN");
        aberto.is_opened = true;
        aberto.open_count = 3;
        let mut clicado = event("Pune", "IN");
        clicado.is_opened = true;
        clicado.link_clicked = true;
        let intocado = event("", "");

        let summary = summarize(&[aberto, clicado, intocado]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.opened, 2);
        assert_eq!(summary.clicked, 1);
        assert_eq!(summary.attachment_opened, 0);
    }

    #[test]
    fn top_locations_agrupa_e_rotula_desconhecidos() {
        let events = vec![event("Pune", "IN"), event("Pune", "IN"), event("", "")];
        let top = top_locations(&events, 5);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0], LocationCount { location: "Pune, IN".to_string(), count: 2 });
        assert_eq!(top[1], LocationCount { location: "Unknown, ".to_string(), count: 1 });
    }

    #[test]
    fn top_locations_desempata_pela_primeira_aparicao() {
        let events = vec![
            event("Recife", "BR"),
            event("Lisboa", "PT"),
            event("Lisboa", "PT"),
            event("Recife", "BR"),
            event("Porto", "PT"),
        ];
        let top = top_locations(&events, 5);

        // Recife e Lisboa empatam em 2; Recife apareceu primeiro
        assert_eq!(top[0].location, "Recife, BR");
        assert_eq!(top[1].location, "Lisboa, PT");
        assert_eq!(top[2].location, "Porto, PT");
    }

    #[test]
    fn top_locations_trunca_em_n() {
        let events = vec![event("A", "X"), event("B", "Y"), event("C", "Z")];
        assert_eq!(top_locations(&events, 2).len(), 2);
        assert!(top_locations(&[], 5).is_empty());
    }

    #[test]
    fn csv_escapa_virgulas_do_user_agent() {
        let mut e = event("Pune", "IN");
        e.is_opened = true;
        e.open_count = 2;
        e.user_agent = Some("Mozilla/5.0 (X11, Linux, x86_64)".to_string());

        let csv = to_csv(&[e]);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "to,isOpened,openCount,attachmentOpened,linkClicked,lastOpenedAt,ip,city,region,country,userAgent"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Mozilla/5.0 (X11; Linux; x86_64)"));
        // Colunas continuam alinhadas: 10 vírgulas por linha
        assert_eq!(row.matches(',').count(), 10);
    }

    #[test]
    fn csv_de_vazio_e_so_cabecalho() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}
