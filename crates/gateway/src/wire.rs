//! Wire shapes of the spreadsheet-backed service and their normalization
//! into the domain model.
//!
//! The service speaks a 3-level nested taxonomy (`tipo` → `subcategorias`
//! → `itens`) and loosely-typed transaction rows. Normalization
//! synthesizes category ids by joining ancestor names with `-`, falls
//! back to the display name when a row carries no id, defaults missing
//! amounts to 0, and renders dates in the fixed `DD/MM/YYYY` display
//! format.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tally_core::models::{Category, Snapshot, Taxonomy, Transaction, TransactionStatus};

/// Display name used when a row has neither an establishment nor a name.
const UNKNOWN_ESTABLISHMENT: &str = "Desconhecido";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
pub(crate) struct SheetItem {
    pub nome: String,
    pub icone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetSubcategory {
    pub nome: String,
    pub icone: Option<String>,
    #[serde(default)]
    pub itens: Vec<SheetItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetCategory {
    pub tipo: String,
    pub icone: Option<String>,
    #[serde(default)]
    pub subcategorias: Vec<SheetSubcategory>,
}

/// A transaction row as the sheet exports it. Ids may be numeric row
/// identifiers or strings; amount and date fields exist under both the
/// service's native names and their English aliases.
#[derive(Debug, Deserialize)]
pub(crate) struct SheetTransaction {
    #[serde(default)]
    pub id: Option<Value>,
    pub estabelecimento: Option<String>,
    pub nome: Option<String>,
    pub data: Option<String>,
    pub date: Option<String>,
    pub valor: Option<f64>,
    pub amount: Option<f64>,
}

/// The read endpoint answers either with the service-native shape or,
/// as a fallback, directly with the domain shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FetchResponse {
    Native {
        estabelecimentos: Vec<SheetTransaction>,
        categorias: Vec<SheetCategory>,
    },
    Domain(Snapshot),
}

/// One row of the write payload; field names are the service's.
#[derive(Debug, Serialize)]
pub(crate) struct SyncRow<'a> {
    pub id: &'a str,
    pub estabelecimento: &'a str,
    pub categoria: Option<&'a str>,
    #[serde(rename = "categoriaId")]
    pub categoria_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SyncRequest<'a> {
    pub action: &'static str,
    pub transactions: Vec<SyncRow<'a>>,
}

impl<'a> SyncRequest<'a> {
    pub fn new(transactions: &'a [Transaction]) -> Self {
        Self {
            action: "sync",
            transactions: transactions
                .iter()
                .map(|t| SyncRow {
                    id: &t.id,
                    estabelecimento: &t.original_name,
                    categoria: t.category_name.as_deref(),
                    categoria_id: t.category_id.as_deref(),
                })
                .collect(),
        }
    }
}

/// Readable acknowledgement shape, when the degraded transport lets one
/// through.
#[derive(Debug, Deserialize)]
pub(crate) struct SyncAckResponse {
    pub status: Option<String>,
}

fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Render a service date in `DD/MM/YYYY`. Unparseable values pass
/// through untouched rather than being dropped.
fn display_date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(DISPLAY_DATE_FORMAT).to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return parsed.format(DISPLAY_DATE_FORMAT).to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return parsed.format(DISPLAY_DATE_FORMAT).to_string();
    }
    raw.to_string()
}

pub(crate) fn normalize_transactions(rows: Vec<SheetTransaction>) -> Vec<Transaction> {
    rows.into_iter()
        .map(|row| {
            let name = row
                .estabelecimento
                .or(row.nome)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_ESTABLISHMENT.to_string());
            // Prefer the sheet's row id; fall back to the display name,
            // so same-name rows without ids collide by design.
            let id = row
                .id
                .as_ref()
                .and_then(id_to_string)
                .unwrap_or_else(|| name.clone());
            let date = row.data.or(row.date).map(|d| display_date(&d));

            Transaction {
                id,
                original_name: name,
                amount: Some(row.valor.or(row.amount).unwrap_or(0.0)),
                date,
                category_id: None,
                category_name: None,
                status: TransactionStatus::Pending,
            }
        })
        .collect()
}

pub(crate) fn normalize_taxonomy(categories: Vec<SheetCategory>) -> Taxonomy {
    categories
        .into_iter()
        .map(|cat| {
            let root_id = cat.tipo.clone();
            Category {
                id: root_id.clone(),
                name: cat.tipo,
                parent_id: None,
                color: None,
                icon: cat.icone,
                children: cat
                    .subcategorias
                    .into_iter()
                    .map(|sub| {
                        let sub_id = format!("{}-{}", root_id, sub.nome);
                        Category {
                            id: sub_id.clone(),
                            name: sub.nome,
                            parent_id: Some(root_id.clone()),
                            color: None,
                            icon: sub.icone,
                            children: sub
                                .itens
                                .into_iter()
                                .map(|item| Category {
                                    id: format!("{}-{}", sub_id, item.nome),
                                    name: item.nome,
                                    parent_id: Some(sub_id.clone()),
                                    color: None,
                                    icon: item.icone,
                                    children: vec![],
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_ids_join_ancestor_names() {
        let input = serde_json::json!([{
            "tipo": "Food",
            "subcategorias": [{
                "nome": "Groceries",
                "itens": [{"nome": "Supermarket"}]
            }]
        }]);
        let categories: Vec<SheetCategory> = serde_json::from_value(input).unwrap();
        let taxonomy = normalize_taxonomy(categories);

        assert_eq!(taxonomy.len(), 1);
        let root = &taxonomy[0];
        assert_eq!(root.id, "Food");
        assert_eq!(root.name, "Food");
        assert_eq!(root.parent_id, None);

        let sub = &root.children[0];
        assert_eq!(sub.id, "Food-Groceries");
        assert_eq!(sub.parent_id.as_deref(), Some("Food"));

        let item = &sub.children[0];
        assert_eq!(item.id, "Food-Groceries-Supermarket");
        assert_eq!(item.parent_id.as_deref(), Some("Food-Groceries"));
        assert!(item.is_leaf());
    }

    #[test]
    fn row_id_prefers_sheet_id_and_falls_back_to_name() {
        let rows: Vec<SheetTransaction> = serde_json::from_value(serde_json::json!([
            {"id": 42, "estabelecimento": "Padaria"},
            {"id": "row-7", "estabelecimento": "Mercado"},
            {"estabelecimento": "Farmacia"},
            {"nome": "Posto"},
            {}
        ]))
        .unwrap();
        let transactions = normalize_transactions(rows);

        assert_eq!(transactions[0].id, "42");
        assert_eq!(transactions[1].id, "row-7");
        assert_eq!(transactions[2].id, "Farmacia");
        assert_eq!(transactions[3].id, "Posto");
        assert_eq!(transactions[4].id, "Desconhecido");
        assert_eq!(transactions[4].original_name, "Desconhecido");
    }

    #[test]
    fn missing_amounts_default_to_zero() {
        let rows: Vec<SheetTransaction> = serde_json::from_value(serde_json::json!([
            {"estabelecimento": "A", "valor": 12.5},
            {"estabelecimento": "B", "amount": 3.0},
            {"estabelecimento": "C"}
        ]))
        .unwrap();
        let transactions = normalize_transactions(rows);

        assert_eq!(transactions[0].amount, Some(12.5));
        assert_eq!(transactions[1].amount, Some(3.0));
        assert_eq!(transactions[2].amount, Some(0.0));
    }

    #[test]
    fn dates_render_in_display_format() {
        let rows: Vec<SheetTransaction> = serde_json::from_value(serde_json::json!([
            {"estabelecimento": "A", "data": "2024-03-05T00:00:00.000Z"},
            {"estabelecimento": "B", "data": "2024-03-05"},
            {"estabelecimento": "C", "data": "sometime"},
            {"estabelecimento": "D"}
        ]))
        .unwrap();
        let transactions = normalize_transactions(rows);

        assert_eq!(transactions[0].date.as_deref(), Some("05/03/2024"));
        assert_eq!(transactions[1].date.as_deref(), Some("05/03/2024"));
        assert_eq!(transactions[2].date.as_deref(), Some("sometime"));
        assert_eq!(transactions[3].date, None);
    }

    #[test]
    fn fetched_rows_start_pending() {
        let rows: Vec<SheetTransaction> =
            serde_json::from_value(serde_json::json!([{"estabelecimento": "A"}])).unwrap();
        let transactions = normalize_transactions(rows);
        assert_eq!(transactions[0].status, TransactionStatus::Pending);
        assert_eq!(transactions[0].category_id, None);
    }

    #[test]
    fn fetch_response_accepts_both_shapes() {
        let native: FetchResponse = serde_json::from_value(serde_json::json!({
            "estabelecimentos": [{"estabelecimento": "A"}],
            "categorias": [{"tipo": "Food", "subcategorias": []}]
        }))
        .unwrap();
        assert!(matches!(native, FetchResponse::Native { .. }));

        let domain: FetchResponse = serde_json::from_value(serde_json::json!({
            "transactions": [],
            "taxonomy": []
        }))
        .unwrap();
        assert!(matches!(domain, FetchResponse::Domain(_)));
    }

    #[test]
    fn sync_request_uses_service_field_names() {
        let transaction = Transaction {
            id: "42".to_string(),
            original_name: "Padaria".to_string(),
            amount: Some(10.0),
            date: None,
            category_id: Some("Food-Groceries-Supermarket".to_string()),
            category_name: Some("Food > Groceries > Supermarket".to_string()),
            status: TransactionStatus::Categorized,
        };
        let request = SyncRequest::new(std::slice::from_ref(&transaction));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["action"], "sync");
        let row = &json["transactions"][0];
        assert_eq!(row["id"], "42");
        assert_eq!(row["estabelecimento"], "Padaria");
        assert_eq!(row["categoria"], "Food > Groceries > Supermarket");
        assert_eq!(row["categoriaId"], "Food-Groceries-Supermarket");
    }
}
