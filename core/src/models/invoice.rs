use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::util::{decode, format_price, join_non_empty, lenient_date, lenient_f64, lenient_string};

/// The six free-form address lines printed on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceAddress {
    lines: [Option<String>; 6],
}

impl InvoiceAddress {
    pub fn new(lines: [Option<String>; 6]) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[Option<String>; 6] {
        &self.lines
    }

    /// The non-empty lines joined with `separator`.
    pub fn output(&self, separator: &str) -> String {
        join_non_empty(self.lines.iter().map(Option::as_deref), separator)
    }
}

impl fmt::Display for InvoiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output(", "))
    }
}

/// One billed line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InvoiceLine {
    #[serde(deserialize_with = "lenient_string")]
    pub details: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub unit_price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub subtotal: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct InvoiceRecord {
    #[serde(deserialize_with = "lenient_date")]
    date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_string")]
    number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_1: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_2: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_3: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_4: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_5: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    address_6: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    total: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    tax: Option<f64>,
    invoice_lines: Option<Vec<InvoiceLine>>,
    #[serde(deserialize_with = "lenient_string")]
    pdf_url: Option<String>,
}

/// A billing invoice. `net` is derived as gross minus tax.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    date: Option<NaiveDate>,
    number: String,
    address: InvoiceAddress,
    gross: f64,
    tax: f64,
    net: f64,
    items: Vec<InvoiceLine>,
    pdf_url: Option<String>,
}

impl Invoice {
    pub fn from_value(value: &Value) -> Result<Self> {
        let record: InvoiceRecord = decode(value, "invoice")?;
        let gross = record.total.unwrap_or_default();
        let tax = record.tax.unwrap_or_default();
        Ok(Self {
            date: record.date,
            number: record.number.unwrap_or_default(),
            address: InvoiceAddress::new([
                record.address_1,
                record.address_2,
                record.address_3,
                record.address_4,
                record.address_5,
                record.address_6,
            ]),
            gross,
            tax,
            net: gross - tax,
            items: record.invoice_lines.unwrap_or_default(),
            pdf_url: record.pdf_url,
        })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn address(&self) -> &InvoiceAddress {
        &self.address
    }

    pub fn gross(&self) -> f64 {
        self.gross
    }

    pub fn tax(&self) -> f64 {
        self.tax
    }

    pub fn net(&self) -> f64 {
        self.net
    }

    pub fn items(&self) -> &[InvoiceLine] {
        &self.items
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    pub fn formatted_gross(&self, include_currency: bool) -> String {
        format_price(self.gross, include_currency)
    }

    pub fn formatted_tax(&self, include_currency: bool) -> String {
        format_price(self.tax, include_currency)
    }

    pub fn formatted_net(&self, include_currency: bool) -> String {
        format_price(self.net, include_currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice() -> Invoice {
        Invoice::from_value(&json!({
            "date": "2024-02-01T00:00:00Z",
            "number": "INV-1001",
            "address_1": "Acme Ltd",
            "address_2": "1 High Street",
            "address_3": "",
            "address_4": null,
            "address_5": "Northampton",
            "address_6": "NN1 3ER",
            "total": 1440.0,
            "tax": "240.00",
            "invoice_lines": [
                {"details": "Annual plan", "quantity": 1, "unit_price": 1200.0, "subtotal": 1200.0}
            ],
            "pdf_url": "https://api.getAddress.io/invoices/INV-1001.pdf"
        }))
        .unwrap()
    }

    #[test]
    fn net_is_gross_minus_tax() {
        let invoice = invoice();
        assert_eq!(invoice.gross(), 1440.0);
        assert_eq!(invoice.tax(), 240.0);
        assert_eq!(invoice.net(), 1200.0);
        assert_eq!(invoice.formatted_gross(true), "£1,440.00");
        assert_eq!(invoice.formatted_net(false), "1,200.00");
        assert_eq!(invoice.formatted_tax(true), "£240.00");
    }

    #[test]
    fn address_and_lines_are_mapped() {
        let invoice = invoice();
        assert_eq!(invoice.number(), "INV-1001");
        assert_eq!(invoice.date(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(
            invoice.address().to_string(),
            "Acme Ltd, 1 High Street, Northampton, NN1 3ER"
        );
        assert_eq!(invoice.address().output("\n").lines().count(), 4);
        assert_eq!(invoice.items().len(), 1);
        assert_eq!(invoice.items()[0].details.as_deref(), Some("Annual plan"));
        assert!(invoice.pdf_url().is_some());
    }

    #[test]
    fn empty_invoice_decodes_to_zeroes() {
        let invoice = Invoice::from_value(&json!({})).unwrap();
        assert_eq!(invoice.net(), 0.0);
        assert!(invoice.items().is_empty());
        assert_eq!(invoice.address().output(", "), "");
    }
}
