use serde::Deserialize;

use crate::error::ReportError;
use crate::normalize::normalize_label;

// ---------------------------------------------------------------------------
// Top-level mapping
// ---------------------------------------------------------------------------

/// Per-run schema mapping. Every field has a default, so an empty document
/// (or no document at all) describes the standard marketplace export layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaMapping {
    pub orders: OrderColumns,
    pub reference: ReferenceColumns,
    pub enrich: EnrichOptions,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderColumns {
    pub identifier: String,
    pub quantity: String,
    pub unit_price: String,
    pub status: String,
    pub product_name: String,
    pub purchase_timestamp: String,
}

impl Default for OrderColumns {
    fn default() -> Self {
        Self {
            identifier: "asin".into(),
            quantity: "quantity".into(),
            unit_price: "item-price".into(),
            status: "item-status".into(),
            product_name: "product-name".into(),
            purchase_timestamp: "purchase-date".into(),
        }
    }
}

impl OrderColumns {
    /// (logical attribute, configured column) pairs, in schema order.
    pub fn assignments(&self) -> [(&'static str, &str); 6] {
        [
            ("identifier", self.identifier.as_str()),
            ("quantity", self.quantity.as_str()),
            ("unit-price", self.unit_price.as_str()),
            ("status", self.status.as_str()),
            ("product-name", self.product_name.as_str()),
            ("purchase-timestamp", self.purchase_timestamp.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// Product-master columns. Attribute columns left unset are detected by
/// name, then (if `ordinal_fallback`) by position.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceColumns {
    pub identifier: String,
    pub brand: Option<String>,
    pub brand_manager: Option<String>,
    pub vendor_code: Option<String>,
    pub unit_cost: Option<String>,
    pub ordinal_fallback: bool,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            identifier: "asin".into(),
            brand: None,
            brand_manager: None,
            vendor_code: None,
            unit_cost: None,
            ordinal_fallback: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Enrichment toggles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichOptions {
    /// Map the vendor code and place it after the identifier column.
    pub vendor_code: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self { vendor_code: true }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SchemaMapping {
    pub fn from_toml(input: &str) -> Result<Self, ReportError> {
        let mapping: SchemaMapping =
            toml::from_str(input).map_err(|e| ReportError::ConfigParse(e.to_string()))?;
        mapping.validate()?;
        Ok(mapping.normalized())
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        let assignments = self.orders.assignments();

        for (attribute, column) in &assignments {
            if column.trim().is_empty() {
                return Err(ReportError::ConfigValidation(format!(
                    "orders.{} must not be empty",
                    attribute.replace('-', "_")
                )));
            }
        }

        // Two logical order attributes cannot share one column
        for (i, (attr_a, col_a)) in assignments.iter().enumerate() {
            for (attr_b, col_b) in &assignments[i + 1..] {
                if normalize_label(col_a) == normalize_label(col_b) {
                    return Err(ReportError::ConfigValidation(format!(
                        "orders column '{}' assigned to both {attr_a} and {attr_b}",
                        normalize_label(col_a)
                    )));
                }
            }
        }

        if self.reference.identifier.trim().is_empty() {
            return Err(ReportError::ConfigValidation(
                "reference.identifier must not be empty".into(),
            ));
        }

        let explicit = [
            ("brand", &self.reference.brand),
            ("brand_manager", &self.reference.brand_manager),
            ("vendor_code", &self.reference.vendor_code),
            ("unit_cost", &self.reference.unit_cost),
        ];
        for (name, column) in explicit {
            if matches!(column, Some(c) if c.trim().is_empty()) {
                return Err(ReportError::ConfigValidation(format!(
                    "reference.{name} must not be empty when set"
                )));
            }
        }

        Ok(())
    }

    /// Copy with every column name in canonical (trimmed, lower-case) form.
    pub fn normalized(&self) -> Self {
        let norm = |s: &String| normalize_label(s);
        let norm_opt = |s: &Option<String>| s.as_ref().map(|c| normalize_label(c));
        Self {
            orders: OrderColumns {
                identifier: norm(&self.orders.identifier),
                quantity: norm(&self.orders.quantity),
                unit_price: norm(&self.orders.unit_price),
                status: norm(&self.orders.status),
                product_name: norm(&self.orders.product_name),
                purchase_timestamp: norm(&self.orders.purchase_timestamp),
            },
            reference: ReferenceColumns {
                identifier: norm(&self.reference.identifier),
                brand: norm_opt(&self.reference.brand),
                brand_manager: norm_opt(&self.reference.brand_manager),
                vendor_code: norm_opt(&self.reference.vendor_code),
                unit_cost: norm_opt(&self.reference.unit_cost),
                ordinal_fallback: self.reference.ordinal_fallback,
            },
            enrich: self.enrich.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let m = SchemaMapping::from_toml("").unwrap();
        assert_eq!(m.orders.identifier, "asin");
        assert_eq!(m.orders.unit_price, "item-price");
        assert_eq!(m.orders.status, "item-status");
        assert_eq!(m.reference.identifier, "asin");
        assert!(m.reference.brand.is_none());
        assert!(m.reference.ordinal_fallback);
        assert!(m.enrich.vendor_code);
    }

    #[test]
    fn explicit_columns_are_normalized() {
        let m = SchemaMapping::from_toml(
            r#"
[orders]
identifier = " ASIN "
unit_price = "Item-Price"

[reference]
brand_manager = "Owner"
unit_cost = " CP "
ordinal_fallback = false

[enrich]
vendor_code = false
"#,
        )
        .unwrap();
        assert_eq!(m.orders.identifier, "asin");
        assert_eq!(m.orders.unit_price, "item-price");
        assert_eq!(m.orders.quantity, "quantity");
        assert_eq!(m.reference.brand_manager.as_deref(), Some("owner"));
        assert_eq!(m.reference.unit_cost.as_deref(), Some("cp"));
        assert!(!m.reference.ordinal_fallback);
        assert!(!m.enrich.vendor_code);
    }

    #[test]
    fn reject_unknown_keys() {
        let err = SchemaMapping::from_toml("[orders]\nqty = \"q\"\n").unwrap_err();
        assert!(matches!(err, ReportError::ConfigParse(_)));
    }

    #[test]
    fn reject_shared_order_column() {
        let err = SchemaMapping::from_toml(
            r#"
[orders]
quantity = "amount"
unit_price = "AMOUNT"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'amount'"), "{err}");
    }

    #[test]
    fn reject_empty_names() {
        let err = SchemaMapping::from_toml("[orders]\nstatus = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("orders.status"), "{err}");

        let err = SchemaMapping::from_toml("[reference]\nbrand = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("reference.brand"), "{err}");
    }
}
