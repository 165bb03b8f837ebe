use crate::categories::{CategoryOverflow, DEFAULT_FALLBACK_CATEGORY, DEFAULT_TOP_CATEGORIES};
use crate::error::{AnalyticsError, Result};
use crate::format::CurrencyFormat;
use crate::utils::validate_window_months;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DashboardConfig {
    #[serde(default = "default_window_months")]
    #[schemars(description = "Number of calendar months in the cash flow chart, ending with the current month (1-36)")]
    pub window_months: u32,

    #[serde(default = "default_sales_window_days")]
    #[schemars(description = "Trailing days of sales used for the weekday/hour heatmap and the daily series (1-366)")]
    pub sales_window_days: u32,

    #[serde(default = "default_top_categories")]
    #[schemars(description = "How many expense categories the breakdown keeps")]
    pub top_categories: usize,

    #[serde(default = "default_fallback_category")]
    #[schemars(description = "Label for rows with no category")]
    pub fallback_category: String,

    #[serde(default)]
    pub category_overflow: CategoryOverflow,

    #[serde(default = "default_exclude_cancelled")]
    #[schemars(description = "Drop cancelled rows before aggregating")]
    pub exclude_cancelled: bool,

    #[serde(default)]
    pub currency: CurrencyFormat,
}

fn default_window_months() -> u32 {
    6
}

fn default_sales_window_days() -> u32 {
    30
}

fn default_top_categories() -> usize {
    DEFAULT_TOP_CATEGORIES
}

fn default_fallback_category() -> String {
    DEFAULT_FALLBACK_CATEGORY.to_string()
}

fn default_exclude_cancelled() -> bool {
    true
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_months: default_window_months(),
            sales_window_days: default_sales_window_days(),
            top_categories: default_top_categories(),
            fallback_category: default_fallback_category(),
            category_overflow: CategoryOverflow::default(),
            exclude_cancelled: default_exclude_cancelled(),
            currency: CurrencyFormat::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validate_window_months(self.window_months)?;

        if !(1..=366).contains(&self.sales_window_days) {
            return Err(invalid(
                "sales_window_days",
                format!("{} is outside 1..=366", self.sales_window_days),
            ));
        }

        if self.top_categories == 0 {
            return Err(invalid("top_categories", "must keep at least one category"));
        }

        if self.fallback_category.trim().is_empty() {
            return Err(invalid("fallback_category", "must not be blank"));
        }

        if let CategoryOverflow::Aggregate { label } = &self.category_overflow {
            if label.trim().is_empty() {
                return Err(invalid("category_overflow", "aggregate label must not be blank"));
            }
        }

        if self.currency.decimals > 8 {
            return Err(invalid(
                "currency.decimals",
                format!("{} decimals is more than 8", self.currency.decimals),
            ));
        }

        if self.currency.decimal_separator == self.currency.thousands_separator {
            return Err(invalid(
                "currency",
                "decimal and thousands separators must differ",
            ));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn invalid(field: &str, details: impl Into<String>) -> AnalyticsError {
    AnalyticsError::InvalidConfig {
        field: field.to_string(),
        details: details.into(),
    }
}
